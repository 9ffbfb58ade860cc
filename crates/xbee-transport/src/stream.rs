use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// A connected radio byte stream. Implements Read + Write.
///
/// On Unix this wraps a raw serial tty or a Unix stream socket; everywhere it
/// can wrap a TCP connection to a serial bridge.
pub struct XBeeStream {
    inner: XBeeStreamInner,
}

enum XBeeStreamInner {
    #[cfg(unix)]
    Serial(crate::serial::unix::SerialPort),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for XBeeStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => port.read(buf),
            XBeeStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for XBeeStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => port.write(buf),
            XBeeStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => port.flush(),
            XBeeStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl From<TcpStream> for XBeeStream {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: XBeeStreamInner::Tcp(stream),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for XBeeStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: XBeeStreamInner::Unix(stream),
        }
    }
}

impl XBeeStream {
    #[cfg(unix)]
    pub(crate) fn from_serial(port: crate::serial::unix::SerialPort) -> Self {
        Self {
            inner: XBeeStreamInner::Serial(port),
        }
    }

    /// Connect to a TCP serial bridge (blocking).
    pub fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        // Frames are small and latency-sensitive.
        stream.set_nodelay(true)?;
        info!(addr, "connected to tcp bridge");
        Ok(Self::from(stream))
    }

    /// Connect to a Unix stream socket (blocking).
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = std::os::unix::net::UnixStream::connect(path).map_err(|source| {
            TransportError::Connect {
                addr: path.display().to_string(),
                source,
            }
        })?;
        info!(?path, "connected to unix socket");
        Ok(Self::from(stream))
    }

    /// A connected pair, for loopback use and tests.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from(a), Self::from(b)))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// A read that times out fails with `TimedOut` or `WouldBlock`,
    /// depending on the platform.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => port.set_read_timeout(timeout).map_err(Into::into),
            XBeeStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Serial writes always block until the driver accepts the bytes.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => {
                debug!(path = ?port.path(), ?timeout, "write timeout ignored for serial port");
                Ok(())
            }
            XBeeStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => XBeeStreamInner::Serial(port.try_clone()?),
            XBeeStreamInner::Tcp(stream) => XBeeStreamInner::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => XBeeStreamInner::Unix(stream.try_clone()?),
        };
        Ok(Self { inner })
    }

    /// Shut down both directions of a socket, waking blocked readers.
    ///
    /// A tty has no shutdown; readers notice closure through their timeout.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(_) => Ok(()),
            XBeeStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            XBeeStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            // Already closed by the peer.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(_) => "serial",
            XBeeStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            XBeeStreamInner::Unix(_) => "unix",
        }
    }
}

impl std::fmt::Debug for XBeeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("XBeeStream");
        dbg.field("type", &self.transport_name());
        match &self.inner {
            #[cfg(unix)]
            XBeeStreamInner::Serial(port) => dbg.field("path", &port.path()),
            XBeeStreamInner::Tcp(stream) => dbg.field("peer", &stream.peer_addr().ok()),
            #[cfg(unix)]
            XBeeStreamInner::Unix(_) => &mut dbg,
        };
        dbg.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;
    use std::net::TcpListener;

    use super::*;

    #[test]
    #[cfg(unix)]
    fn pair_roundtrip() {
        let (mut a, mut b) = XBeeStream::pair().unwrap();
        a.write_all(&[0x7E, 0x00, 0x02, 0x8A, 0x06, 0x6F]).unwrap();
        let mut buf = [0u8; 6];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x7E, 0x00, 0x02, 0x8A, 0x06, 0x6F]);
        assert_eq!(a.transport_name(), "unix");
    }

    #[test]
    fn tcp_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).unwrap();
            conn.write_all(&buf).unwrap();
        });

        let mut stream = XBeeStream::connect_tcp(&addr).unwrap();
        assert_eq!(stream.transport_name(), "tcp");
        stream.write_all(b"ping").unwrap();
        let mut echo = [0u8; 4];
        stream.read_exact(&mut echo).unwrap();
        assert_eq!(&echo, b"ping");

        server.join().unwrap();
    }

    #[test]
    fn tcp_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let err = XBeeStream::connect_tcp(&addr).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn read_timeout_applies() {
        let (mut a, _b) = XBeeStream::pair().unwrap();
        a.set_read_timeout(Some(Duration::from_millis(20))).unwrap();
        let mut buf = [0u8; 1];
        let err = a.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));
    }

    #[test]
    #[cfg(unix)]
    fn shutdown_wakes_clone_with_eof() {
        let (a, _b) = XBeeStream::pair().unwrap();
        let mut reader = a.try_clone().unwrap();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            reader.read(&mut buf).unwrap()
        });
        std::thread::sleep(Duration::from_millis(20));
        a.shutdown().unwrap();
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn connect_unix_missing_path() {
        let err = XBeeStream::connect_unix("/tmp/xbee-no-such-socket.sock").unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn debug_names_transport() {
        let (a, _b) = XBeeStream::pair().unwrap();
        assert!(format!("{a:?}").contains("unix"));
    }
}
