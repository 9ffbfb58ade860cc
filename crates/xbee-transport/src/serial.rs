//! Serial tty access through termios.
//!
//! The port is put into raw mode: no line discipline, no echo, no signal
//! characters, so every byte the radio sends reaches the frame assembler.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::XBeeStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    #[default]
    None,
    /// RTS/CTS.
    Hardware,
    /// XON/XOFF. Pair with API mode 2 so frame bytes never collide.
    Software,
}

/// Line settings for a serial port.
///
/// Defaults match a factory-fresh radio: 9600 baud, 8N1, no flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub baud: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow: FlowControl,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow: FlowControl::default(),
        }
    }
}

impl PortConfig {
    pub fn with_baud(baud: u32) -> Self {
        Self {
            baud,
            ..Self::default()
        }
    }
}

/// Rates accepted by [`open`] (the radio's `BD` register range).
pub const SUPPORTED_BAUD_RATES: [u32; 9] = [
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115_200, 230_400,
];

const PORT_PREFIXES: [&str; 6] = ["ttyUSB", "ttyACM", "ttyS", "ttyAMA", "cu.", "tty.usb"];

/// Open `path` as a raw serial port.
#[cfg(unix)]
pub fn open(path: impl AsRef<Path>, config: &PortConfig) -> Result<XBeeStream> {
    use std::os::unix::fs::OpenOptionsExt;

    let path = path.as_ref();
    let speed = unix::baud_constant(config.baud)?;

    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    unix::configure(&file, speed, config).map_err(|source| TransportError::Configure {
        path: path.to_path_buf(),
        source,
    })?;

    info!(?path, baud = config.baud, "opened serial port");
    Ok(XBeeStream::from_serial(unix::SerialPort::new(
        file,
        path.to_path_buf(),
    )))
}

#[cfg(not(unix))]
pub fn open(_path: impl AsRef<Path>, _config: &PortConfig) -> Result<XBeeStream> {
    Err(TransportError::Unsupported("serial ports"))
}

/// Candidate serial devices under `/dev`, sorted.
#[cfg(unix)]
pub fn enumerate_ports() -> Result<Vec<PathBuf>> {
    enumerate_ports_in(Path::new("/dev"))
}

#[cfg(not(unix))]
pub fn enumerate_ports() -> Result<Vec<PathBuf>> {
    Err(TransportError::Unsupported("serial port enumeration"))
}

/// Candidate serial devices in `dir`, sorted.
pub fn enumerate_ports_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut ports = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().is_some_and(is_port_name) {
            ports.push(entry.path());
        }
    }
    ports.sort();
    debug!(dir = ?dir, count = ports.len(), "enumerated serial ports");
    Ok(ports)
}

fn is_port_name(name: &str) -> bool {
    PORT_PREFIXES
        .iter()
        .any(|prefix| name.len() > prefix.len() && name.starts_with(prefix))
}

#[cfg(unix)]
pub(crate) mod unix {
    use std::fs::File;
    use std::io::{self, Read, Write};
    use std::mem::MaybeUninit;
    use std::os::fd::{AsRawFd, RawFd};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{DataBits, FlowControl, Parity, PortConfig, StopBits};
    use crate::error::{Result, TransportError};

    /// An open tty in raw mode.
    pub(crate) struct SerialPort {
        file: File,
        path: PathBuf,
        /// Termios settings are per device, so clones share this.
        timed: Arc<AtomicBool>,
    }

    impl SerialPort {
        pub(crate) fn new(file: File, path: PathBuf) -> Self {
            Self {
                file,
                path,
                timed: Arc::new(AtomicBool::new(false)),
            }
        }

        pub(crate) fn path(&self) -> &Path {
            &self.path
        }

        /// Map a read timeout onto `VMIN`/`VTIME` (tenths of a second, max 25.5s).
        pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
            let (vmin, vtime) = match timeout {
                None => (1, 0),
                Some(t) if t.is_zero() => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "cannot set a zero duration timeout",
                    ));
                }
                Some(t) => (0, t.as_millis().div_ceil(100).clamp(1, 255) as libc::cc_t),
            };

            let fd = self.file.as_raw_fd();
            let mut tio = get_termios(fd)?;
            tio.c_cc[libc::VMIN] = vmin;
            tio.c_cc[libc::VTIME] = vtime;
            set_termios(fd, &tio)?;
            self.timed.store(timeout.is_some(), Ordering::Relaxed);
            Ok(())
        }

        pub(crate) fn try_clone(&self) -> io::Result<Self> {
            Ok(Self {
                file: self.file.try_clone()?,
                path: self.path.clone(),
                timed: Arc::clone(&self.timed),
            })
        }
    }

    impl Read for SerialPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.file.read(buf)?;
            if n == 0 && !buf.is_empty() && self.timed.load(Ordering::Relaxed) {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "serial read timed out",
                ));
            }
            Ok(n)
        }
    }

    impl Write for SerialPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.file.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            let fd = self.file.as_raw_fd();
            // SAFETY: `fd` is an open tty owned by `self.file`.
            if unsafe { libc::tcdrain(fd) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    pub(crate) fn baud_constant(baud: u32) -> Result<libc::speed_t> {
        Ok(match baud {
            1200 => libc::B1200,
            2400 => libc::B2400,
            4800 => libc::B4800,
            9600 => libc::B9600,
            19200 => libc::B19200,
            38400 => libc::B38400,
            57600 => libc::B57600,
            115_200 => libc::B115200,
            230_400 => libc::B230400,
            other => return Err(TransportError::UnsupportedBaud(other)),
        })
    }

    pub(crate) fn configure(
        file: &File,
        speed: libc::speed_t,
        config: &PortConfig,
    ) -> io::Result<()> {
        let fd = file.as_raw_fd();
        let mut tio = get_termios(fd)?;

        // SAFETY: `tio` was initialized by tcgetattr.
        unsafe { libc::cfmakeraw(&mut tio) };

        tio.c_cflag |= libc::CREAD | libc::CLOCAL;
        tio.c_cflag &= !libc::CSIZE;
        tio.c_cflag |= match config.data_bits {
            DataBits::Five => libc::CS5,
            DataBits::Six => libc::CS6,
            DataBits::Seven => libc::CS7,
            DataBits::Eight => libc::CS8,
        };

        match config.parity {
            Parity::None => tio.c_cflag &= !(libc::PARENB | libc::PARODD),
            Parity::Odd => tio.c_cflag |= libc::PARENB | libc::PARODD,
            Parity::Even => {
                tio.c_cflag |= libc::PARENB;
                tio.c_cflag &= !libc::PARODD;
            }
        }

        match config.stop_bits {
            StopBits::One => tio.c_cflag &= !libc::CSTOPB,
            StopBits::Two => tio.c_cflag |= libc::CSTOPB,
        }

        tio.c_cflag &= !libc::CRTSCTS;
        tio.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
        match config.flow {
            FlowControl::None => {}
            FlowControl::Hardware => tio.c_cflag |= libc::CRTSCTS,
            FlowControl::Software => tio.c_iflag |= libc::IXON | libc::IXOFF,
        }

        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;

        // SAFETY: `tio` is a valid termios; `speed` came from `baud_constant`.
        let rc = unsafe { libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        set_termios(fd, &tio)?;

        // SAFETY: `fd` is an open tty.
        unsafe { libc::tcflush(fd, libc::TCIOFLUSH) };
        Ok(())
    }

    fn get_termios(fd: RawFd) -> io::Result<libc::termios> {
        let mut tio = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr writes a full termios into `tio` on success.
        if unsafe { libc::tcgetattr(fd, tio.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: initialized by the successful call above.
        Ok(unsafe { tio.assume_init() })
    }

    fn set_termios(fd: RawFd, tio: &libc::termios) -> io::Result<()> {
        // SAFETY: `tio` points to a valid termios for the duration of the call.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, tio) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_9600_8n1() {
        let cfg = PortConfig::default();
        assert_eq!(cfg.baud, 9600);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.flow, FlowControl::None);
        assert_eq!(PortConfig::with_baud(115_200).baud, 115_200);
    }

    #[test]
    fn port_name_filter() {
        assert!(is_port_name("ttyUSB0"));
        assert!(is_port_name("ttyACM12"));
        assert!(is_port_name("cu.usbserial-A50285BI"));
        assert!(is_port_name("tty.usbmodem1421"));
        assert!(!is_port_name("ttyUSB"));
        assert!(!is_port_name("tty0"));
        assert!(!is_port_name("null"));
    }

    #[test]
    fn enumerate_ports_in_directory() {
        let dir =
            std::env::temp_dir().join(format!("xbee-transport-ports-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["ttyUSB1", "ttyUSB0", "ttyACM0", "random", "cu.usbserial-1"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let ports = enumerate_ports_in(&dir).unwrap();
        let names: Vec<_> = ports
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["cu.usbserial-1", "ttyACM0", "ttyUSB0", "ttyUSB1"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn every_supported_baud_has_a_constant() {
        for baud in SUPPORTED_BAUD_RATES {
            assert!(unix::baud_constant(baud).is_ok(), "{baud}");
        }
    }

    #[test]
    #[cfg(unix)]
    fn open_rejects_unsupported_baud() {
        let result = open("/dev/null", &PortConfig::with_baud(12_345));
        assert!(matches!(result, Err(TransportError::UnsupportedBaud(12_345))));
    }

    #[test]
    #[cfg(unix)]
    fn open_missing_device() {
        let result = open("/dev/xbee-does-not-exist", &PortConfig::default());
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn open_non_tty_fails_configuration() {
        let result = open("/dev/null", &PortConfig::default());
        assert!(matches!(result, Err(TransportError::Configure { .. })));
    }
}
