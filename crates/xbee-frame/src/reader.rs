use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use xbee_transport::XBeeStream;

use crate::assembler::StreamAssembler;
use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::frame::Frame;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads, noise and escaping internally. Callers always get
/// complete frames, or a per-frame error after which reading can continue
/// (see [`FrameError::is_recoverable`]).
pub struct FrameReader<T> {
    inner: T,
    assembler: StreamAssembler,
    ready: VecDeque<Result<Frame>>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: StreamAssembler::with_config(config),
            ready: VecDeque::new(),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// partial frame buffered at EOF is dropped. Timeouts surface as
    /// `FrameError::Io` and leave buffered bytes in place.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return next;
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.ready.extend(self.assembler.feed(&chunk[..read]));
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// The assembler holding not-yet-complete bytes.
    pub fn assembler(&self) -> &StreamAssembler {
        &self.assembler
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.assembler.config()
    }
}

impl FrameReader<XBeeStream> {
    /// Create a frame reader for `XBeeStream` and apply read timeout from config.
    pub fn with_config_stream(inner: XBeeStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: xbee_transport::TransportError) -> FrameError {
    match err {
        xbee_transport::TransportError::Io(io) => FrameError::Io(io),
        xbee_transport::TransportError::Open { source, .. }
        | xbee_transport::TransportError::Configure { source, .. }
        | xbee_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        xbee_transport::TransportError::Shutdown => FrameError::ConnectionClosed,
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
