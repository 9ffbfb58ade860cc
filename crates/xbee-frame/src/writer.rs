use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;
use xbee_transport::XBeeStream;

use crate::codec::{build, encode_body, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete frames to any `Write` stream, in the configured API mode.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Build, frame and send `frame` (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let body = build(frame)?;
        if body.len() > self.config.max_body_len {
            return Err(FrameError::PayloadTooLarge {
                size: body.len(),
                max: self.config.max_body_len,
            });
        }

        self.buf.clear();
        encode_body(&body, self.config.api_mode, &mut self.buf)?;

        debug!(
            frame_type = %frame.frame_type,
            wire_len = self.buf.len(),
            "writing frame"
        );

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<XBeeStream> {
    /// Create a frame writer for `XBeeStream` and apply write timeout from config.
    pub fn with_config_stream(inner: XBeeStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::Bytes;
    use xbee_schema::FrameType;

    use super::*;
    use crate::assembler::StreamAssembler;
    use crate::codec::{to_wire, to_wire_escaped, ApiMode};

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_frame() {
        let frame = Frame::at_command(1, *b"NJ", Bytes::new());
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&frame).unwrap();

        assert_eq!(
            written(writer),
            [0x7E, 0x00, 0x04, 0x08, 0x01, 0x4E, 0x4A, 0x5E]
        );
    }

    #[test]
    fn write_multiple_frames() {
        let frames = [
            Frame::at_command(1, *b"SH", Bytes::new()),
            Frame::at_command(2, *b"SL", Bytes::new()),
            Frame::tx_request(3, 0x0013_A200_0000_0001, 0xFFFE, &b"hi"[..]),
        ];
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        for frame in &frames {
            writer.write_frame(frame).unwrap();
        }

        let decoded: Vec<Frame> = StreamAssembler::new()
            .feed(&written(writer))
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn escaped_mode_writes_escaped_wire() {
        let frame = Frame {
            status: 0x13,
            ..Frame::new(FrameType::ModemStatus)
        };
        let cfg = FrameConfig {
            api_mode: ApiMode::Escaped,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        writer.write_frame(&frame).unwrap();

        let wire = written(writer);
        assert_eq!(wire, to_wire_escaped(&frame).unwrap().as_ref());
        assert_ne!(wire, to_wire(&frame).unwrap().as_ref());
    }

    #[test]
    fn body_over_configured_limit_rejected() {
        let cfg = FrameConfig {
            max_body_len: 16,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let frame = Frame::tx_request(1, 0, 0xFFFE, vec![0u8; 8]);
        let err = writer.write_frame(&frame).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 22, max: 16 }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn build_errors_surface_before_writing() {
        let frame = Frame {
            route_records: vec![0; 300],
            ..Frame::new(FrameType::CreateSourceRoute)
        };
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.write_frame(&frame).unwrap_err();
        assert!(matches!(err, FrameError::TooManyRouteRecords { count: 300 }));
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer
            .write_frame(&Frame::new(FrameType::ModemStatus))
            .unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(writer.get_ref().data.len(), 6);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        assert_eq!(writer.config().api_mode, ApiMode::Unescaped);
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = FlakyWriter {
            kind: ErrorKind::Interrupted,
            wrote_once: false,
            flush_failed: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer
            .write_frame(&Frame::new(FrameType::ModemStatus))
            .unwrap();

        assert!(!writer.into_inner().data.is_empty());
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let writer_impl = FlakyWriter {
            kind: ErrorKind::WouldBlock,
            wrote_once: false,
            flush_failed: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer
            .write_frame(&Frame::new(FrameType::ModemStatus))
            .unwrap();

        assert!(!writer.into_inner().data.is_empty());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer
            .write_frame(&Frame::new(FrameType::ModemStatus))
            .unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn broken_pipe_is_io_error() {
        let mut writer = FrameWriter::new(BrokenWriter);
        let err = writer
            .write_frame(&Frame::new(FrameType::ModemStatus))
            .unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    #[cfg(unix)]
    fn applies_write_timeout_for_stream() {
        let (stream, _peer) = XBeeStream::pair().unwrap();
        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };

        let writer = FrameWriter::with_config_stream(stream, cfg);
        assert!(writer.is_ok());
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails the first write and the first flush with `kind`.
    struct FlakyWriter {
        kind: ErrorKind,
        wrote_once: bool,
        flush_failed: bool,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(self.kind));
            }
            // Short writes exercise the offset loop.
            let n = buf.len().min(2);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_failed {
                self.flush_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
