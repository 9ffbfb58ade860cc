//! `tokio_util::codec` integration.
//!
//! Use with `FramedRead`/`FramedWrite` over any tokio byte stream. Decoding
//! yields `Ok(frame)` or a per-frame error as the item, so one corrupted frame
//! does not end the stream; the codec's own error is reserved for I/O.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::assembler::{resume_frame, Extracted, PartialFrame};
use crate::codec::{build, encode_body, ApiMode, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Frame codec for tokio streams.
#[derive(Debug, Clone, Default)]
pub struct XBeeCodec {
    config: FrameConfig,
    partial: PartialFrame,
}

impl XBeeCodec {
    pub fn new(api_mode: ApiMode) -> Self {
        Self::with_config(FrameConfig {
            api_mode,
            ..FrameConfig::default()
        })
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            partial: PartialFrame::default(),
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for XBeeCodec {
    type Item = Result<Frame>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match resume_frame(src, &self.config, &mut self.partial) {
            Extracted::Pending { discarded, .. } => {
                if discarded > 0 {
                    debug!(discarded, "discarding bytes ahead of delimiter");
                    src.advance(discarded);
                }
                Ok(None)
            }
            Extracted::Frame { consumed, frame } => {
                src.advance(consumed);
                Ok(Some(Ok(frame)))
            }
            Extracted::Invalid { consumed, error } => {
                warn!(error = %error, "rejecting frame");
                src.advance(consumed);
                Ok(Some(Err(error)))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                if !src.is_empty() {
                    debug!(dropped = src.len(), "partial frame at end of stream");
                    src.clear();
                }
                self.partial.reset();
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for XBeeCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Frame>>::encode(self, &frame, dst)
    }
}

impl Encoder<&Frame> for XBeeCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        let body = build(frame)?;
        if body.len() > self.config.max_body_len {
            return Err(FrameError::PayloadTooLarge {
                size: body.len(),
                max: self.config.max_body_len,
            });
        }
        encode_body(&body, self.config.api_mode, dst)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};
    use xbee_schema::FrameType;

    use super::*;
    use crate::codec::to_wire;

    fn modem_status(status: u8) -> Frame {
        Frame {
            status,
            ..Frame::new(FrameType::ModemStatus)
        }
    }

    #[tokio::test]
    async fn framed_roundtrip_escaped() {
        let (client, server) = tokio::io::duplex(1024);
        let mut sink = FramedWrite::new(client, XBeeCodec::new(ApiMode::Escaped));
        let mut stream = FramedRead::new(server, XBeeCodec::new(ApiMode::Escaped));

        let frames = vec![
            Frame::at_command(0x11, *b"ID", vec![0x7E, 0x7D]),
            Frame::tx_request(0x13, 0x0013_A200_4105_B7C1, 0xFFFE, &b"hello"[..]),
            modem_status(0x06),
        ];
        for frame in &frames {
            sink.send(frame).await.unwrap();
        }
        drop(sink);

        let mut received = Vec::new();
        while let Some(item) = stream.next().await {
            received.push(item.unwrap().unwrap());
        }
        assert_eq!(received, frames);
    }

    #[tokio::test]
    async fn corrupted_frame_does_not_end_stream() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut stream = FramedRead::new(server, XBeeCodec::default());

        let mut bad = to_wire(&modem_status(0x00)).unwrap().to_vec();
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        client.write_all(&bad).await.unwrap();
        client
            .write_all(&to_wire(&modem_status(0x02)).unwrap())
            .await
            .unwrap();
        client.write_all(&[0x7E, 0x00]).await.unwrap();
        drop(client);

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, Err(FrameError::ChecksumMismatch { .. })));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.unwrap(), modem_status(0x02));
        // Trailing partial frame is dropped quietly at EOF.
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn decoder_waits_for_complete_frame() {
        let wire = to_wire(&Frame::at_command(1, *b"NJ", Bytes::new())).unwrap();
        let mut codec = XBeeCodec::default();
        let mut buf = BytesMut::from(&wire[..5]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 5);

        buf.extend_from_slice(&wire[5..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(&frame.at_cmd, b"NJ");
        assert!(buf.is_empty());
    }

    #[test]
    fn encoder_enforces_body_limit() {
        let mut codec = XBeeCodec::with_config(FrameConfig {
            max_body_len: 4,
            ..FrameConfig::default()
        });
        let mut dst = BytesMut::new();
        let err = codec
            .encode(Frame::at_command(1, *b"NI", &b"long name"[..]), &mut dst)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 13, max: 4 }));
        assert!(dst.is_empty());
    }
}
