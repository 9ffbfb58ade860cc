//! Reassembly of API frames from an arbitrary byte stream.
//!
//! Bytes arrive from the transport in chunks of any size. The assembler keeps
//! whatever has not yet formed a complete frame and yields each frame (or the
//! reason it was rejected) in arrival order:
//! - `Seeking`: scanning for the `0x7E` delimiter; noise before it is dropped
//! - `HaveLength`: delimiter found, waiting for the two length bytes
//! - `HaveBody`: length known, waiting for body and checksum
//!
//! A checksum failure skips only the delimiter of the bad frame, so a single
//! corrupted frame never takes its successors down with it. In escaped mode a
//! raw `0x7E` always starts a new frame; a partial frame it interrupts is
//! discarded.

use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{decode, ApiMode, FrameConfig, DELIMITER, ESCAPE, ESCAPE_XOR};
use crate::error::{FrameError, Result};
use crate::field::checksum;
use crate::frame::Frame;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Where the assembler is within the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblerState {
    /// No delimiter buffered.
    #[default]
    Seeking,
    /// Delimiter buffered, length incomplete.
    HaveLength,
    /// Length read; waiting for `len` body bytes plus the checksum.
    HaveBody { len: usize },
}

impl AssemblerState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Seeking => "seeking",
            Self::HaveLength => "have_length",
            Self::HaveBody { .. } => "have_body",
        }
    }
}

/// Outcome of one extraction attempt over a buffer.
///
/// Every variant says how many leading bytes of the buffer are spent.
#[derive(Debug)]
pub enum Extracted {
    /// No complete frame yet. `discarded` leading bytes are noise.
    Pending {
        discarded: usize,
        state: AssemblerState,
    },
    /// A frame decoded from the first `consumed` bytes.
    Frame { consumed: usize, frame: Frame },
    /// A frame-shaped region that failed validation.
    Invalid { consumed: usize, error: FrameError },
}

/// Logical bytes already recovered from a frame at the front of a buffer.
///
/// Holding one across calls lets the scan resume where it stopped instead of
/// unstuffing the partial frame again on every new chunk. It is valid only
/// while the caller keeps the buffer front at the frame's delimiter, which is
/// what advancing by the reported counts does.
#[derive(Debug, Clone, Default)]
pub struct PartialFrame {
    /// Raw bytes walked past the delimiter.
    raw: usize,
    /// Length, body and checksum bytes recovered so far.
    logical: BytesMut,
}

impl PartialFrame {
    /// Forget any progress.
    pub fn reset(&mut self) {
        self.raw = 0;
        self.logical.clear();
    }

    /// Logical bytes recovered so far, length field included.
    pub fn recovered(&self) -> usize {
        self.logical.len()
    }

    fn state(&self) -> AssemblerState {
        match self.body_len() {
            Some(len) => AssemblerState::HaveBody { len },
            None => AssemblerState::HaveLength,
        }
    }

    fn body_len(&self) -> Option<usize> {
        let len = self.logical.get(..2)?;
        Some(usize::from(u16::from_be_bytes([len[0], len[1]])))
    }
}

/// Attempt to pull one frame off the front of `src`.
///
/// Pure over `src`; callers advance their buffer by the reported count.
pub fn extract_frame(src: &[u8], config: &FrameConfig) -> Extracted {
    resume_frame(src, config, &mut PartialFrame::default())
}

/// [`extract_frame`] that picks up from `partial` and records where it stops.
///
/// Each raw byte is visited once per frame however the stream is chunked.
pub fn resume_frame(src: &[u8], config: &FrameConfig, partial: &mut PartialFrame) -> Extracted {
    let mut from = 0;
    loop {
        let Some(delim) = find_delimiter(src, from) else {
            partial.reset();
            return Extracted::Pending {
                discarded: src.len(),
                state: AssemblerState::Seeking,
            };
        };
        if delim != 0 {
            partial.reset();
        }

        match scan(src, delim, config, partial) {
            Err(Stop::Incomplete) => {
                return Extracted::Pending {
                    discarded: delim,
                    state: partial.state(),
                };
            }
            Err(Stop::Delimiter(at)) => {
                debug!(
                    dropped = at - delim,
                    state = partial.state().name(),
                    "partial frame interrupted by delimiter"
                );
                partial.reset();
                from = at;
            }
            Ok(Scanned::Oversized { len }) => {
                partial.reset();
                return Extracted::Invalid {
                    consumed: delim + 1,
                    error: FrameError::PayloadTooLarge {
                        size: len,
                        max: config.max_body_len,
                    },
                };
            }
            Ok(Scanned::Complete { end, len }) => {
                let logical = partial.logical.split();
                partial.reset();
                let body = &logical[2..2 + len];
                let actual = logical[2 + len];
                let expected = checksum(body);
                if expected != actual {
                    return Extracted::Invalid {
                        consumed: delim + 1,
                        error: FrameError::ChecksumMismatch { expected, actual },
                    };
                }
                return match decode(body) {
                    Ok(frame) => Extracted::Frame {
                        consumed: end,
                        frame,
                    },
                    Err(error) => Extracted::Invalid {
                        consumed: end,
                        error,
                    },
                };
            }
        }
    }
}

fn find_delimiter(src: &[u8], from: usize) -> Option<usize> {
    src.get(from..)?
        .iter()
        .position(|&b| b == DELIMITER)
        .map(|i| from + i)
}

enum Stop {
    /// Ran out of bytes.
    Incomplete,
    /// Escaped mode hit a raw delimiter at this position.
    Delimiter(usize),
}

enum Scanned {
    /// `partial.logical` holds length, `len` body bytes and the checksum.
    Complete { end: usize, len: usize },
    Oversized { len: usize },
}

/// Walk a frame starting at the delimiter at `delim`, continuing from `partial`.
fn scan(
    src: &[u8],
    delim: usize,
    config: &FrameConfig,
    partial: &mut PartialFrame,
) -> std::result::Result<Scanned, Stop> {
    let mut cursor = Unstuff {
        src,
        pos: delim + 1 + partial.raw,
        mode: config.api_mode,
    };

    let filled = cursor.fill(&mut partial.logical, 2);
    partial.raw = cursor.pos - delim - 1;
    filled?;

    let len = partial.body_len().ok_or(Stop::Incomplete)?;
    if len > config.max_body_len {
        return Ok(Scanned::Oversized { len });
    }

    let filled = cursor.fill(&mut partial.logical, 2 + len + 1);
    partial.raw = cursor.pos - delim - 1;
    filled?;

    Ok(Scanned::Complete {
        end: cursor.pos,
        len,
    })
}

/// Reads logical bytes, undoing escapes in API mode 2.
struct Unstuff<'a> {
    src: &'a [u8],
    pos: usize,
    mode: ApiMode,
}

impl Unstuff<'_> {
    fn next(&mut self) -> std::result::Result<u8, Stop> {
        let byte = *self.src.get(self.pos).ok_or(Stop::Incomplete)?;
        if self.mode == ApiMode::Unescaped {
            self.pos += 1;
            return Ok(byte);
        }
        match byte {
            DELIMITER => Err(Stop::Delimiter(self.pos)),
            ESCAPE => match self.src.get(self.pos + 1) {
                None => Err(Stop::Incomplete),
                Some(&DELIMITER) => Err(Stop::Delimiter(self.pos + 1)),
                Some(&escaped) => {
                    self.pos += 2;
                    Ok(escaped ^ ESCAPE_XOR)
                }
            },
            _ => {
                self.pos += 1;
                Ok(byte)
            }
        }
    }

    /// Append logical bytes to `out` until it holds `target` of them.
    ///
    /// A dangling escape marker is left unread for the next call.
    fn fill(&mut self, out: &mut BytesMut, target: usize) -> std::result::Result<(), Stop> {
        if self.mode == ApiMode::Unescaped {
            let want = target.saturating_sub(out.len());
            let avail = self.src.len().saturating_sub(self.pos).min(want);
            out.put_slice(self.src.get(self.pos..self.pos + avail).unwrap_or_default());
            self.pos += avail;
            return if avail == want {
                Ok(())
            } else {
                Err(Stop::Incomplete)
            };
        }
        while out.len() < target {
            out.put_u8(self.next()?);
        }
        Ok(())
    }
}

/// Accumulates transport bytes and yields complete frames.
///
/// One assembler per connection. Build a fresh one (or [`clear`](Self::clear))
/// after a reconnect.
#[derive(Debug)]
pub struct StreamAssembler {
    buf: BytesMut,
    config: FrameConfig,
    state: AssemblerState,
    partial: PartialFrame,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    /// Unescaped mode, default limits.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            state: AssemblerState::Seeking,
            partial: PartialFrame::default(),
        }
    }

    pub fn with_mode(api_mode: ApiMode) -> Self {
        Self::with_config(FrameConfig {
            api_mode,
            ..FrameConfig::default()
        })
    }

    /// Append `bytes` and extract everything that is now complete.
    ///
    /// Rejected frames come back as `Err` in their stream position; the
    /// assembler stays usable after any of them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Frame>> {
        self.buf.extend_from_slice(bytes);
        trace!(fed = bytes.len(), buffered = self.buf.len(), "assembler feed");

        let mut out = Vec::new();
        loop {
            match resume_frame(&self.buf, &self.config, &mut self.partial) {
                Extracted::Pending { discarded, state } => {
                    if discarded > 0 {
                        debug!(discarded, "discarding bytes ahead of delimiter");
                        self.buf.advance(discarded);
                    }
                    self.state = state;
                    break;
                }
                Extracted::Frame { consumed, frame } => {
                    debug!(
                        frame_type = %frame.frame_type,
                        consumed,
                        "frame assembled"
                    );
                    self.buf.advance(consumed);
                    out.push(Ok(frame));
                }
                Extracted::Invalid { consumed, error } => {
                    warn!(error = %error, consumed, "rejecting frame");
                    self.buf.advance(consumed);
                    out.push(Err(error));
                }
            }
        }
        out
    }

    /// State after the last [`feed`](Self::feed).
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Bytes held for an incomplete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop buffered bytes and return to `Seeking`.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.partial.reset();
        self.state = AssemblerState::Seeking;
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use xbee_schema::FrameType;

    use super::*;
    use crate::codec::{to_wire, to_wire_escaped};

    fn modem_status(status: u8) -> Frame {
        Frame {
            status,
            ..Frame::new(FrameType::ModemStatus)
        }
    }

    fn at_nj() -> Frame {
        Frame::at_command(1, *b"NJ", Bytes::new())
    }

    fn only_frames(results: Vec<Result<Frame>>) -> Vec<Frame> {
        results
            .into_iter()
            .map(|r| r.expect("unexpected assembler error"))
            .collect()
    }

    #[test]
    fn single_complete_frame() {
        let mut asm = StreamAssembler::new();
        let frames = only_frames(asm.feed(&[0x7E, 0x00, 0x02, 0x8A, 0x06, 0x6F]));
        assert_eq!(frames, vec![modem_status(0x06)]);
        assert_eq!(asm.state(), AssemblerState::Seeking);
        assert!(asm.is_empty());
    }

    #[test]
    fn strict_prefixes_yield_nothing() {
        let wire = to_wire(&at_nj()).unwrap();
        for cut in 0..wire.len() {
            let mut asm = StreamAssembler::new();
            assert!(asm.feed(&wire[..cut]).is_empty(), "prefix {cut}");
            assert_eq!(asm.buffered(), cut);
            let frames = only_frames(asm.feed(&wire[cut..]));
            assert_eq!(frames, vec![at_nj()], "split at {cut}");
        }
    }

    #[test]
    fn byte_at_a_time() {
        let wire = to_wire(&modem_status(0x02)).unwrap();
        let mut asm = StreamAssembler::new();
        let mut frames = Vec::new();
        for b in wire.iter() {
            frames.extend(only_frames(asm.feed(&[*b])));
        }
        assert_eq!(frames, vec![modem_status(0x02)]);
    }

    #[test]
    fn state_transitions() {
        let mut asm = StreamAssembler::new();
        assert_eq!(asm.state().name(), "seeking");

        asm.feed(&[0x7E]);
        assert_eq!(asm.state(), AssemblerState::HaveLength);
        assert_eq!(asm.state().name(), "have_length");

        asm.feed(&[0x00, 0x02]);
        assert_eq!(asm.state(), AssemblerState::HaveBody { len: 2 });
        assert_eq!(asm.state().name(), "have_body");

        asm.feed(&[0x8A, 0x06]);
        assert_eq!(asm.state(), AssemblerState::HaveBody { len: 2 });

        let frames = only_frames(asm.feed(&[0x6F]));
        assert_eq!(frames.len(), 1);
        assert_eq!(asm.state(), AssemblerState::Seeking);
    }

    #[test]
    fn leading_garbage_is_discarded() {
        let mut stream = vec![0x00, 0xFF, 0x13, 0x42];
        stream.extend_from_slice(&to_wire(&at_nj()).unwrap());

        let mut asm = StreamAssembler::new();
        assert_eq!(only_frames(asm.feed(&stream)), vec![at_nj()]);
        assert!(asm.is_empty());
    }

    #[test]
    fn garbage_without_delimiter_is_dropped() {
        let mut asm = StreamAssembler::new();
        assert!(asm.feed(&[0x01, 0x02, 0x03]).is_empty());
        assert_eq!(asm.buffered(), 0);
        assert_eq!(asm.state(), AssemblerState::Seeking);
    }

    #[test]
    fn checksum_failure_recovers_next_frame() {
        let mut bad = to_wire(&at_nj()).unwrap().to_vec();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;

        let mut stream = bad;
        stream.extend_from_slice(&to_wire(&modem_status(0x06)).unwrap());

        let mut asm = StreamAssembler::new();
        let results = asm.feed(&stream);
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(FrameError::ChecksumMismatch {
                expected: 0x5E,
                actual: 0xA1
            })
        ));
        assert_eq!(results[1].as_ref().ok(), Some(&modem_status(0x06)));
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut stream = Vec::new();
        for status in [0x00, 0x01, 0x02] {
            stream.extend_from_slice(&to_wire(&modem_status(status)).unwrap());
        }
        let mut asm = StreamAssembler::new();
        let frames = only_frames(asm.feed(&stream));
        assert_eq!(
            frames,
            vec![modem_status(0x00), modem_status(0x01), modem_status(0x02)]
        );
    }

    #[test]
    fn mixed_complete_and_partial() {
        let first = to_wire(&modem_status(0x00)).unwrap();
        let second = to_wire(&at_nj()).unwrap();

        let mut chunk = first.to_vec();
        chunk.extend_from_slice(&second[..4]);

        let mut asm = StreamAssembler::new();
        assert_eq!(only_frames(asm.feed(&chunk)), vec![modem_status(0x00)]);
        assert_eq!(asm.buffered(), 4);
        assert_eq!(asm.state(), AssemblerState::HaveBody { len: 4 });

        assert_eq!(only_frames(asm.feed(&second[4..])), vec![at_nj()]);
    }

    #[test]
    fn unknown_type_is_reported_and_skipped() {
        let mut stream = vec![0x7E, 0x00, 0x01, 0xFF, 0x00];
        stream.extend_from_slice(&to_wire(&modem_status(0x06)).unwrap());

        let mut asm = StreamAssembler::new();
        let results = asm.feed(&stream);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(FrameError::UnknownFrameType(0xFF))));
        assert!(results[1].is_ok());
        assert!(asm.is_empty());
    }

    #[test]
    fn short_body_is_reported() {
        // TxStatus needs 7 body bytes; this one carries 2.
        let body = [0x8B, 0x01];
        let mut stream = vec![0x7E, 0x00, 0x02];
        stream.extend_from_slice(&body);
        stream.push(checksum(&body));

        let results = StreamAssembler::new().feed(&stream);
        assert!(matches!(
            results.as_slice(),
            [Err(FrameError::TooShort { len: 2, min: 7, .. })]
        ));
    }

    #[test]
    fn oversized_length_skips_delimiter() {
        let config = FrameConfig {
            max_body_len: 8,
            ..FrameConfig::default()
        };
        let mut stream = vec![0x7E, 0x01, 0x00];
        stream.extend_from_slice(&to_wire(&modem_status(0x06)).unwrap());

        let mut asm = StreamAssembler::with_config(config);
        let results = asm.feed(&stream);
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(FrameError::PayloadTooLarge { size: 256, max: 8 })
        ));
        assert_eq!(results[1].as_ref().ok(), Some(&modem_status(0x06)));
    }

    #[test]
    fn escaped_stream_byte_at_a_time() {
        let frames_in = [
            modem_status(0x11),
            Frame::at_command(0x7E, *b"ID", vec![0x7D, 0x13, 0x00]),
            Frame::tx_request(0x13, 0x7E7D_1113_0000_0001, 0x7E7E, vec![0x7E; 4]),
        ];
        let mut stream = Vec::new();
        for frame in &frames_in {
            stream.extend_from_slice(&to_wire_escaped(frame).unwrap());
        }

        let mut asm = StreamAssembler::with_mode(ApiMode::Escaped);
        let mut frames = Vec::new();
        for b in &stream {
            frames.extend(only_frames(asm.feed(&[*b])));
        }
        assert_eq!(frames, frames_in);
        assert!(asm.is_empty());
    }

    #[test]
    fn escaped_dangling_marker_waits_for_next_byte() {
        let wire = to_wire_escaped(&modem_status(0x11)).unwrap();
        let marker = wire.iter().position(|&b| b == ESCAPE).unwrap();

        let mut asm = StreamAssembler::with_mode(ApiMode::Escaped);
        assert!(asm.feed(&wire[..=marker]).is_empty());
        assert_eq!(asm.buffered(), marker + 1);
        assert_eq!(
            only_frames(asm.feed(&wire[marker + 1..])),
            vec![modem_status(0x11)]
        );
    }

    #[test]
    fn escaped_delimiter_aborts_partial_frame() {
        let mut stream = vec![0x7E, 0x00, 0x05, 0x08, 0x01];
        stream.extend_from_slice(&to_wire_escaped(&modem_status(0x06)).unwrap());

        let mut asm = StreamAssembler::with_mode(ApiMode::Escaped);
        assert_eq!(only_frames(asm.feed(&stream)), vec![modem_status(0x06)]);
        assert!(asm.is_empty());
    }

    #[test]
    fn escaped_delimiter_after_marker_aborts_partial_frame() {
        let mut stream = vec![0x7E, 0x00, 0x05, 0x08, 0x7D];
        stream.extend_from_slice(&to_wire_escaped(&at_nj()).unwrap());

        let results = StreamAssembler::with_mode(ApiMode::Escaped).feed(&stream);
        assert_eq!(only_frames(results), vec![at_nj()]);
    }

    #[test]
    fn resume_skips_bytes_already_recovered() {
        let frame = Frame::tx_request(1, 0x7E7D_1113_0000_0001, 0xFFFE, vec![0x7E; 64]);
        let wire = to_wire_escaped(&frame).unwrap();
        let config = FrameConfig {
            api_mode: ApiMode::Escaped,
            ..FrameConfig::default()
        };

        let mut partial = PartialFrame::default();
        let half = wire.len() / 2;
        match resume_frame(&wire[..half], &config, &mut partial) {
            Extracted::Pending { discarded, state } => {
                assert_eq!(discarded, 0);
                assert_eq!(state, AssemblerState::HaveBody { len: 78 });
            }
            other => panic!("expected Pending, got {other:?}"),
        }
        assert!(partial.raw > 0);
        assert!(partial.recovered() > 2);

        // Walked bytes are not read again: scrubbing them changes nothing.
        let mut scrubbed = wire.to_vec();
        scrubbed[1..=partial.raw].fill(0x00);
        match resume_frame(&scrubbed, &config, &mut partial) {
            Extracted::Frame { consumed, frame: got } => {
                assert_eq!(consumed, wire.len());
                assert_eq!(got, frame);
            }
            other => panic!("expected Frame, got {other:?}"),
        }
        assert_eq!(partial.recovered(), 0);
    }

    #[test]
    fn large_escaped_frame_byte_at_a_time() {
        let frame = Frame::tx_request(1, 0x0013_A200_0000_0001, 0xFFFE, vec![0x7D; 40_000]);
        let wire = to_wire_escaped(&frame).unwrap();

        let mut asm = StreamAssembler::with_mode(ApiMode::Escaped);
        let mut frames = Vec::new();
        for b in wire.iter() {
            frames.extend(only_frames(asm.feed(&[*b])));
            if !asm.is_empty() {
                // Everything buffered is already walked, bar a pending marker.
                assert!(asm.buffered() - 1 - asm.partial.raw <= 1);
            }
        }
        assert_eq!(frames, vec![frame]);
        assert!(asm.is_empty());
    }

    #[test]
    fn extract_reports_discarded_prefix() {
        let config = FrameConfig::default();
        match extract_frame(&[0x01, 0x02, 0x7E, 0x00], &config) {
            Extracted::Pending { discarded, state } => {
                assert_eq!(discarded, 2);
                assert_eq!(state, AssemblerState::HaveLength);
            }
            other => panic!("expected Pending, got {other:?}"),
        }

        let wire = to_wire(&modem_status(0x06)).unwrap();
        let mut src = vec![0xAA];
        src.extend_from_slice(&wire);
        match extract_frame(&src, &config) {
            Extracted::Frame { consumed, frame } => {
                assert_eq!(consumed, src.len());
                assert_eq!(frame, modem_status(0x06));
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn clear_resets_state() {
        let mut asm = StreamAssembler::new();
        asm.feed(&[0x7E, 0x00, 0x10, 0x01]);
        assert_eq!(asm.state(), AssemblerState::HaveBody { len: 16 });
        asm.clear();
        assert_eq!(asm.state(), AssemblerState::Seeking);
        assert_eq!(asm.buffered(), 0);
        assert_eq!(asm.partial.recovered(), 0);
    }
}
