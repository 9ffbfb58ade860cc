use bytes::{BufMut, Bytes, BytesMut};
use xbee_schema::{layout, FrameType, Tail};

use crate::error::{FrameError, Result};
use crate::field::{checksum, read_be, read_u16, read_u8, write_be, write_u8};
use crate::frame::Frame;

/// Start-of-frame delimiter.
pub const DELIMITER: u8 = 0x7E;

/// Escape marker used in API mode 2.
pub const ESCAPE: u8 = 0x7D;

/// Software flow-control bytes, escaped alongside the delimiter.
pub const XON: u8 = 0x11;
pub const XOFF: u8 = 0x13;

/// Value XOR-ed into an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// Delimiter (1) + length (2).
pub const HEADER_SIZE: usize = 3;

/// Largest body the 16-bit length field can describe.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Radio API operating mode (`AP` register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiMode {
    /// `AP=1`: bytes go on the wire as-is.
    #[default]
    Unescaped,
    /// `AP=2`: reserved bytes after the delimiter are byte-stuffed.
    Escaped,
}

/// Configuration for readers, writers and the stream assembler.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Wire encoding. Default: unescaped.
    pub api_mode: ApiMode,
    /// Bodies whose length field exceeds this are dropped. Default: 65535.
    pub max_body_len: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            api_mode: ApiMode::default(),
            max_body_len: MAX_BODY_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// True for bytes that must be escaped in API mode 2.
pub fn needs_escape(byte: u8) -> bool {
    matches!(byte, DELIMITER | ESCAPE | XON | XOFF)
}

/// Build the frame body: identifier, fixed fields, then the tail.
///
/// The body is rebuilt from scratch on every call.
pub fn build(frame: &Frame) -> Result<BytesMut> {
    let schema = frame.frame_type.schema();
    let fixed_len = usize::from(schema.fixed_len());

    let tail_len = match schema.tail {
        Tail::None => 0,
        Tail::Data { .. } => frame.data.len(),
        Tail::RouteRecords { .. } => {
            if frame.route_records.len() > usize::from(u8::MAX) {
                return Err(FrameError::TooManyRouteRecords {
                    count: frame.route_records.len(),
                });
            }
            1 + 2 * frame.route_records.len()
        }
    };

    let mut body = BytesMut::with_capacity(fixed_len + tail_len);
    body.resize(fixed_len, 0);
    write_u8(&mut body, Some(0), frame.frame_type.id());
    for slot in schema.fields {
        write_be(
            &mut body,
            Some(slot.offset),
            usize::from(slot.field.width()),
            frame.get(slot.field),
        );
    }

    match schema.tail {
        Tail::None => {}
        Tail::Data { .. } => body.put_slice(&frame.data),
        Tail::RouteRecords { .. } => {
            body.put_u8(frame.route_records.len() as u8);
            for hop in &frame.route_records {
                body.put_u16(*hop);
            }
        }
    }

    Ok(body)
}

/// Decode a body back into a structured frame.
pub fn decode(body: &[u8]) -> Result<Frame> {
    let identifier = *body.first().ok_or(FrameError::EmptyBody)?;
    let schema = layout(identifier).ok_or(FrameError::UnknownFrameType(identifier))?;
    let frame_type = schema.frame_type;

    if body.len() < schema.min_length() {
        return Err(too_short(frame_type, body.len(), schema.min_length()));
    }

    let mut frame = Frame::new(frame_type);
    for slot in schema.fields {
        let value = read_be(body, Some(slot.offset), usize::from(slot.field.width()));
        frame.set(slot.field, value);
    }

    match schema.tail {
        Tail::None => {}
        Tail::Data { offset, .. } => {
            frame.data = Bytes::copy_from_slice(&body[usize::from(offset)..]);
        }
        Tail::RouteRecords { offset } => {
            let count = usize::from(read_u8(body, Some(offset)));
            let first = usize::from(offset) + 1;
            let needed = first + 2 * count;
            if body.len() < needed {
                return Err(too_short(frame_type, body.len(), needed));
            }
            frame.route_records = (0..count)
                .map(|i| read_u16(body, u16::try_from(first + 2 * i).ok()))
                .collect();
        }
    }

    Ok(frame)
}

fn too_short(frame_type: FrameType, len: usize, min: usize) -> FrameError {
    FrameError::TooShort {
        frame_type,
        len,
        min,
    }
}

/// Append a complete wire frame for `frame` to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬──────────────────┬──────────┐
/// │ 0x7E     │ Length (2B)  │ Body             │ Checksum │
/// │          │ big-endian   │ (Length bytes)   │ (1B)     │
/// └──────────┴──────────────┴──────────────────┴──────────┘
/// ```
/// In [`ApiMode::Escaped`] everything after the delimiter is byte-stuffed.
pub fn encode_frame(frame: &Frame, mode: ApiMode, dst: &mut BytesMut) -> Result<()> {
    let body = build(frame)?;
    encode_body(&body, mode, dst)
}

/// Append a wire frame around an already-built body.
pub fn encode_body(body: &[u8], mode: ApiMode, dst: &mut BytesMut) -> Result<()> {
    if body.len() > MAX_BODY_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: MAX_BODY_LEN,
        });
    }

    let len = (body.len() as u16).to_be_bytes();
    let cs = [checksum(body)];

    dst.reserve(HEADER_SIZE + body.len() + 1);
    dst.put_u8(DELIMITER);
    match mode {
        ApiMode::Unescaped => {
            dst.put_slice(&len);
            dst.put_slice(body);
            dst.put_slice(&cs);
        }
        ApiMode::Escaped => {
            escape_into(&len, dst);
            escape_into(body, dst);
            escape_into(&cs, dst);
        }
    }
    Ok(())
}

/// `0x7E`, length, body, checksum.
pub fn to_wire(frame: &Frame) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_frame(frame, ApiMode::Unescaped, &mut dst)?;
    Ok(dst.freeze())
}

/// [`to_wire`] with every byte after the delimiter escaped.
pub fn to_wire_escaped(frame: &Frame) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_frame(frame, ApiMode::Escaped, &mut dst)?;
    Ok(dst.freeze())
}

/// Byte-stuff `src` into `dst`.
pub fn escape_into(src: &[u8], dst: &mut BytesMut) {
    for &b in src {
        if needs_escape(b) {
            dst.put_u8(ESCAPE);
            dst.put_u8(b ^ ESCAPE_XOR);
        } else {
            dst.put_u8(b);
        }
    }
}

/// Byte-stuff `src`.
pub fn escape(src: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(src.len() + src.len() / 8);
    escape_into(src, &mut dst);
    dst.freeze()
}

/// Reverse [`escape`].
///
/// A trailing lone escape marker has nothing to apply to and is dropped.
pub fn unescape(src: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(src.len());
    let mut bytes = src.iter();
    while let Some(&b) = bytes.next() {
        if b == ESCAPE {
            if let Some(&next) = bytes.next() {
                dst.put_u8(next ^ ESCAPE_XOR);
            }
        } else {
            dst.put_u8(b);
        }
    }
    dst.freeze()
}
