//! XBee API frame codec.
//!
//! Every frame on the wire is:
//! - the `0x7E` start delimiter
//! - a 2-byte big-endian body length
//! - the body: identifier byte, fixed fields, optional variable tail
//! - a checksum, `0xFF` minus the low byte of the body sum
//!
//! In API mode 2 every byte after the delimiter is additionally escaped.
//! [`build`] and [`decode`] are driven by the layout table in `xbee-schema`;
//! [`StreamAssembler`] recovers frames from arbitrary transport chunks.

pub mod assembler;
pub mod codec;
pub mod error;
pub mod field;
pub mod frame;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use assembler::{
    extract_frame, resume_frame, AssemblerState, Extracted, PartialFrame, StreamAssembler,
};
pub use codec::{
    build, decode, encode_body, encode_frame, escape, needs_escape, to_wire, to_wire_escaped,
    unescape, ApiMode, FrameConfig, DELIMITER, ESCAPE, HEADER_SIZE, MAX_BODY_LEN,
};
pub use error::{FrameError, Result};
pub use field::{checksum, verify_checksum};
pub use frame::{hex_string, Frame};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::XBeeCodec;
