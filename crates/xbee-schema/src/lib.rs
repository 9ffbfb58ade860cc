//! Static frame-type layout registry for XBee/ZigBee API frames.
//!
//! Every API frame body starts with a one-byte identifier. The identifier
//! selects a [`FrameSchema`]: the offset of each fixed field within the
//! body, the optional variable-length tail, and the minimum body length.
//!
//! The table is plain data. Codecs, builders and tooling read it through
//! [`layout`] and [`frame_schemas`] instead of hard-coding offsets.

pub mod error;
pub mod field;
pub mod frame_type;
pub mod layout;

pub use error::{Result, SchemaError};
pub use field::{Field, FieldFormat};
pub use frame_type::FrameType;
pub use layout::{frame_schemas, layout, FieldSlot, FrameSchema, Tail};
