//! XBee/ZigBee API frame toolkit.
//!
//! Encodes and decodes the framed binary protocol XBee radios speak in API
//! mode, in both the plain and the escaped variant, and reassembles frames
//! from an arbitrary byte stream.
//!
//! # Crate Structure
//!
//! - [`schema`]: static layout registry, one entry per frame type
//! - [`frame`]: frame codec, checksum, escaping and the stream assembler
//! - [`transport`]: serial, TCP and Unix socket byte streams
//! - [`interface`]: threaded radio interface with request correlation
//!
//! ```
//! use xbee::frame::{decode, to_wire, Frame};
//!
//! let wire = to_wire(&Frame::at_command(1, *b"NJ", Vec::new())).unwrap();
//! assert_eq!(wire.as_ref(), [0x7E, 0x00, 0x04, 0x08, 0x01, 0x4E, 0x4A, 0x5E]);
//! let frame = decode(&wire[3..wire.len() - 1]).unwrap();
//! assert_eq!(&frame.at_cmd, b"NJ");
//! ```

/// Re-export schema types.
pub mod schema {
    pub use xbee_schema::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xbee_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use xbee_transport::*;
}

/// Re-export interface types.
pub mod interface {
    pub use xbee_interface::*;
}
