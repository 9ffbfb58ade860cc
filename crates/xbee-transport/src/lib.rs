//! Byte-stream transports for XBee radios.
//!
//! Provides one Read + Write type over the ways a host reaches a radio:
//! - a serial tty, configured raw through termios (Linux/macOS)
//! - a TCP socket, for ser2net-style bridges and simulators
//! - a Unix stream socket
//!
//! This is the lowest layer. The frame codec and the interface build on the
//! [`XBeeStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod serial;
pub mod stream;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use serial::{enumerate_ports, DataBits, FlowControl, Parity, PortConfig, StopBits};
pub use stream::XBeeStream;
