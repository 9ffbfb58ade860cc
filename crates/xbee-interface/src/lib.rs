//! Threaded radio interface.
//!
//! This is the "just works" layer. Open an endpoint, send frames, and receive
//! decoded frames as events from a dedicated reader thread. Requests are
//! correlated to their responses by frame id.

pub mod connector;
pub mod error;
pub mod event;
pub mod frame_id;
pub mod interface;

pub use connector::{open, open_with_config};
pub use error::{InterfaceError, Result};
pub use event::Event;
pub use frame_id::FrameIdAllocator;
pub use interface::{
    InterfaceConfig, XBeeInterface, DEFAULT_MAX_BACKLOG, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
