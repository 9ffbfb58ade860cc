use xbee_frame::{Frame, FrameError};

/// What the reader thread hands to the interface.
#[derive(Debug)]
pub enum Event {
    /// A decoded inbound frame.
    Frame(Frame),
    /// A frame-scoped error; the stream continues.
    Error(FrameError),
    /// The stream ended. `reason` is set when it ended on an error.
    Closed { reason: Option<String> },
}

impl Event {
    pub fn is_closed(&self) -> bool {
        matches!(self, Event::Closed { .. })
    }
}
