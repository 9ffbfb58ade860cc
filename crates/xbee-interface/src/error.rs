/// Errors that can occur in interface operations.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] xbee_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xbee_frame::FrameError),

    /// The radio stream is gone.
    #[error("radio disconnected: {0}")]
    Disconnected(String),

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Too many unrelated events queued while waiting for a response.
    #[error("backlog full: {0} events queued while waiting for a response")]
    BufferFull(usize),

    /// The frame cannot be sent as a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, InterfaceError>;
