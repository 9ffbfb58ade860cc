use xbee_schema::FrameType;

/// Errors that can occur while building, decoding or transporting frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The identifier byte does not name a known frame type.
    #[error("unknown frame type 0x{0:02x}")]
    UnknownFrameType(u8),

    /// A body with no identifier byte.
    #[error("empty frame body")]
    EmptyBody,

    /// The body is shorter than its frame type requires.
    #[error("{frame_type} body too short ({len} bytes, need {min})")]
    TooShort {
        frame_type: FrameType,
        len: usize,
        min: usize,
    },

    /// The route-record list does not fit its one-byte count.
    #[error("too many route records ({count}, max 255)")]
    TooManyRouteRecords { count: usize },

    /// The body does not fit the 16-bit length field or the configured limit.
    #[error("frame body too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A complete frame arrived but failed its integrity check.
    #[error("checksum mismatch (expected 0x{expected:02x}, got 0x{actual:02x})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors scoped to a single frame.
    ///
    /// The stream stays usable after these; the next read resumes with the
    /// following bytes.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownFrameType(_)
                | FrameError::EmptyBody
                | FrameError::TooShort { .. }
                | FrameError::TooManyRouteRecords { .. }
                | FrameError::PayloadTooLarge { .. }
                | FrameError::ChecksumMismatch { .. }
        )
    }

    /// True when a read gave up on its timeout without data.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }
}


pub type Result<T> = std::result::Result<T, FrameError>;
