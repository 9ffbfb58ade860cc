/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The identifier byte does not name a known frame type.
    #[error("unknown frame type 0x{0:02x}")]
    UnknownFrameType(u8),

    /// No field carries the requested name.
    #[error("unknown field name: {0}")]
    UnknownField(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
