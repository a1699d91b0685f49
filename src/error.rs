use thiserror::Error;

/// Low-level failure while decoding a metadata segment.
///
/// These never escape report building: the offending segment is skipped and
/// the error is logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Truncated read: {needed} bytes at offset {offset} (buffer is {len} bytes)")]
    Truncated { offset: usize, needed: usize, len: usize },

    #[error("Unknown TIFF byte order marker: 0x{0:04x}")]
    BadByteOrder(u16),

    #[error("Offset arithmetic overflow")]
    OffsetOverflow,
}

#[derive(Error, Debug)]
pub enum ScrubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, ScrubError>;
