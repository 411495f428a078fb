//! Error types for darc_core.

use thiserror::Error;

/// Result type alias using darc_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the codec and location parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A negative value was handed to the varint encoder.
    #[error("Cannot encode negative value as varint: {value}")]
    NegativeVarint { value: i64 },

    /// Varint input ended before a terminating byte.
    #[error("Truncated varint: {consumed} bytes without a terminator")]
    TruncatedVarint { consumed: usize },

    /// Varint does not fit in 64 bits.
    #[error("Varint overflows 64 bits")]
    VarintOverflow,

    /// Location text does not follow `[[user@]host:]path[::archive]`.
    #[error("Invalid location format: \"{text}\"")]
    InvalidLocation { text: String },

    /// Location names no archive where one is required.
    #[error("\"{text}\": No archive specified")]
    ArchiveRequired { text: String },

    /// Location names an archive where none is allowed.
    #[error("\"{text}\" No archive can be specified")]
    ArchiveForbidden { text: String },
}

impl Error {
    /// Create a NegativeVarint error.
    pub fn negative_varint(value: i64) -> Self {
        Error::NegativeVarint { value }
    }

    /// Create a TruncatedVarint error.
    pub fn truncated_varint(consumed: usize) -> Self {
        Error::TruncatedVarint { consumed }
    }

    /// Create an InvalidLocation error.
    pub fn invalid_location(text: impl Into<String>) -> Self {
        Error::InvalidLocation { text: text.into() }
    }

    /// Create an ArchiveRequired error.
    pub fn archive_required(text: impl Into<String>) -> Self {
        Error::ArchiveRequired { text: text.into() }
    }

    /// Create an ArchiveForbidden error.
    pub fn archive_forbidden(text: impl Into<String>) -> Self {
        Error::ArchiveForbidden { text: text.into() }
    }
}
