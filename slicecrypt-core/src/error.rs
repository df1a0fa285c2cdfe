//! Error types for selective slice encryption.

use crate::package::Section;
use thiserror::Error;

/// Errors that can occur while packing, unpacking or keying a stream.
#[derive(Debug, Error)]
pub enum Error {
    /// A package section or its length prefix runs past the end of the data.
    #[error(
        "truncated package: {section} section needs {declared} bytes but only {remaining} bytes remain"
    )]
    Truncated {
        section: Section,
        declared: u64,
        remaining: u64,
    },

    /// Data left over after the metadata section.
    #[error("malformed package: {0} unexpected bytes after the metadata section")]
    TrailingBytes(u64),

    /// Seed text is not url-safe base64 or is too short.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Seed file holds fewer seeds than a session needs.
    #[error("seed file must contain at least {required} seeds, found {found}")]
    NotEnoughSeeds { required: usize, found: usize },

    /// A persisted selection refers to a slice the qp list does not cover.
    #[error("selected slice index {index} is outside the qp list ({len} entries)")]
    SelectionOutOfRange { index: usize, len: usize },

    /// Metadata or seed file is not valid json for its schema.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (for file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the error describes a malformed package.
    pub fn is_format_err(&self) -> bool {
        matches!(self, Self::Truncated { .. } | Self::TrailingBytes(_))
    }
}
