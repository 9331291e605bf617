//! Error types for source classification.

use thiserror::Error;

use crate::encoding::TextEncoding;

/// Errors that can occur while reading and classifying source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// I/O error reading a source file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The active encoding does not fit the file; classification must be
    /// restarted from offset 0 with `suggested`.
    #[error("encoding mismatch at line {line}: read as {active}, expected {suggested}")]
    EncodingMismatch {
        /// Line number (1-indexed) where the mismatch was detected.
        line: usize,
        /// Encoding the classifier was started with.
        active: TextEncoding,
        /// Encoding to restart with.
        suggested: TextEncoding,
    },
}

impl SourceError {
    /// Create an encoding mismatch error.
    pub fn encoding_mismatch(line: usize, active: TextEncoding, suggested: TextEncoding) -> Self {
        Self::EncodingMismatch {
            line,
            active,
            suggested,
        }
    }
}
