//! Error types for WAV header parsing.
//!
//! Input that is valid but outside what the parser handles (not RIFF, not
//! WAVE, not 16-bit PCM) is reported as `Ok(None)` by the readers and never
//! shows up here.

use thiserror::Error;

use crate::chunk::FourCc;

/// Errors that can occur while scanning a RIFF/WAVE header.
#[derive(Error, Debug)]
pub enum WavError {
    /// Reading from or seeking the underlying source failed, including an
    /// unexpected end of stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled through a `CancellationToken`.
    #[error("Operation cancelled")]
    Cancelled,

    /// A chunk other than the required one was found.
    #[error("Expected {expected} chunk; found: {found}")]
    UnexpectedChunk { expected: FourCc, found: FourCc },

    /// The declared block alignment disagrees with channels * bits / 8.
    #[error("Expected WAV block alignment of: {expected}; got: {actual}")]
    BlockAlignmentMismatch { expected: u32, actual: u16 },

    /// A chunk is too large (~2GB+) to be skipped in one step.
    #[error("Chunk is too large (~2GB+) to skip; id: {id}, size: {size}")]
    ChunkTooLarge { id: FourCc, size: i64 },

    /// A structural requirement of RIFF/WAVE was violated in a way that
    /// cannot be recovered from.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WavError {
    /// Returns `true` for structural violations of the container.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            WavError::UnexpectedChunk { .. }
                | WavError::BlockAlignmentMismatch { .. }
                | WavError::ChunkTooLarge { .. }
        )
    }

    /// Returns `true` if the failed call can be retried on the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WavError::Io(_) | WavError::Cancelled)
    }
}

/// Result type for WAV header operations.
pub type Result<T> = std::result::Result<T, WavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let io = WavError::from(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short read",
        ));
        assert!(io.is_retryable());
        assert!(!io.is_parse_error());

        let mismatch = WavError::BlockAlignmentMismatch {
            expected: 4,
            actual: 3,
        };
        assert!(mismatch.is_parse_error());
        assert!(!mismatch.is_retryable());

        let state = WavError::InvalidState("format chunk too small".to_string());
        assert!(!state.is_parse_error());
        assert!(!state.is_retryable());
    }

    #[test]
    fn test_messages_cite_values() {
        let err = WavError::BlockAlignmentMismatch {
            expected: 4,
            actual: 6,
        };
        assert_eq!(
            err.to_string(),
            "Expected WAV block alignment of: 4; got: 6"
        );

        let err = WavError::UnexpectedChunk {
            expected: FourCc::FMT,
            found: FourCc(*b"LIST"),
        };
        assert_eq!(err.to_string(), "Expected fmt  chunk; found: LIST");
    }
}
