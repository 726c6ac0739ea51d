//! Error taxonomy for the landmark → action pipeline.
//!
//! Every variant is recoverable: the frame loop skips the frame, the
//! scheduler returns to idle, and the avatar keeps its last state.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Landmark set cannot produce a full feature vector. The frame is skipped.
    #[error("incomplete landmarks: expected {expected}, got {present}{}", missing_suffix(.missing))]
    IncompleteLandmarks {
        expected: usize,
        present: usize,
        /// First landmark index that was absent or unusable, if known
        missing: Option<usize>,
    },

    /// Vector or landmark set has the wrong length. Dropped without side effects.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The classifier ran but did not produce a usable label.
    #[error("classification failed: {0}")]
    ClassificationFailed(String),

    /// The inference engine is not loaded yet (or failed to load).
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn missing_suffix(missing: &Option<usize>) -> String {
    match missing {
        Some(index) => format!(" (landmark {} missing)", index),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_landmarks_message() {
        let err = Error::IncompleteLandmarks {
            expected: 33,
            present: 32,
            missing: Some(23),
        };
        assert_eq!(
            err.to_string(),
            "incomplete landmarks: expected 33, got 32 (landmark 23 missing)"
        );
    }

    #[test]
    fn test_incomplete_landmarks_message_without_index() {
        let err = Error::IncompleteLandmarks {
            expected: 33,
            present: 10,
            missing: None,
        };
        assert_eq!(err.to_string(), "incomplete landmarks: expected 33, got 10");
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            expected: 66,
            actual: 64,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 66, got 64");
    }
}
