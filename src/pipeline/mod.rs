pub mod extraction;
pub mod structuring;
pub mod processor;

pub use processor::*;

use thiserror::Error;

use crate::config::ConfigurationError;
use structuring::{GenerationFailure, RecoveryFailure};

/// Notes with fewer non-whitespace characters than this are rejected.
pub const MIN_NOTE_LENGTH: usize = 1;

/// Top-level failure of one extraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Please enter medical notes first")]
    EmptyNote,

    #[error("Could not read the model response: {0}")]
    Recovery(#[from] RecoveryFailure),

    #[error("Model call failed: {0}")]
    Generation(#[from] GenerationFailure),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl ExtractionError {
    /// Offending model output for malformed replies, for display to the user.
    pub fn diagnostic_text(&self) -> Option<&str> {
        match self {
            Self::Recovery(failure) => failure.fragment(),
            _ => None,
        }
    }
}

/// Reject notes that carry no text.
pub fn ensure_note(raw_text: &str) -> Result<(), ExtractionError> {
    let chars = raw_text.chars().filter(|c| !c.is_whitespace()).count();
    if chars < MIN_NOTE_LENGTH {
        return Err(ExtractionError::EmptyNote);
    }
    Ok(())
}
