//! Prompt-driven extraction: prompt → LLM → JSON recovery → normalization.

pub mod types;
pub mod prompt;
pub mod stream;
pub mod replicate;
pub mod parser;
pub mod normalize;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use stream::*;
pub use replicate::*;
pub use parser::*;
pub use normalize::*;
pub use orchestrator::*;

use std::time::Duration;

use thiserror::Error;

/// Why a model reply could not be turned into structured data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryFailure {
    #[error("No JSON object found in the model response")]
    NoJsonFound,

    /// `fragment` is the exact `{...}` slice that failed to parse.
    #[error("Malformed JSON in the model response: {reason}")]
    MalformedJson { fragment: String, reason: String },
}

impl RecoveryFailure {
    /// The offending text, when there is one to show.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::NoJsonFound => None,
            Self::MalformedJson { fragment, .. } => Some(fragment),
        }
    }
}

/// Why the completion service did not produce a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("LLM service is unreachable: {0}")]
    Network(String),

    #[error("LLM service rejected the access token (HTTP {status})")]
    Auth { status: u16 },

    #[error("LLM service rate limit reached, try again later")]
    RateLimited,

    #[error("LLM request timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("LLM service returned an error (HTTP {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Unexpected LLM service response: {0}")]
    InvalidResponse(String),

    #[error("LLM response stream failed: {0}")]
    Stream(String),
}

impl GenerationFailure {
    /// Short machine-readable cause, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth { .. } => "auth",
            Self::RateLimited => "rate_limited",
            Self::TimedOut(_) => "timed_out",
            Self::Service { .. } => "service",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Stream(_) => "stream",
        }
    }
}
