pub mod extraction;
pub mod review;

pub use extraction::{generate_record, GeneratedRecord, GENERATED_MESSAGE};
pub use review::save_record;

use serde::Serialize;

use crate::config::{ApiToken, ServiceConfig};

/// LLM strategy availability, for a status indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// No token configured; pattern extraction only.
    Missing,
    /// Token has the expected shape. Not verified against the service.
    WellFormed,
    Malformed,
}

impl TokenStatus {
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Missing => "No access token configured. Only pattern extraction is available.",
            Self::WellFormed => "Access token looks valid. LLM extraction is available.",
            Self::Malformed => "Access token is malformed. Check REPLICATE_API_TOKEN.",
        }
    }
}

/// Shape check of the configured token; no network call.
pub fn check_token(config: &ServiceConfig) -> TokenStatus {
    match config.token.as_deref() {
        None => TokenStatus::Missing,
        Some(raw) => match ApiToken::parse(raw) {
            Ok(_) => TokenStatus::WellFormed,
            Err(_) => TokenStatus::Malformed,
        },
    }
}
