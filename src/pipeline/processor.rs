//! Note processing entry point.
//!
//! Dispatches a note to the pattern extractor or the LLM structurer and
//! stamps the result. Does not render or persist anything; that belongs to
//! the command layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::extraction::PatternExtractor;
use super::structuring::{normalize, DocumentStructurer, ReplicateClient};
use super::{ensure_note, ExtractionError};
use crate::config::{ConfigurationError, ServiceConfig};
use crate::models::{ClinicalRecord, Strategy};

/// Result of one extraction, ready for review.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub extraction_id: Uuid,
    pub strategy: Strategy,
    pub record: ClinicalRecord,
    /// Model completions requested; zero for the pattern strategy.
    pub attempts: usize,
    pub generated_at: DateTime<Utc>,
}

pub struct NoteProcessor {
    pattern: PatternExtractor,
    /// Why the LLM strategy is unavailable, when it is.
    structurer: Result<DocumentStructurer, ConfigurationError>,
}

impl NoteProcessor {
    /// Processor that can only run the pattern strategy.
    pub fn pattern_only() -> Self {
        Self {
            pattern: PatternExtractor::new(),
            structurer: Err(ConfigurationError::MissingCredential),
        }
    }

    pub fn with_structurer(structurer: DocumentStructurer) -> Self {
        Self {
            pattern: PatternExtractor::new(),
            structurer: Ok(structurer),
        }
    }

    pub fn with_pattern(mut self, pattern: PatternExtractor) -> Self {
        self.pattern = pattern;
        self
    }

    /// Build from settings. The pattern strategy is always available. A
    /// missing or malformed token, or any other LLM setting the client
    /// rejects, only disables the LLM strategy; `process` reports it when
    /// that strategy is asked for.
    pub fn from_config(config: &ServiceConfig) -> Self {
        if config.token.is_none() {
            tracing::info!("No access token configured, LLM strategy unavailable");
            return Self::pattern_only();
        }

        let client = match ReplicateClient::new(config) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "LLM strategy unavailable");
                return Self {
                    pattern: PatternExtractor::new(),
                    structurer: Err(e),
                };
            }
        };
        tracing::info!(model = %client.model(), "Note processor using LLM model");

        let structurer = DocumentStructurer::new(Box::new(client))
            .with_sampling(config.sampling)
            .with_schema_hint(config.schema_hint)
            .with_resample(config.resample);
        Self::with_structurer(structurer)
    }

    pub fn supports(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Pattern => true,
            Strategy::Llm => self.structurer.is_ok(),
        }
    }

    pub fn process(
        &self,
        raw_text: &str,
        strategy: Strategy,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let extraction_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "extract_note",
            extraction_id = %extraction_id,
            strategy = %strategy,
            chars = raw_text.len()
        )
        .entered();

        ensure_note(raw_text)?;

        let (record, attempts) = match strategy {
            Strategy::Pattern => (normalize(self.pattern.extract(raw_text)), 0),
            Strategy::Llm => {
                let structurer = self.structurer.as_ref().map_err(ConfigurationError::clone)?;
                let structured = structurer.structure_note(raw_text, &extraction_id)?;
                (structured.record, structured.attempts)
            }
        };

        tracing::info!(
            extraction_id = %extraction_id,
            filled = record.filled_count(),
            attempts,
            "Extraction complete"
        );

        Ok(ExtractionOutcome {
            extraction_id,
            strategy,
            record,
            attempts,
            generated_at: Utc::now(),
        })
    }
}
