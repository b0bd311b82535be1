use uuid::Uuid;

use super::normalize::normalize;
use super::parser::recover;
use super::prompt::build_prompt;
use super::types::{LlmClient, RecoveredRecord, SamplingParams};
use super::RecoveryFailure;
use crate::models::{ClinicalRecord, SchemaHint};
use crate::pipeline::{ensure_note, ExtractionError};

/// How many extra completions to request when a reply cannot be recovered.
///
/// Generation failures are never resampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResamplePolicy {
    pub max_resamples: usize,
}

impl ResamplePolicy {
    pub fn new(max_resamples: usize) -> Self {
        Self { max_resamples }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Result of one LLM structuring run.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredNote {
    pub record: ClinicalRecord,
    /// Completions requested, including the first.
    pub attempts: usize,
    pub raw_response: String,
}

/// Runs the LLM strategy:
/// prompt → generate → recover → normalize
pub struct DocumentStructurer {
    llm: Box<dyn LlmClient + Send + Sync>,
    sampling: SamplingParams,
    schema_hint: SchemaHint,
    resample: ResamplePolicy,
}

impl DocumentStructurer {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>) -> Self {
        Self {
            llm,
            sampling: SamplingParams::default(),
            schema_hint: SchemaHint::default(),
            resample: ResamplePolicy::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_schema_hint(mut self, schema_hint: SchemaHint) -> Self {
        self.schema_hint = schema_hint;
        self
    }

    pub fn with_resample(mut self, resample: ResamplePolicy) -> Self {
        self.resample = resample;
        self
    }

    pub fn schema_hint(&self) -> SchemaHint {
        self.schema_hint
    }

    pub fn structure_note(
        &self,
        raw_text: &str,
        extraction_id: &Uuid,
    ) -> Result<StructuredNote, ExtractionError> {
        let _span = tracing::info_span!(
            "structure_note",
            extraction_id = %extraction_id,
            schema = %self.schema_hint
        )
        .entered();

        ensure_note(raw_text)?;
        self.sampling.validate()?;

        let prompt = build_prompt(raw_text, self.schema_hint);
        let (recovered, attempts, raw_response) = self.generate_with_resample(&prompt, extraction_id)?;
        let record = normalize(recovered);

        tracing::info!(
            extraction_id = %extraction_id,
            attempts,
            filled = record.filled_count(),
            "Note structured"
        );

        Ok(StructuredNote {
            record,
            attempts,
            raw_response,
        })
    }

    /// Generate and recover, asking again on unrecoverable replies while the
    /// resample budget lasts. Generation failures propagate immediately.
    fn generate_with_resample(
        &self,
        prompt: &str,
        extraction_id: &Uuid,
    ) -> Result<(RecoveredRecord, usize, String), ExtractionError> {
        let mut last_failure = RecoveryFailure::NoJsonFound;

        for attempt in 0..=self.resample.max_resamples {
            let response = self.llm.generate(prompt, &self.sampling).map_err(|e| {
                tracing::warn!(
                    extraction_id = %extraction_id,
                    attempt = attempt + 1,
                    kind = e.kind(),
                    "LLM generation failed"
                );
                e
            })?;

            match recover(&response) {
                Ok(recovered) => return Ok((recovered, attempt + 1, response)),
                Err(failure) if attempt < self.resample.max_resamples => {
                    tracing::warn!(
                        extraction_id = %extraction_id,
                        attempt = attempt + 1,
                        error = %failure,
                        "Reply not recoverable, resampling"
                    );
                    last_failure = failure;
                }
                Err(failure) => {
                    last_failure = failure;
                    break;
                }
            }
        }

        Err(last_failure.into())
    }
}
