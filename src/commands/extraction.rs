//! "Generate EMR" action.
//!
//! Runs the processor on the entered note, loads the result into the form
//! state and renders it. Failures come back as user-facing messages and
//! leave the current form untouched.

use serde::Serialize;

use crate::models::Strategy;
use crate::pipeline::{ExtractionOutcome, NoteProcessor};
use crate::review::{EditableForm, FormRenderer, FormState};

pub const GENERATED_MESSAGE: &str = "EMR generated! Please verify the information on the right.";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedRecord {
    pub outcome: ExtractionOutcome,
    pub form: EditableForm,
    pub message: String,
}

pub fn generate_record(
    processor: &NoteProcessor,
    renderer: &dyn FormRenderer,
    state: &mut FormState,
    note: &str,
    strategy: Strategy,
) -> Result<GeneratedRecord, String> {
    let result = processor.process(note, strategy);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(strategy = %strategy, error = %e, "Generate EMR failed");
            return Err(match e.diagnostic_text() {
                Some(fragment) => format!("Error: {e}\n\nModel output:\n{fragment}"),
                None => format!("Error: {e}"),
            });
        }
    };

    let record = state.apply::<String>(Ok(outcome.record.clone()))?;
    let form = renderer.render(record);

    Ok(GeneratedRecord {
        outcome,
        form,
        message: GENERATED_MESSAGE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordField;
    use crate::pipeline::structuring::{DocumentStructurer, MockLlmClient};
    use crate::review::DefaultFormRenderer;

    const NOTE: &str = "Patient is John Doe, 45 years old male.\nBP 120/80";

    #[test]
    fn generate_fills_state_and_form() {
        let processor = NoteProcessor::pattern_only();
        let mut state = FormState::default();

        let generated =
            generate_record(&processor, &DefaultFormRenderer, &mut state, NOTE, Strategy::Pattern)
                .unwrap();

        assert_eq!(generated.message, GENERATED_MESSAGE);
        assert_eq!(state.record().demographics.name, "John Doe");
        assert_eq!(
            generated.form.field(RecordField::BloodPressure).unwrap().value,
            "120/80"
        );
    }

    #[test]
    fn empty_note_keeps_previous_form() {
        let processor = NoteProcessor::pattern_only();
        let mut state = FormState::default();
        generate_record(&processor, &DefaultFormRenderer, &mut state, NOTE, Strategy::Pattern)
            .unwrap();

        let err = generate_record(&processor, &DefaultFormRenderer, &mut state, "  ", Strategy::Pattern)
            .unwrap_err();
        assert_eq!(err, "Error: Please enter medical notes first");
        assert_eq!(state.record().demographics.name, "John Doe");
    }

    #[test]
    fn malformed_reply_shows_model_output() {
        let llm = MockLlmClient::new("Sure: {\"plan\": [oops]}");
        let processor = NoteProcessor::with_structurer(DocumentStructurer::new(Box::new(llm)));
        let mut state = FormState::default();

        let err = generate_record(&processor, &DefaultFormRenderer, &mut state, NOTE, Strategy::Llm)
            .unwrap_err();
        assert!(err.starts_with("Error: "));
        assert!(err.ends_with("{\"plan\": [oops]}"));
        assert!(state.record().is_empty());
    }
}
