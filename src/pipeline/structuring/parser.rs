use super::types::RecoveredRecord;
use super::RecoveryFailure;

/// Slice from the first `{` to the last `}` (inclusive), if both exist in
/// that order.
pub fn locate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Recover a structured record from a model reply with arbitrary text around
/// the JSON object.
///
/// Fail-fast: no bracket balancing or quote fixing is attempted. A reply
/// that does not parse is reported with the offending slice so the caller can
/// show it or ask the model again.
pub fn recover(text: &str) -> Result<RecoveredRecord, RecoveryFailure> {
    let fragment = locate_json_object(text).ok_or(RecoveryFailure::NoJsonFound)?;

    serde_json::from_str::<RecoveredRecord>(fragment).map_err(|e| {
        tracing::warn!(
            fragment_chars = fragment.len(),
            line = e.line(),
            column = e.column(),
            "Model response JSON failed to parse"
        );
        RecoveryFailure::MalformedJson {
            fragment: fragment.to_string(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::types::ClinicalText;

    fn sample_json() -> &'static str {
        r#"{
  "demographics": {"name": "John Doe", "age": "45", "gender": "male", "address": "12 Oak Road"},
  "vitals": {"blood_pressure": "120/80", "heart_rate": "88", "temperature": "98.6", "spo2": "97"},
  "chief_complaint": "chest pain",
  "physical_exam": ["• Diaphoretic", "• Regular rhythm"],
  "diagnosis": "Possible ACS",
  "plan": ["• ECG", "• Troponin"]
}"#
    }

    #[test]
    fn recovers_object_between_prose() {
        let response = format!(
            "Sure! Here is the EMR you asked for:\n\n{}\n\nLet me know if anything is missing.",
            sample_json()
        );
        let record = recover(&response).unwrap();

        let demographics = record.demographics.as_ref().unwrap();
        assert_eq!(demographics.name, "John Doe");
        assert_eq!(record.vitals.as_ref().unwrap().blood_pressure, "120/80");
        assert_eq!(record.chief_complaint, Some(ClinicalText::Scalar("chest pain".into())));
        assert_eq!(
            record.plan,
            Some(ClinicalText::BulletedList(vec!["• ECG".into(), "• Troponin".into()]))
        );
    }

    #[test]
    fn recovers_from_fenced_block() {
        let response = format!("```json\n{}\n```", sample_json());
        assert!(recover(&response).is_ok());
    }

    #[test]
    fn reparse_of_extracted_slice_is_identical() {
        let response = format!("prefix text {} suffix text", sample_json());
        let first = recover(&response).unwrap();
        let slice = locate_json_object(&response).unwrap();
        assert_eq!(slice, sample_json());
        assert_eq!(recover(slice).unwrap(), first);
    }

    #[test]
    fn no_braces_is_no_json_found() {
        assert_eq!(recover("no braces here"), Err(RecoveryFailure::NoJsonFound));
    }

    #[test]
    fn only_opening_brace_is_no_json_found() {
        assert_eq!(recover("{ unfinished"), Err(RecoveryFailure::NoJsonFound));
    }

    #[test]
    fn reversed_braces_are_no_json_found() {
        assert_eq!(recover("} backwards {"), Err(RecoveryFailure::NoJsonFound));
    }

    #[test]
    fn malformed_json_keeps_offending_substring() {
        let err = recover("prefix {bad json] suffix").unwrap_err();
        match err {
            RecoveryFailure::MalformedJson { fragment, reason } => {
                assert_eq!(fragment, "{bad json]");
                assert!(!reason.is_empty());
            }
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn truncated_reply_is_not_repaired() {
        let truncated = r#"{"demographics": {"name": "Ann"}, "plan": ["• Rest"}"#;
        let err = recover(truncated).unwrap_err();
        assert_eq!(err.fragment(), Some(truncated));
    }

    #[test]
    fn slice_spans_first_open_to_last_close() {
        let text = "a {\"plan\": \"x\"} b {\"plan\": \"y\"} c";
        assert_eq!(
            locate_json_object(text),
            Some("{\"plan\": \"x\"} b {\"plan\": \"y\"}")
        );
        assert!(matches!(recover(text), Err(RecoveryFailure::MalformedJson { .. })));
    }

    #[test]
    fn empty_object_recovers_to_empty_record() {
        assert_eq!(recover("{}").unwrap(), RecoveredRecord::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let record = recover(r#"{"history": "smoker", "plan": "quit"}"#).unwrap();
        assert_eq!(record.plan, Some(ClinicalText::Scalar("quit".into())));
    }
}
