use crate::models::SchemaHint;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a clinical documentation assistant. Your ONLY role is to copy
information from a doctor's free-text note into a fixed JSON structure.

RULES (ABSOLUTE, NO EXCEPTIONS):
1. Extract ONLY information explicitly stated in the note.
2. NEVER add interpretation, diagnosis, advice, or clinical opinion.
3. If a field is not mentioned, use an empty string "".
4. Keep vital signs exactly as written, with their original format (e.g. "120/80").
5. Output ONE valid JSON object and nothing else.
"#;

/// Build the extraction prompt for one note.
///
/// The note is embedded verbatim at the end. It is not escaped, so a note
/// containing instructions can steer the model; callers that accept
/// untrusted notes must treat the output accordingly.
pub fn build_prompt(raw_text: &str, schema_hint: SchemaHint) -> String {
    let (schema, rules) = match schema_hint {
        SchemaHint::Scalar => (SCALAR_SCHEMA, SCALAR_RULES),
        SchemaHint::Bulleted => (BULLETED_SCHEMA, BULLETED_RULES),
    };

    format!(
        r#"Convert the clinical note below into an electronic medical record.
Return the information as JSON with exactly this structure:

```json
{schema}
```

{rules}
<note>
{raw_text}
</note>
"#
    )
}

const SCALAR_SCHEMA: &str = r#"{
  "demographics": {
    "name": "patient full name",
    "age": "age in years, digits only",
    "gender": "male | female",
    "address": "home address"
  },
  "vitals": {
    "blood_pressure": "e.g. 120/80",
    "heart_rate": "beats per minute, digits only",
    "temperature": "as written, e.g. 98.6",
    "spo2": "percent, digits only"
  },
  "chief_complaint": "main reason for the visit",
  "physical_exam": "examination findings",
  "diagnosis": "impression or diagnosis",
  "plan": "treatment plan and orders"
}"#;

const BULLETED_SCHEMA: &str = r#"{
  "demographics": {
    "name": "patient full name",
    "age": "age in years, digits only",
    "gender": "male | female",
    "address": "home address"
  },
  "vitals": {
    "blood_pressure": "e.g. 120/80",
    "heart_rate": "beats per minute, digits only",
    "temperature": "as written, e.g. 98.6",
    "spo2": "percent, digits only"
  },
  "chief_complaint": "main reason for the visit",
  "physical_exam": ["• finding 1", "• finding 2"],
  "diagnosis": "impression or diagnosis",
  "plan": ["• order 1", "• order 2"]
}"#;

const SCALAR_RULES: &str = "Formatting rules:
- Every value is a JSON string.
";

const BULLETED_RULES: &str = "Formatting rules:
- \"physical_exam\" and \"plan\" are JSON arrays of strings.
- Put ONE finding or order per array item.
- Start every array item with \"• \".
- Every other value is a JSON string.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ends_with_note_verbatim() {
        let note = "Patient is John Doe, BP 120/80 {odd braces}";
        let prompt = build_prompt(note, SchemaHint::Scalar);
        assert!(prompt.trim_end().ends_with(&format!("<note>\n{note}\n</note>")));
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_prompt("same note", SchemaHint::Bulleted);
        let b = build_prompt("same note", SchemaHint::Bulleted);
        assert_eq!(a, b);
    }

    #[test]
    fn scalar_schema_is_valid_json_with_every_field() {
        let schema: serde_json::Value = serde_json::from_str(SCALAR_SCHEMA).unwrap();
        for key in ["chief_complaint", "physical_exam", "diagnosis", "plan"] {
            assert!(schema[key].is_string(), "{key} should be a string");
        }
        assert!(schema["vitals"]["blood_pressure"].is_string());
        assert!(schema["demographics"]["address"].is_string());
    }

    #[test]
    fn bulleted_schema_requests_lists() {
        let schema: serde_json::Value = serde_json::from_str(BULLETED_SCHEMA).unwrap();
        assert!(schema["physical_exam"].is_array());
        assert!(schema["plan"].is_array());

        let prompt = build_prompt("note", SchemaHint::Bulleted);
        assert!(prompt.contains("Start every array item with \"• \""));
    }

    #[test]
    fn scalar_prompt_has_no_bullet_rules() {
        let prompt = build_prompt("note", SchemaHint::Scalar);
        assert!(!prompt.contains("array item"));
        assert!(prompt.contains("\"plan\": \"treatment plan and orders\""));
    }

    #[test]
    fn system_prompt_enforces_extraction_only() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("NEVER add interpretation"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("ONE valid JSON object"));
    }
}
