use std::sync::LazyLock;

use regex::Regex;

use super::sections::SectionBoundaries;
use crate::models::{ClinicalRecord, RecordField};

/// How a rule turns a regex hit into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// Value is capture group 1.
    Group,
    /// Value runs from the end of the match to the next section header.
    UntilSection,
}

/// A compiled pattern bound to the one field it populates.
struct PatternRule {
    field: RecordField,
    regex: Regex,
    capture: Capture,
}

impl PatternRule {
    fn group(field: RecordField, pattern: &str) -> Self {
        Self {
            field,
            regex: Regex::new(pattern).unwrap(),
            capture: Capture::Group,
        }
    }

    fn until_section(field: RecordField, pattern: &str) -> Self {
        Self {
            field,
            regex: Regex::new(pattern).unwrap(),
            capture: Capture::UntilSection,
        }
    }

    /// First textual match wins; later repeats of the marker are ignored.
    fn apply(&self, text: &str, boundaries: &SectionBoundaries) -> Option<String> {
        let value = match self.capture {
            Capture::Group => self.regex.captures(text)?.get(1)?.as_str(),
            Capture::UntilSection => {
                let m = self.regex.find(text)?;
                boundaries.cut(&text[m.end()..])
            }
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// The fixed rule set, in application order. Each rule sees the full text.
static RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    vec![
        // "Patient is John Doe, ...": everything up to the comma or line end
        PatternRule::group(RecordField::Name, r"\bPatient is[ \t]+([^,\n]+)"),
        // "45 years old", "45-year-old"
        PatternRule::group(RecordField::Age, r"(?i)\b(\d{1,3})[ \t\-]*years?[ \t\-]*old\b"),
        PatternRule::group(RecordField::Gender, r"(?i)\b(male|female)\b"),
        // "from 12 Oak Road, Springfield.": stops at sentence end or line end
        PatternRule::group(
            RecordField::Address,
            r"(?m)\bfrom[ \t]+([A-Z0-9][^\n]*?)[ \t]*(?:\.(?:[ \t]|$)|$)",
        ),
        // "Chief complaint: X" or "chief complaint of X"
        PatternRule::group(
            RecordField::ChiefComplaint,
            r"(?i)\bchief(?:[ \t]+complaint[ \t]*[:\-]|[^\n]*?\bof)[ \t]+([^\n]+)",
        ),
        PatternRule::group(RecordField::BloodPressure, r"\bBP:?[ \t]*(\d{2,3}[ \t]*/[ \t]*\d{2,3})"),
        // units may follow directly: "HR 88bpm"
        PatternRule::group(RecordField::HeartRate, r"\bHR:?[ \t]*(\d{2,3})(?:\D|$)"),
        PatternRule::group(RecordField::Temperature, r"\bTemp:?[ \t]*(\d{2,3}(?:\.\d+)?)"),
        PatternRule::group(RecordField::Spo2, r"(?i)\bSpO2:?[ \t]*(\d{2,3})(?:\D|$)"),
        PatternRule::group(RecordField::Diagnosis, r"\bImpression[,:]?[ \t]*([^\n]+)"),
        PatternRule::until_section(RecordField::Plan, r"(?i)\bPlan[ \t]*:"),
    ]
});

/// Deterministic regex-based extractor. Total: never fails, leaves `""` for
/// every field whose marker is absent.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    boundaries: SectionBoundaries,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom section terminator list for section-bounded rules.
    pub fn with_boundaries(boundaries: SectionBoundaries) -> Self {
        Self { boundaries }
    }

    pub fn boundaries(&self) -> &SectionBoundaries {
        &self.boundaries
    }

    pub fn extract(&self, raw_text: &str) -> ClinicalRecord {
        let mut record = ClinicalRecord::default();
        for rule in RULES.iter() {
            if let Some(value) = rule.apply(raw_text, &self.boundaries) {
                record.set(rule.field, value);
            }
        }

        tracing::debug!(
            chars = raw_text.len(),
            filled = record.filled_count(),
            "Pattern extraction complete"
        );
        record
    }
}

/// Extract with the default section boundaries.
pub fn extract(raw_text: &str) -> ClinicalRecord {
    PatternExtractor::new().extract(raw_text)
}
