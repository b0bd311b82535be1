use super::types::{ClinicalText, RecoveredRecord};
use crate::models::{ClinicalRecord, Demographics, RecordField, Vitals};

/// Marker prefixed to every item of a flattened list field.
pub const BULLET: char = '•';

/// Anything the normalizer accepts.
#[derive(Debug, Clone)]
pub enum Normalizable {
    /// Already canonical (pattern extractor output or an edited form).
    Canonical(ClinicalRecord),
    /// Raw structure recovered from model JSON.
    Recovered(RecoveredRecord),
}

impl From<ClinicalRecord> for Normalizable {
    fn from(record: ClinicalRecord) -> Self {
        Self::Canonical(record)
    }
}

impl From<RecoveredRecord> for Normalizable {
    fn from(record: RecoveredRecord) -> Self {
        Self::Recovered(record)
    }
}

/// Map recovered fields onto the canonical record shape.
///
/// Missing leaves and missing nested objects become `""`; list-valued fields
/// are flattened to one bullet item per line.
pub fn normalize(parsed: impl Into<Normalizable>) -> ClinicalRecord {
    match parsed.into() {
        Normalizable::Canonical(record) => trim_record(record),
        Normalizable::Recovered(recovered) => from_recovered(recovered),
    }
}

fn trim_record(mut record: ClinicalRecord) -> ClinicalRecord {
    for field in RecordField::ALL {
        let trimmed = record.get(field).trim().to_string();
        record.set(field, trimmed);
    }
    record
}

fn from_recovered(recovered: RecoveredRecord) -> ClinicalRecord {
    let demographics = recovered.demographics.unwrap_or_default();
    let vitals = recovered.vitals.unwrap_or_default();

    ClinicalRecord {
        demographics: Demographics {
            name: demographics.name.trim().to_string(),
            age: demographics.age.trim().to_string(),
            gender: demographics.gender.trim().to_string(),
            address: demographics.address.trim().to_string(),
        },
        vitals: Vitals {
            blood_pressure: vitals.blood_pressure.trim().to_string(),
            heart_rate: vitals.heart_rate.trim().to_string(),
            temperature: vitals.temperature.trim().to_string(),
            spo2: vitals.spo2.trim().to_string(),
        },
        chief_complaint: flatten_text(recovered.chief_complaint.as_ref()),
        physical_exam: flatten_text(recovered.physical_exam.as_ref()),
        diagnosis: flatten_text(recovered.diagnosis.as_ref()),
        plan: flatten_text(recovered.plan.as_ref()),
    }
}

/// Display string for a clinical text field. Scalars are trimmed; lists are
/// joined with `\n`, each non-blank item bullet-prefixed unless it already
/// starts with a bullet.
pub fn flatten_text(text: Option<&ClinicalText>) -> String {
    match text {
        None => String::new(),
        Some(ClinicalText::Scalar(s)) => s.trim().to_string(),
        Some(ClinicalText::BulletedList(items)) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(bulleted)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn bulleted(item: &str) -> String {
    if item.starts_with(BULLET) {
        item.to_string()
    } else {
        format!("{BULLET} {item}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::types::{RecoveredDemographics, RecoveredVitals};

    fn list(items: &[&str]) -> Option<ClinicalText> {
        Some(ClinicalText::BulletedList(items.iter().map(|s| s.to_string()).collect()))
    }

    #[test]
    fn missing_vitals_default_to_empty() {
        let recovered = RecoveredRecord {
            demographics: Some(RecoveredDemographics {
                name: "Ann Lee".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let record = normalize(recovered);

        assert_eq!(record.demographics.name, "Ann Lee");
        assert_eq!(record.vitals, Vitals::default());
        assert_eq!(record.vitals.blood_pressure, "");
        assert_eq!(record.vitals.heart_rate, "");
        assert_eq!(record.vitals.temperature, "");
        assert_eq!(record.vitals.spo2, "");
    }

    #[test]
    fn empty_recovered_record_has_every_field() {
        let record = normalize(RecoveredRecord::default());
        assert_eq!(record, ClinicalRecord::default());
    }

    #[test]
    fn list_plan_adds_bullet_only_where_absent() {
        let recovered = RecoveredRecord {
            plan: list(&["• A", "B"]),
            ..Default::default()
        };
        assert_eq!(normalize(recovered).plan, "• A\n• B");
    }

    #[test]
    fn list_items_are_trimmed_and_blanks_dropped() {
        let text = list(&["  ECG ", "", "   ", "•Troponin"]);
        assert_eq!(flatten_text(text.as_ref()), "• ECG\n•Troponin");
    }

    #[test]
    fn scalar_fields_are_not_bulleted() {
        let recovered = RecoveredRecord {
            physical_exam: Some(ClinicalText::Scalar("  Lungs clear  ".into())),
            diagnosis: Some(ClinicalText::Scalar("Asthma".into())),
            ..Default::default()
        };
        let record = normalize(recovered);
        assert_eq!(record.physical_exam, "Lungs clear");
        assert_eq!(record.diagnosis, "Asthma");
    }

    #[test]
    fn empty_list_flattens_to_empty_string() {
        assert_eq!(flatten_text(list(&[]).as_ref()), "");
    }

    #[test]
    fn vitals_keep_their_own_slots() {
        let recovered = RecoveredRecord {
            vitals: Some(RecoveredVitals {
                blood_pressure: "118/76".into(),
                heart_rate: "72".into(),
                temperature: String::new(),
                spo2: "99".into(),
            }),
            ..Default::default()
        };
        let record = normalize(recovered);
        assert_eq!(record.vitals.blood_pressure, "118/76");
        assert_eq!(record.vitals.heart_rate, "72");
        assert_eq!(record.vitals.temperature, "");
        assert_eq!(record.vitals.spo2, "99");
    }

    #[test]
    fn canonical_input_is_trimmed_and_otherwise_unchanged() {
        let mut record = ClinicalRecord::default();
        record.set(RecordField::Name, " John Doe ");
        record.set(RecordField::Plan, "ECG");

        let normalized = normalize(record);
        assert_eq!(normalized.demographics.name, "John Doe");
        assert_eq!(normalized.plan, "ECG");
        assert_eq!(normalized.filled_count(), 2);
    }
}
