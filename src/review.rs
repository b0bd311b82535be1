//! Review form: the editable view of an extracted record.
//!
//! Builds the form the clinician verifies (patient information, complaint,
//! vitals, exam, assessment, plan), reads edits back into a record, and
//! acknowledges saves. Nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ClinicalRecord, RecordField};

pub const SAVE_MESSAGE: &str = "EMR saved successfully!";

pub const GENDER_OPTIONS: [&str; 2] = ["Male", "Female"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a field is edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    MultiLine,
    Choice { options: Vec<String> },
}

/// A single editable field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    pub field: RecordField,
    pub label: String,
    pub value: String,
    pub input: InputKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormSection {
    pub title: String,
    pub fields: Vec<FormField>,
}

/// The form shown next to the note for verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditableForm {
    pub sections: Vec<FormSection>,
}

/// A clinician's edit to one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCorrection {
    pub field: RecordField,
    pub corrected_value: String,
}

/// Acknowledgement of a save. Carries no storage location: saving only
/// confirms the clinician accepted the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAck {
    pub saved_at: DateTime<Utc>,
    pub message: String,
}

/// Renders records into forms and accepts saves.
pub trait FormRenderer {
    fn render(&self, record: &ClinicalRecord) -> EditableForm;
    fn on_save(&self, record: ClinicalRecord) -> SaveAck;
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

impl EditableForm {
    pub fn field(&self, field: RecordField) -> Option<&FormField> {
        self.fields().find(|f| f.field == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Set one field's value. Choice fields accept one of their options
    /// (case-insensitive) or a blank value, which clears the choice.
    /// Returns whether the value was taken.
    pub fn set_value(&mut self, field: RecordField, value: &str) -> bool {
        let Some(target) = self
            .sections
            .iter_mut()
            .flat_map(|s| s.fields.iter_mut())
            .find(|f| f.field == field)
        else {
            return false;
        };

        match &target.input {
            InputKind::Choice { options } => {
                let value = value.trim();
                if value.is_empty() {
                    target.value.clear();
                    return true;
                }
                match options.iter().find(|o| o.eq_ignore_ascii_case(value)) {
                    Some(option) => {
                        target.value = option.clone();
                        true
                    }
                    None => false,
                }
            }
            InputKind::Text | InputKind::MultiLine => {
                target.value = value.to_string();
                true
            }
        }
    }

    /// Apply corrections in order. Returns how many were taken.
    pub fn apply_corrections(&mut self, corrections: &[FieldCorrection]) -> usize {
        corrections
            .iter()
            .filter(|c| self.set_value(c.field, &c.corrected_value))
            .count()
    }

    /// Read the (edited) values back into a record.
    pub fn into_record(self) -> ClinicalRecord {
        let mut record = ClinicalRecord::default();
        for section in self.sections {
            for f in section.fields {
                record.set(f.field, f.value.trim());
            }
        }
        record
    }
}

// ---------------------------------------------------------------------------
// Default renderer
// ---------------------------------------------------------------------------

/// Section layout of the review form.
const SECTIONS: &[(&str, &[RecordField])] = &[
    (
        "Patient Information",
        &[
            RecordField::Name,
            RecordField::Age,
            RecordField::Gender,
            RecordField::Address,
        ],
    ),
    ("Chief Complaint", &[RecordField::ChiefComplaint]),
    (
        "Vital Signs",
        &[
            RecordField::BloodPressure,
            RecordField::HeartRate,
            RecordField::Temperature,
            RecordField::Spo2,
        ],
    ),
    ("Physical Exam", &[RecordField::PhysicalExam]),
    ("Assessment", &[RecordField::Diagnosis]),
    ("Plan", &[RecordField::Plan]),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormRenderer;

impl FormRenderer for DefaultFormRenderer {
    fn render(&self, record: &ClinicalRecord) -> EditableForm {
        let sections = SECTIONS
            .iter()
            .map(|(title, fields)| FormSection {
                title: title.to_string(),
                fields: fields.iter().map(|&f| render_field(record, f)).collect(),
            })
            .collect();
        EditableForm { sections }
    }

    fn on_save(&self, record: ClinicalRecord) -> SaveAck {
        tracing::info!(filled = record.filled_count(), "EMR saved");
        SaveAck {
            saved_at: Utc::now(),
            message: SAVE_MESSAGE.to_string(),
        }
    }
}

fn render_field(record: &ClinicalRecord, field: RecordField) -> FormField {
    let (value, input) = match field {
        RecordField::Gender => (
            preselected_gender(record.get(field)).to_string(),
            InputKind::Choice {
                options: GENDER_OPTIONS.iter().map(|o| o.to_string()).collect(),
            },
        ),
        RecordField::ChiefComplaint
        | RecordField::PhysicalExam
        | RecordField::Diagnosis
        | RecordField::Plan => (record.get(field).to_string(), InputKind::MultiLine),
        _ => (record.get(field).to_string(), InputKind::Text),
    };

    FormField {
        field,
        label: field.display_label().to_string(),
        value,
        input,
    }
}

/// `Male` when the record says male, `Female` for any other stated gender,
/// nothing when the record has none.
fn preselected_gender(gender: &str) -> &'static str {
    let gender = gender.trim();
    if gender.is_empty() {
        ""
    } else if gender.eq_ignore_ascii_case("male") {
        GENDER_OPTIONS[0]
    } else {
        GENDER_OPTIONS[1]
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The record currently shown for review.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    record: ClinicalRecord,
}

impl FormState {
    pub fn new(record: ClinicalRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &ClinicalRecord {
        &self.record
    }

    /// Replace the record on success; on failure keep the previous one and
    /// hand the error back.
    pub fn apply<E>(&mut self, result: Result<ClinicalRecord, E>) -> Result<&ClinicalRecord, E> {
        self.record = result?;
        Ok(&self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ClinicalRecord {
        let mut record = ClinicalRecord::default();
        record.set(RecordField::Name, "John Doe");
        record.set(RecordField::Age, "45");
        record.set(RecordField::Gender, "male");
        record.set(RecordField::BloodPressure, "120/80");
        record.set(RecordField::Diagnosis, "Possible ACS");
        record.set(RecordField::Plan, "• ECG\n• Troponin");
        record
    }

    #[test]
    fn renders_sections_in_form_order() {
        let form = DefaultFormRenderer.render(&sample_record());
        let titles: Vec<&str> = form.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "Patient Information",
                "Chief Complaint",
                "Vital Signs",
                "Physical Exam",
                "Assessment",
                "Plan"
            ]
        );
    }

    #[test]
    fn every_field_appears_once() {
        let form = DefaultFormRenderer.render(&ClinicalRecord::default());
        let fields: Vec<RecordField> = form.fields().map(|f| f.field).collect();
        assert_eq!(fields, RecordField::ALL.to_vec());
    }

    #[test]
    fn diagnosis_is_labelled_impression() {
        let form = DefaultFormRenderer.render(&sample_record());
        let diagnosis = form.field(RecordField::Diagnosis).unwrap();
        assert_eq!(diagnosis.label, "Impression");
        assert_eq!(diagnosis.value, "Possible ACS");
        assert_eq!(diagnosis.input, InputKind::MultiLine);
    }

    #[test]
    fn gender_preselects_male_case_insensitively() {
        for raw in ["male", "Male", " MALE "] {
            assert_eq!(preselected_gender(raw), "Male");
        }
        for raw in ["female", "unknown"] {
            assert_eq!(preselected_gender(raw), "Female");
        }
        assert_eq!(preselected_gender(""), "");
        assert_eq!(preselected_gender("  "), "");

        let form = DefaultFormRenderer.render(&sample_record());
        let gender = form.field(RecordField::Gender).unwrap();
        assert_eq!(gender.value, "Male");
        assert!(matches!(&gender.input, InputKind::Choice { options } if options.len() == 2));
    }

    #[test]
    fn unedited_form_round_trips_except_gender_casing() {
        let record = sample_record();
        let back = DefaultFormRenderer.render(&record).into_record();

        let mut expected = record;
        expected.set(RecordField::Gender, "Male");
        assert_eq!(back, expected);
    }

    #[test]
    fn missing_gender_leaves_choice_blank() {
        let mut record = sample_record();
        record.set(RecordField::Gender, "");
        let form = DefaultFormRenderer.render(&record);
        assert_eq!(form.field(RecordField::Gender).unwrap().value, "");
        assert_eq!(form.into_record().demographics.gender, "");
    }

    #[test]
    fn empty_record_renders_to_empty_record() {
        let form = DefaultFormRenderer.render(&ClinicalRecord::default());
        assert!(form.into_record().is_empty());
    }

    #[test]
    fn blank_value_clears_choice() {
        let mut form = DefaultFormRenderer.render(&sample_record());
        assert!(form.set_value(RecordField::Gender, " "));
        assert_eq!(form.field(RecordField::Gender).unwrap().value, "");
    }

    #[test]
    fn corrections_flow_into_record() {
        let mut form = DefaultFormRenderer.render(&sample_record());
        let applied = form.apply_corrections(&[
            FieldCorrection {
                field: RecordField::HeartRate,
                corrected_value: "72".into(),
            },
            FieldCorrection {
                field: RecordField::Gender,
                corrected_value: "female".into(),
            },
            FieldCorrection {
                field: RecordField::Gender,
                corrected_value: "other".into(),
            },
        ]);
        assert_eq!(applied, 2);

        let record = form.into_record();
        assert_eq!(record.vitals.heart_rate, "72");
        assert_eq!(record.demographics.gender, "Female");
    }

    #[test]
    fn save_acknowledges_without_persisting() {
        let ack = DefaultFormRenderer.on_save(sample_record());
        assert_eq!(ack.message, "EMR saved successfully!");
        assert!(ack.saved_at <= Utc::now());
    }

    #[test]
    fn state_replaces_record_only_on_success() {
        let mut state = FormState::new(sample_record());

        let failed: Result<ClinicalRecord, String> = Err("service down".into());
        assert_eq!(state.apply(failed).unwrap_err(), "service down");
        assert_eq!(state.record().demographics.name, "John Doe");

        let mut next = ClinicalRecord::default();
        next.set(RecordField::Name, "Jane Roe");
        let applied = state.apply::<String>(Ok(next)).unwrap();
        assert_eq!(applied.demographics.name, "Jane Roe");
    }
}
