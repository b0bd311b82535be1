use serde::{Deserialize, Serialize};

use super::enums::RecordField;

/// Patient identity fields. Empty string means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub address: String,
}

/// Vital signs, kept verbatim (e.g. "120/80", "98.6").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub blood_pressure: String,
    pub heart_rate: String,
    pub temperature: String,
    pub spo2: String,
}

/// Canonical structured form of one clinical note.
///
/// Every field is always present; unknown values are `""`. Records are built
/// fresh per extraction and replace, never merge into, a previous record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub demographics: Demographics,
    pub vitals: Vitals,
    pub chief_complaint: String,
    pub physical_exam: String,
    pub diagnosis: String,
    pub plan: String,
}

impl ClinicalRecord {
    /// Read a leaf field by identity.
    pub fn get(&self, field: RecordField) -> &str {
        match field {
            RecordField::Name => &self.demographics.name,
            RecordField::Age => &self.demographics.age,
            RecordField::Gender => &self.demographics.gender,
            RecordField::Address => &self.demographics.address,
            RecordField::BloodPressure => &self.vitals.blood_pressure,
            RecordField::HeartRate => &self.vitals.heart_rate,
            RecordField::Temperature => &self.vitals.temperature,
            RecordField::Spo2 => &self.vitals.spo2,
            RecordField::ChiefComplaint => &self.chief_complaint,
            RecordField::PhysicalExam => &self.physical_exam,
            RecordField::Diagnosis => &self.diagnosis,
            RecordField::Plan => &self.plan,
        }
    }

    /// Write a leaf field by identity.
    pub fn set(&mut self, field: RecordField, value: impl Into<String>) {
        let slot = match field {
            RecordField::Name => &mut self.demographics.name,
            RecordField::Age => &mut self.demographics.age,
            RecordField::Gender => &mut self.demographics.gender,
            RecordField::Address => &mut self.demographics.address,
            RecordField::BloodPressure => &mut self.vitals.blood_pressure,
            RecordField::HeartRate => &mut self.vitals.heart_rate,
            RecordField::Temperature => &mut self.vitals.temperature,
            RecordField::Spo2 => &mut self.vitals.spo2,
            RecordField::ChiefComplaint => &mut self.chief_complaint,
            RecordField::PhysicalExam => &mut self.physical_exam,
            RecordField::Diagnosis => &mut self.diagnosis,
            RecordField::Plan => &mut self.plan,
        };
        *slot = value.into();
    }

    /// Number of fields holding a non-blank value.
    pub fn filled_count(&self) -> usize {
        RecordField::ALL
            .iter()
            .filter(|f| !self.get(**f).trim().is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }
}
