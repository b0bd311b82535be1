use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: '{value}'")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Which extractor produced a record.
    Strategy {
        Pattern => "pattern",
        Llm => "llm",
    }
);

str_enum!(
    /// Shape requested from the LLM for `physical_exam` and `plan`.
    SchemaHint {
        Scalar => "scalar",
        Bulleted => "bulleted",
    }
);

impl Default for SchemaHint {
    fn default() -> Self {
        Self::Scalar
    }
}

str_enum!(
    /// Every leaf field of a clinical record.
    RecordField {
        Name => "name",
        Age => "age",
        Gender => "gender",
        Address => "address",
        BloodPressure => "blood_pressure",
        HeartRate => "heart_rate",
        Temperature => "temperature",
        Spo2 => "spo2",
        ChiefComplaint => "chief_complaint",
        PhysicalExam => "physical_exam",
        Diagnosis => "diagnosis",
        Plan => "plan",
    }
);

impl RecordField {
    /// All fields, in form display order.
    pub const ALL: [RecordField; 12] = [
        RecordField::Name,
        RecordField::Age,
        RecordField::Gender,
        RecordField::Address,
        RecordField::ChiefComplaint,
        RecordField::BloodPressure,
        RecordField::HeartRate,
        RecordField::Temperature,
        RecordField::Spo2,
        RecordField::PhysicalExam,
        RecordField::Diagnosis,
        RecordField::Plan,
    ];

    /// Human-readable label shown next to the form input.
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::Address => "Address",
            Self::BloodPressure => "Blood Pressure",
            Self::HeartRate => "Heart Rate",
            Self::Temperature => "Temperature",
            Self::Spo2 => "SpO2",
            Self::ChiefComplaint => "Chief Complaint",
            Self::PhysicalExam => "Physical Exam",
            Self::Diagnosis => "Impression",
            Self::Plan => "Plan",
        }
    }

    /// Free-text fields that may arrive from the LLM as bullet lists.
    pub fn is_list_capable(&self) -> bool {
        matches!(self, Self::PhysicalExam | Self::Plan)
    }
}
