use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::stream::assemble_response;
use super::GenerationFailure;
use crate::config::ConfigurationError;

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Lower = more deterministic. Extraction default: 0.1.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_length: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_length: 1024,
            top_p: 0.9,
        }
    }
}

impl SamplingParams {
    /// Reject values the completion service would refuse.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.temperature > 0.0 && self.temperature <= 5.0) {
            return Err(ConfigurationError::InvalidSamplingParams(format!(
                "temperature must be in (0, 5], got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigurationError::InvalidSamplingParams(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.max_length == 0 {
            return Err(ConfigurationError::InvalidSamplingParams(
                "max_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A free-text clinical field as the model returned it.
///
/// Numbers and booleans read as text, in a list or on their own; null list
/// items are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClinicalText {
    Scalar(String),
    BulletedList(Vec<String>),
}

impl<'de> Deserialize<'de> for ClinicalText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(|item| scalar_text(item).map_err(de::Error::custom))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::BulletedList),
            other => scalar_text(other)
                .map(Self::Scalar)
                .map_err(de::Error::custom),
        }
    }
}

/// Demographics object as recovered from model JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredDemographics {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: String,
}

/// Vitals object as recovered from model JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredVitals {
    #[serde(default, alias = "bp", deserialize_with = "lenient_text")]
    pub blood_pressure: String,
    #[serde(default, alias = "hr", deserialize_with = "lenient_text")]
    pub heart_rate: String,
    #[serde(default, alias = "temp", deserialize_with = "lenient_text")]
    pub temperature: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub spo2: String,
}

/// Typed shape of the JSON object recovered from a model reply.
///
/// Every member is optional; the normalizer fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredRecord {
    #[serde(default, alias = "patient_info")]
    pub demographics: Option<RecoveredDemographics>,
    #[serde(default, alias = "vital_signs")]
    pub vitals: Option<RecoveredVitals>,
    #[serde(default)]
    pub chief_complaint: Option<ClinicalText>,
    #[serde(default)]
    pub physical_exam: Option<ClinicalText>,
    #[serde(default, alias = "impression")]
    pub diagnosis: Option<ClinicalText>,
    #[serde(default)]
    pub plan: Option<ClinicalText>,
}

/// Accept JSON strings, numbers and booleans for a text leaf; null is `""`.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None => Ok(String::new()),
        Some(value) => scalar_text(value).map_err(de::Error::custom),
    }
}

fn scalar_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected text, found {}", json_kind(&other))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
        _ => "a scalar",
    }
}

/// Lazy, finite, non-restartable sequence of response fragments.
pub type TextStream<'a> = Box<dyn Iterator<Item = Result<String, GenerationFailure>> + 'a>;

/// Completion service abstraction (allows mocking).
pub trait LlmClient {
    /// Start a completion and hand back its fragments in arrival order.
    fn stream<'a>(
        &'a self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<TextStream<'a>, GenerationFailure>;

    /// Full response text. `Ok("")` means the service answered with nothing;
    /// a failed call is always `Err`.
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, GenerationFailure> {
        assemble_response(self.stream(prompt, params)?)
    }
}

impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    fn stream<'a>(
        &'a self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<TextStream<'a>, GenerationFailure> {
        (**self).stream(prompt, params)
    }
}
