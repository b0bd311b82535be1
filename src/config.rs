use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::models::SchemaHint;
use crate::pipeline::structuring::{ResamplePolicy, SamplingParams};

/// Application-level constants
pub const APP_NAME: &str = "Notechart";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Completion service defaults.
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";
pub const DEFAULT_MODEL: &str = "meta/llama-2-70b-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Access tokens look like `r8_` followed by 37 alphanumerics.
pub const TOKEN_PREFIX: &str = "r8_";
pub const TOKEN_LENGTH: usize = 40;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "notechart=info,notechart_lib=info,warn"
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No access token configured; set REPLICATE_API_TOKEN to use LLM extraction")]
    MissingCredential,

    #[error(
        "Access token has the wrong shape (expected '{}' followed by {} characters)",
        TOKEN_PREFIX,
        TOKEN_LENGTH - TOKEN_PREFIX.len()
    )]
    InvalidCredential,

    #[error("Invalid sampling parameters: {0}")]
    InvalidSamplingParams(String),

    #[error("Invalid service URL: '{0}'")]
    InvalidBaseUrl(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Service access token that passed the shape check.
///
/// Shape only: prefix and length. The service is the authority on whether
/// the token is actually valid.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let raw = raw.trim();
        let body = raw
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(ConfigurationError::InvalidCredential)?;
        if raw.len() != TOKEN_LENGTH || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigurationError::InvalidCredential);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken({TOKEN_PREFIX}…)")
    }
}

/// Settings for the LLM extraction path.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    /// `owner/name` or `owner/name:version`.
    pub model: String,
    /// Raw token as configured; shape-checked when a client is built.
    pub token: Option<String>,
    pub timeout: Duration,
    pub sampling: SamplingParams,
    pub schema_hint: SchemaHint,
    pub resample: ResamplePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sampling: SamplingParams::default(),
            schema_hint: SchemaHint::default(),
            resample: ResamplePolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("NOTECHART_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = get("NOTECHART_MODEL") {
            config.model = model;
        }
        config.token = get("REPLICATE_API_TOKEN");
        if let Some(secs) = get("NOTECHART_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_value("NOTECHART_TIMEOUT_SECS", &secs)?);
        }
        if let Some(t) = get("NOTECHART_TEMPERATURE") {
            config.sampling.temperature = parse_value("NOTECHART_TEMPERATURE", &t)?;
        }
        if let Some(p) = get("NOTECHART_TOP_P") {
            config.sampling.top_p = parse_value("NOTECHART_TOP_P", &p)?;
        }
        if let Some(n) = get("NOTECHART_MAX_LENGTH") {
            config.sampling.max_length = parse_value("NOTECHART_MAX_LENGTH", &n)?;
        }
        if let Some(hint) = get("NOTECHART_SCHEMA") {
            config.schema_hint = parse_value("NOTECHART_SCHEMA", &hint)?;
        }
        if let Some(n) = get("NOTECHART_MAX_RESAMPLES") {
            config.resample = ResamplePolicy::new(parse_value("NOTECHART_MAX_RESAMPLES", &n)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without a network call.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let scheme_ok = self.base_url.starts_with("https://") || self.base_url.starts_with("http://");
        if !scheme_ok {
            return Err(ConfigurationError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.model.trim().is_empty() || self.model.contains(char::is_whitespace) {
            return Err(ConfigurationError::InvalidValue {
                key: "NOTECHART_MODEL".into(),
                value: self.model.clone(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                key: "NOTECHART_TIMEOUT_SECS".into(),
                value: "0".into(),
            });
        }
        self.sampling.validate()
    }

    /// Shape-checked token, or why there is none.
    pub fn api_token(&self) -> Result<ApiToken, ConfigurationError> {
        let raw = self
            .token
            .as_deref()
            .ok_or(ConfigurationError::MissingCredential)?;
        ApiToken::parse(raw)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
