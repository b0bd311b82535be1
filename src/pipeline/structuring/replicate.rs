use std::collections::VecDeque;
use std::io::BufReader;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::prompt::EXTRACTION_SYSTEM_PROMPT;
use super::stream::{PredictionFragments, SseReader};
use super::types::{LlmClient, SamplingParams, TextStream};
use super::GenerationFailure;
use crate::config::{ApiToken, ConfigurationError, ServiceConfig};

/// Upper bound on the TCP connect phase, independent of the overall timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a Replicate-style streaming prediction API.
pub struct ReplicateClient {
    base_url: String,
    model: String,
    token: ApiToken,
    system_prompt: String,
    client: Client,
    timeout: Duration,
}

impl ReplicateClient {
    /// Build a client from settings. Fails before any network call when the
    /// token is missing or has the wrong shape.
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let token = config.api_token()?;

        let client = Client::builder()
            .connect_timeout(config.timeout.min(CONNECT_TIMEOUT))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token,
            system_prompt: EXTRACTION_SYSTEM_PROMPT.trim().to_string(),
            client,
            timeout: config.timeout,
        })
    }

    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = system_prompt.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `owner/name:version` targets a pinned version; `owner/name` the
    /// model's latest deployment.
    fn prediction_url(&self) -> String {
        if self.model.contains(':') {
            format!("{}/v1/predictions", self.base_url)
        } else {
            format!("{}/v1/models/{}/predictions", self.base_url, self.model)
        }
    }

    fn create_prediction(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Prediction, GenerationFailure> {
        let body = PredictionRequest {
            version: self.model.split_once(':').map(|(_, version)| version),
            input: PredictionInput {
                prompt,
                system_prompt: &self.system_prompt,
                temperature: params.temperature,
                top_p: params.top_p,
                max_length: params.max_length,
                repetition_penalty: 1.0,
            },
            stream: true,
        };

        let response = self
            .client
            .post(self.prediction_url())
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .map_err(|e| map_send_error(e, self.timeout))?;
        let response = check_status(response)?;

        let prediction: Prediction = response
            .json()
            .map_err(|e| GenerationFailure::InvalidResponse(e.to_string()))?;

        if prediction.status == "failed" {
            let detail = prediction
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "prediction failed".to_string());
            return Err(GenerationFailure::Service {
                status: StatusCode::OK.as_u16(),
                body: detail,
            });
        }
        Ok(prediction)
    }

    fn open_stream(&self, url: &str) -> Result<Response, GenerationFailure> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .map_err(|e| map_send_error(e, self.timeout))?;
        check_status(response)
    }

    /// Best-effort cancellation; the caller already has its failure.
    fn cancel(&self, url: &str) {
        let result = self
            .client
            .post(url)
            .bearer_auth(self.token.expose())
            .timeout(CONNECT_TIMEOUT)
            .send();
        match result {
            Ok(r) if r.status().is_success() => tracing::info!("Timed-out prediction canceled"),
            Ok(r) => tracing::warn!(status = r.status().as_u16(), "Prediction cancel rejected"),
            Err(e) => tracing::warn!(error = %e, "Prediction cancel failed"),
        }
    }
}

/// Request body for `POST /v1/.../predictions`
#[derive(Serialize)]
struct PredictionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: PredictionInput<'a>,
    stream: bool,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
    system_prompt: &'a str,
    temperature: f32,
    top_p: f32,
    max_length: u32,
    repetition_penalty: f32,
}

/// Response body for a created prediction
#[derive(Deserialize)]
struct Prediction {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    urls: PredictionUrls,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct PredictionUrls {
    stream: Option<String>,
    cancel: Option<String>,
}

impl LlmClient for ReplicateClient {
    fn stream<'a>(
        &'a self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<TextStream<'a>, GenerationFailure> {
        let started = Instant::now();
        let prediction = self.create_prediction(prompt, params)?;
        tracing::info!(
            model = %self.model,
            prediction_id = %prediction.id,
            prompt_chars = prompt.len(),
            "Prediction created"
        );

        let stream_url = prediction.urls.stream.ok_or_else(|| {
            GenerationFailure::InvalidResponse("prediction has no stream URL".into())
        })?;
        let cancel_url = prediction.urls.cancel;

        let response = self.open_stream(&stream_url)?;
        let mut fragments = PredictionFragments::new(
            SseReader::new(BufReader::new(response)),
            started,
            self.timeout,
        );

        let stream = std::iter::from_fn(move || {
            let next = fragments.next();
            if let (Some(Err(GenerationFailure::TimedOut(_))), Some(url)) =
                (&next, cancel_url.as_deref())
            {
                self.cancel(url);
            }
            next
        });
        Ok(Box::new(stream))
    }
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> GenerationFailure {
    if e.is_timeout() {
        GenerationFailure::TimedOut(timeout)
    } else {
        GenerationFailure::Network(e.to_string())
    }
}

fn check_status(response: Response) -> Result<Response, GenerationFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(status_failure(status, body))
}

fn status_failure(status: StatusCode, body: String) -> GenerationFailure {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationFailure::Auth {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => GenerationFailure::RateLimited,
        _ => GenerationFailure::Service {
            status: status.as_u16(),
            body,
        },
    }
}

/// One scripted reply of the mock client.
#[derive(Debug, Clone)]
pub enum MockReply {
    Chunks(Vec<String>),
    Failure(GenerationFailure),
}

/// Mock LLM client for testing. Replays scripted replies in order.
///
/// The last reply repeats once the script is exhausted.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<(String, SamplingParams)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![MockReply::Chunks(vec![response.to_string()])])
    }

    /// Reply delivered as several fragments.
    pub fn with_chunks(chunks: &[&str]) -> Self {
        Self::scripted(vec![MockReply::Chunks(
            chunks.iter().map(|c| c.to_string()).collect(),
        )])
    }

    pub fn failing(failure: GenerationFailure) -> Self {
        Self::scripted(vec![MockReply::Failure(failure)])
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of completion requests made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Prompt and parameters of the most recent request.
    pub fn last_call(&self) -> Option<(String, SamplingParams)> {
        self.calls.lock().ok()?.last().cloned()
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = match self.replies.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if replies.len() > 1 {
            replies.pop_front().unwrap_or(MockReply::Chunks(vec![]))
        } else {
            replies.front().cloned().unwrap_or(MockReply::Chunks(vec![]))
        }
    }
}

impl LlmClient for MockLlmClient {
    fn stream<'a>(
        &'a self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<TextStream<'a>, GenerationFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.to_string(), *params));
        }
        match self.next_reply() {
            MockReply::Chunks(chunks) => Ok(Box::new(chunks.into_iter().map(Ok))),
            MockReply::Failure(failure) => Err(failure),
        }
    }
}
