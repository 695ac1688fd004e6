use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub timeout: Duration,
}

impl OpenAiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Apply optional env overrides (base URL for compatible proxies,
    /// default model, request timeout).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            self.base_url = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.default_model = model;
        }
        if let Ok(timeout) = std::env::var("OPENAI_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.timeout = Duration::from_secs(parsed);
            }
        }
        self
    }
}

/// One summarization call: a model name (None = configured default) and a
/// single user-role prompt. The response is an opaque text blob.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: Option<String>,
    pub prompt: String,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    cfg: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiClientConfig) -> Result<Self, CompletionError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(CompletionError::http)?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }

    fn build_api_request(&self, req: &CompletionRequest) -> ApiChatRequest {
        ApiChatRequest {
            model: req
                .model
                .clone()
                .unwrap_or_else(|| self.cfg.default_model.clone()),
            messages: vec![ApiChatMessage {
                role: "user".to_string(),
                content: Some(req.prompt.clone()),
            }],
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        if request.prompt.trim().is_empty() {
            return Err(CompletionError::EmptyPrompt);
        }

        let api_request = self.build_api_request(&request);
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.cfg.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(CompletionError::http)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(CompletionError::http)?;

        if !status.is_success() {
            let api_err = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .ok()
                .map(|env| env.error.message);
            return Err(CompletionError::Api {
                status,
                message: api_err.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let parsed: ApiChatResponse =
            serde_json::from_slice(&bytes).map_err(CompletionError::Decode)?;
        let content = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(content)
    }
}

#[derive(Debug)]
pub enum CompletionError {
    EmptyPrompt,
    Http(reqwest::Error),
    Timeout,
    Api { status: StatusCode, message: String },
    Decode(serde_json::Error),
    MockQueueEmpty,
}

impl CompletionError {
    fn http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Http(err)
        }
    }
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionError::EmptyPrompt => write!(f, "completion requires a non-empty prompt"),
            CompletionError::Http(err) => write!(f, "http error: {err}"),
            CompletionError::Timeout => write!(f, "request timed out"),
            CompletionError::Api { status, message } => {
                write!(f, "api error {status}: {message}")
            }
            CompletionError::Decode(err) => write!(f, "decode error: {err}"),
            CompletionError::MockQueueEmpty => {
                write!(f, "mock completion queue is empty")
            }
        }
    }
}

impl std::error::Error for CompletionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompletionError::Http(err) => Some(err),
            CompletionError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatRequest {
    model: String,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatResponse {
    choices: Vec<ApiChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Scripted stand-in for tests: queued responses, recorded prompts.
#[derive(Debug, Default)]
pub struct MockCompletions {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: Result<String, CompletionError>) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletions {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::MockQueueEmpty))
    }
}
