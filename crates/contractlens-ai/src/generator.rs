//! Text generation over an OpenAI-compatible chat-completions API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Upper bound on one generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const PING_PROMPT: &str =
    "Hello, this is a connection test. Please respond with 'Connection successful'.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limit or quota exceeded: {0}")]
    Quota(String),
    #[error("provider unavailable: {0}")]
    Outage(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response contained no choices")]
    EmptyResponse,
    #[error("malformed provider response: {0}")]
    Json(#[from] serde_json::Error),
}

/// One prompt/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider to constrain output to a single JSON object.
    pub json_object: bool,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Model identifier, for logs and health output.
    fn model(&self) -> &str;

    /// Round-trip a tiny prompt to prove credentials and connectivity.
    async fn ping(&self) -> Result<String, GenerationError> {
        let request = GenerationRequest {
            system_prompt: None,
            user_prompt: PING_PROMPT.to_string(),
            max_tokens: 10,
            temperature: 0.0,
            json_object: false,
        };
        self.generate(&request).await
    }
}

/// Chat-completions client for OpenAI and compatible endpoints.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(api_key: String) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = self.completions_url();
        let body = chat_body(&self.model, request);
        let timeout = self.timeout;

        debug!(url = %url, model = %self.model, max_tokens = request.max_tokens, "requesting completion");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }
        let text = resp.text().await.map_err(|e| transport_error(e, timeout))?;
        let content = message_content(&text)?;
        info!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn chat_body(model: &str, request: &GenerationRequest) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system_prompt {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": request.user_prompt}));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if request.json_object {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Content of the first choice.
///
/// No choices at all is an error. A null content comes back as an empty
/// string so the caller treats it like any other unparseable reply.
fn message_content(body: &str) -> Result<String, GenerationError> {
    let resp: ChatResponse = serde_json::from_str(body)?;
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyResponse)?;
    Ok(choice.message.content.unwrap_or_default())
}

fn map_status(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Auth(status.to_string()),
        StatusCode::TOO_MANY_REQUESTS => GenerationError::Quota(status.to_string()),
        s if s.is_server_error() => GenerationError::Outage(status.to_string()),
        s => GenerationError::Status {
            status: s.as_u16(),
            body,
        },
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(timeout)
    } else {
        GenerationError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json_object: bool) -> GenerationRequest {
        GenerationRequest {
            system_prompt: Some("You are terse.".into()),
            user_prompt: "Summarise.".into(),
            max_tokens: 4000,
            temperature: 0.3,
            json_object,
        }
    }

    #[test]
    fn chat_body_carries_parameters() {
        let body = chat_body("gpt-4-turbo-preview", &request(true));
        assert_eq!(body["model"], "gpt-4-turbo-preview");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Summarise.");
        assert_eq!(body["response_format"]["type"], "json_object");
        let t = body["temperature"].as_f64().unwrap();
        assert!((t - 0.3).abs() < 1e-6);
    }

    #[test]
    fn chat_body_plain_text_has_no_format() {
        let mut req = request(false);
        req.system_prompt = None;
        let body = chat_body("m", &req);
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn message_content_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#;
        assert_eq!(message_content(body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn message_content_without_choices_is_error() {
        assert!(matches!(
            message_content(r#"{"choices":[]}"#),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(message_content("not json"), Err(GenerationError::Json(_))));
    }

    #[test]
    fn message_content_blank_passes_through() {
        assert_eq!(
            message_content(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(),
            ""
        );
        assert_eq!(
            message_content(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap(),
            "  "
        );
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(map_status(StatusCode::UNAUTHORIZED, String::new()), GenerationError::Auth(_)));
        assert!(matches!(map_status(StatusCode::FORBIDDEN, String::new()), GenerationError::Auth(_)));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            GenerationError::Quota(_)
        ));
        assert!(matches!(map_status(StatusCode::BAD_GATEWAY, String::new()), GenerationError::Outage(_)));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "bad".into()),
            GenerationError::Status { status: 400, .. }
        ));
    }

    #[test]
    fn builder_overrides() {
        let generator = OpenAiGenerator::new("sk-test".into())
            .unwrap()
            .with_base_url("http://localhost:8080/v1/")
            .with_model("gpt-4o-mini")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(generator.completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(generator.model(), "gpt-4o-mini");
    }
}
