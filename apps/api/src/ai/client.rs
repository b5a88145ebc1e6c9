//! Feedback client: the only code that talks to AI providers.
//!
//! One request, one response. Nothing here retries; callers that want retries
//! wrap the call in `retry::retry_with_backoff`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ai::config::{AiConfig, AiProvider};
use crate::ai::prompts::{build_feedback_prompt, FEEDBACK_SYSTEM};
use crate::errors::ErrorCategory;
use crate::models::resume::{Feedback, JobContext};
use crate::retry::Retryable;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("AI provider returned empty content")]
    EmptyContent,
}

impl AiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AiError::Http(e) if e.is_connect() || e.is_timeout() => ErrorCategory::Network,
            _ => ErrorCategory::AiAnalysis,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AiError::NotConfigured => "AI_NOT_CONFIGURED",
            AiError::Http(_) => "AI_UNREACHABLE",
            AiError::Api { status: 401, .. } | AiError::Api { status: 403, .. } => {
                "AI_AUTH_FAILED"
            }
            AiError::Api { status: 429, .. } => "AI_RATE_LIMITED",
            AiError::Api { .. } => "AI_API_ERROR",
            AiError::Parse(_) | AiError::EmptyContent => "AI_BAD_RESPONSE",
        }
    }
}

impl Retryable for AiError {
    fn is_retryable(&self) -> bool {
        match self {
            AiError::Http(_) => true,
            AiError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Produces structured feedback for a résumé's text.
/// Carried in `AppState` as `Arc<dyn FeedbackAnalyzer>`.
#[async_trait]
pub trait FeedbackAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        config: &AiConfig,
        resume_text: &str,
        job: &JobContext,
    ) -> Result<Feedback, AiError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// `FeedbackAnalyzer` over HTTP. Anthropic uses the Messages API; OpenAI and
/// Gemini use the OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct HttpFeedbackAnalyzer {
    client: Client,
}

impl HttpFeedbackAnalyzer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn call_chat(
        &self,
        base_url: &str,
        model: &str,
        config: &AiConfig,
        prompt: &str,
    ) -> Result<String, AiError> {
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: FEEDBACK_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
            .bearer_auth(&config.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: ChatResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AiError::EmptyContent)
    }

    async fn call_anthropic(
        &self,
        base_url: &str,
        model: &str,
        config: &AiConfig,
        prompt: &str,
    ) -> Result<String, AiError> {
        let body = AnthropicRequest {
            model,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: FEEDBACK_SYSTEM,
            temperature: config.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", base_url.trim_end_matches('/')))
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: AnthropicResponse = response.json().await?;

        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .ok_or(AiError::EmptyContent)
    }
}

#[async_trait]
impl FeedbackAnalyzer for HttpFeedbackAnalyzer {
    async fn analyze(
        &self,
        config: &AiConfig,
        resume_text: &str,
        job: &JobContext,
    ) -> Result<Feedback, AiError> {
        let (Some(provider), true) = (config.provider, config.is_configured()) else {
            return Err(AiError::NotConfigured);
        };
        let base_url = config.base_url().unwrap_or(provider.default_base_url());
        let model = config.model().unwrap_or(provider.default_model());
        let prompt = build_feedback_prompt(resume_text, job);

        debug!(
            "Requesting feedback from {} ({model}), prompt {} chars",
            provider.as_str(),
            prompt.len()
        );

        let text = match provider {
            AiProvider::Anthropic => self.call_anthropic(base_url, model, config, &prompt).await?,
            AiProvider::OpenAi | AiProvider::Gemini => {
                self.call_chat(base_url, model, config, &prompt).await?
            }
        };

        parse_feedback(&text)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(AiError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Parses provider text into `Feedback`, tolerating markdown fences.
pub fn parse_feedback(text: &str) -> Result<Feedback, AiError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(AiError::EmptyContent);
    }
    Ok(serde_json::from_str(text)?)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::resume::fixtures::feedback;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Pops scripted results in order; once empty, scores every résumé at
    /// `default_score`.
    pub struct ScriptedAnalyzer {
        pub script: Mutex<VecDeque<Result<Feedback, AiError>>>,
        pub default_score: f64,
        pub calls: AtomicUsize,
    }

    impl ScriptedAnalyzer {
        pub fn scoring(default_score: f64) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                default_score,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn then(self, result: Result<Feedback, AiError>) -> Self {
            self.script.lock().unwrap().push_back(result);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedbackAnalyzer for ScriptedAnalyzer {
        async fn analyze(
            &self,
            _config: &AiConfig,
            _resume_text: &str,
            _job: &JobContext,
        ) -> Result<Feedback, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(feedback(self.default_score)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEEDBACK_JSON: &str = r#"{"overallScore": 82,
        "ATS": {"score": 80, "tips": []},
        "toneAndStyle": {"score": 85, "tips": []},
        "content": {"score": 78, "tips": []},
        "structure": {"score": 88, "tips": []},
        "skills": {"score": 79, "tips": []}}"#;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_feedback_from_fenced_output() {
        let fenced = format!("```json\n{FEEDBACK_JSON}\n```");
        let feedback = parse_feedback(&fenced).unwrap();
        assert_eq!(feedback.overall_score, 82.0);
        assert_eq!(feedback.structure.score, 88.0);
    }

    #[test]
    fn test_parse_feedback_rejects_garbage() {
        assert!(matches!(parse_feedback("   "), Err(AiError::EmptyContent)));
        assert!(matches!(
            parse_feedback("I cannot help with that"),
            Err(AiError::Parse(_))
        ));
    }

    #[test]
    fn test_retryability_by_status() {
        let rate_limited = AiError::Api {
            status: 429,
            message: "slow down".into(),
        };
        let server = AiError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        let bad_key = AiError::Api {
            status: 401,
            message: "invalid key".into(),
        };
        assert!(rate_limited.is_retryable());
        assert!(server.is_retryable());
        assert!(!bad_key.is_retryable());
        assert_eq!(bad_key.code(), "AI_AUTH_FAILED");
        assert!(!AiError::EmptyContent.is_retryable());
    }

    #[tokio::test]
    async fn test_unconfigured_analyzer_fails_fast() {
        let analyzer = HttpFeedbackAnalyzer::new(Client::new());
        let result = analyzer
            .analyze(&AiConfig::default(), "text", &JobContext::default())
            .await;
        assert!(matches!(result, Err(AiError::NotConfigured)));
    }
}
