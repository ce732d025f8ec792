/// LLM Client: the single point of entry for all Gemini API calls in the screener.
///
/// ARCHITECTURAL RULE: No other module may call the generative-language API directly.
/// All LLM interactions MUST go through the `TextGenerator` trait defined here.
///
/// Calls are single-shot. There is no retry loop; callers decide what a failure means.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
pub mod testing;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Response candidate carried no text part")]
    MalformedResponse,
}

/// Anything that can turn a prompt into generated text.
///
/// Carried in `AppState` as `Arc<dyn TextGenerator>` so tests can swap in canned replies.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    /// No candidates at all is an empty reply, not an error.
    pub fn text(&self) -> Result<&str, LlmError> {
        let Some(candidate) = self.candidates.first() else {
            return Ok("");
        };
        candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .ok_or(LlmError::MalformedResponse)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini `generateContent` client, authenticated by a static query key.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url,
            api_key,
            timeout,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Makes a raw call to the Gemini API, returning the decoded response object.
    pub async fn call(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let decoded: GenerateContentResponse = serde_json::from_str(&body)?;

        debug!(
            "LLM call succeeded: prompt_chars={}, candidates={}",
            prompt.len(),
            decoded.candidates.len()
        );

        Ok(decoded)
    }

    fn classify(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Http(e)
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt).await?;
        response.text().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_fake_api(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/generate")
    }

    fn client_for(url: String, timeout_ms: u64) -> GeminiClient {
        GeminiClient::new(url, "test-key".to_string(), Duration::from_millis(timeout_ms)).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn test_response_text_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "first"}, {"text": "second"}]}},
                {"content": {"parts": [{"text": "other"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response.text().unwrap(), "first");
    }

    #[test]
    fn test_response_without_candidates_is_empty_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text().unwrap(), "");

        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert_eq!(response.text().unwrap(), "");
    }

    #[test]
    fn test_candidate_without_parts_is_malformed() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(matches!(response.text(), Err(LlmError::MalformedResponse)));
    }

    #[tokio::test]
    async fn test_generate_sends_key_and_prompt() {
        let router = Router::new().route(
            "/generate",
            post(
                |Query(params): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    let key = params.get("key").cloned().unwrap_or_default();
                    let prompt = body["contents"][0]["parts"][0]["text"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({
                        "candidates": [{"content": {"parts": [{"text": format!("{key}|{prompt}")}]}}]
                    }))
                },
            ),
        );
        let url = spawn_fake_api(router).await;
        let client = client_for(url, 2_000);

        let text = client.generate("rate this").await.unwrap();
        assert_eq!(text, "test-key|rate this");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error_with_message() {
        let router = Router::new().route(
            "/generate",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({"error": {"message": "API key not valid"}})),
                )
            }),
        );
        let url = spawn_fake_api(router).await;
        let client = client_for(url, 2_000);

        match client.generate("anything").await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_api_times_out() {
        let router = Router::new().route(
            "/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"candidates": []}))
            }),
        );
        let url = spawn_fake_api(router).await;
        let client = client_for(url, 100);

        let result = client.generate("anything").await;
        assert!(matches!(result, Err(LlmError::Timeout(_))), "got {result:?}");
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let router = Router::new().route(
            "/generate",
            post(|| async { "not json" }),
        );
        let url = spawn_fake_api(router).await;
        let client = client_for(url, 2_000);

        assert!(matches!(
            client.generate("anything").await,
            Err(LlmError::Parse(_))
        ));
    }
}
