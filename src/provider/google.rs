use super::{ApiResult, GenerateRequest, Provider};
use crate::model::ModelId;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";

/// Text shown when a 2xx body carries no candidate text.
pub const NO_CONTENT: &str = "No content returned.";

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    api_base: Url,
}

impl GoogleProvider {
    pub fn new(http: reqwest::Client) -> anyhow::Result<Self> {
        Self::with_api_base(http, DEFAULT_API_BASE)
    }

    pub fn with_api_base(http: reqwest::Client, api_base: &str) -> anyhow::Result<Self> {
        let mut api_base =
            Url::parse(api_base).with_context(|| format!("invalid API base URL: {api_base}"))?;
        // Url::join drops the last path segment unless it ends with '/'.
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Ok(Self { http, api_base })
    }

    fn build_url(&self, model: ModelId, api_key: &str) -> anyhow::Result<Url> {
        // Docs: https://ai.google.dev/api/rest/v1beta/models/generateContent
        let mut url = self
            .api_base
            .join(&format!("v1beta/models/{model}:generateContent"))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h
    }

    /// One POST, timed from just before send to after the body is read.
    async fn exchange(&self, req: GenerateRequest) -> Result<(u64, String), ExchangeError> {
        let url = self
            .build_url(req.model, &req.api_key)
            .map_err(|e| ExchangeError::Request(e.to_string()))?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(req.prompt) }],
            }],
        };

        let started = Instant::now();
        let resp = self
            .http
            .post(url)
            .headers(Self::headers())
            .json(&body)
            .send()
            .await
            .map_err(ExchangeError::transport)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ExchangeError::transport)?;
        let latency_ms = round_ms(started.elapsed());

        tracing::debug!(%status, latency_ms, bytes = bytes.len(), "response received");

        let text = interpret(status, &bytes)?;
        Ok((latency_ms, text))
    }
}

impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn generate(&self, req: GenerateRequest) -> Pin<Box<dyn Future<Output = ApiResult> + Send>> {
        let this = self.clone();

        Box::pin(async move {
            let model = req.model;
            tracing::debug!(%model, prompt_chars = req.prompt.chars().count(), "sending generateContent");

            match this.exchange(req).await {
                Ok((latency_ms, text)) => {
                    tracing::debug!(%model, latency_ms, "exchange succeeded");
                    ApiResult::Success { latency_ms, text }
                }
                Err(e) => {
                    tracing::debug!(%model, error = %e, "exchange failed");
                    e.into()
                }
            }
        })
    }
}

/// Failure classes of one exchange. Never leaves this module: it is folded
/// into [`ApiResult::Failure`].
#[derive(Debug, Error)]
enum ExchangeError {
    #[error("{0}")]
    Request(String),

    /// Connect, TLS, timeout or body read. The message never contains the URL.
    #[error("{0}")]
    Transport(String),

    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// Syntactically valid JSON that cannot be read at all.
    #[error("{0}")]
    Malformed(String),
}

impl ExchangeError {
    fn transport(e: reqwest::Error) -> Self {
        // The URL carries the API key in its query string.
        ExchangeError::Transport(format!("{:#}", anyhow::Error::new(e.without_url())))
    }
}

impl From<ExchangeError> for ApiResult {
    fn from(e: ExchangeError) -> Self {
        if let ExchangeError::Status { status, .. } = &e {
            tracing::debug!(%status, "provider returned an error status");
        }
        ApiResult::connection_failed(e.to_string())
    }
}

fn round_ms(d: Duration) -> u64 {
    (d.as_secs_f64() * 1000.0).round() as u64
}

/// Map status and body onto the generated text.
fn interpret(status: StatusCode, body: &[u8]) -> Result<String, ExchangeError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .and_then(|env| env.error)
            .and_then(|err| err.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP Error {}", status.as_u16()));
        return Err(ExchangeError::Status { status, message });
    }

    // Only the first part of the first candidate is read; the rest of the
    // body may have any shape.
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if value.is_null() {
        return Err(ExchangeError::Malformed("response body is null".to_string()));
    }
    Ok(first_text(&value).unwrap_or_else(|| NO_CONTENT.to_string()))
}

fn first_text(value: &Value) -> Option<String> {
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SHORT_CONNECTION_FAILED;
    use axum::body::Bytes;
    use axum::extract::{Path, Query, State};
    use axum::routing::post;
    use axum::Router;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Seen {
        call: String,
        key: Option<String>,
        body: serde_json::Value,
    }

    #[derive(Clone)]
    struct FakeGemini {
        status: axum::http::StatusCode,
        reply: String,
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    async fn handle_generate(
        State(state): State<FakeGemini>,
        Path(call): Path<String>,
        Query(q): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> (axum::http::StatusCode, String) {
        state.seen.lock().unwrap().push(Seen {
            call,
            key: q.get("key").cloned(),
            body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
        });
        (state.status, state.reply.clone())
    }

    async fn spawn_fake(status: u16, reply: &str) -> (String, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = FakeGemini {
            status: axum::http::StatusCode::from_u16(status).unwrap(),
            reply: reply.to_string(),
            seen: seen.clone(),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = Router::new()
            .route("/v1beta/models/:call", post(handle_generate))
            .with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}/"), seen)
    }

    fn request(key: &str, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            api_key: key.to_string(),
            prompt: prompt.to_string(),
            model: ModelId::Gemini25Flash,
        }
    }

    async fn run(base: &str, req: GenerateRequest) -> ApiResult {
        let provider = GoogleProvider::with_api_base(reqwest::Client::new(), base).unwrap();
        provider.generate(req).await
    }

    #[test]
    fn url_carries_model_and_key() {
        let p = GoogleProvider::new(reqwest::Client::new()).unwrap();
        let url = p.build_url(ModelId::Gemini15Pro, "abc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent?key=abc"
        );
    }

    #[test]
    fn api_base_without_trailing_slash_keeps_its_path() {
        let p = GoogleProvider::with_api_base(reqwest::Client::new(), "http://proxy.local/gemini").unwrap();
        let url = p.build_url(ModelId::Gemini20Flash, "k").unwrap();
        assert_eq!(
            url.as_str(),
            "http://proxy.local/gemini/v1beta/models/gemini-2.0-flash:generateContent?key=k"
        );
    }

    #[test]
    fn request_body_is_a_single_text_part() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some("hi".into()) }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"contents":[{"parts":[{"text":"hi"}]}]})
        );
    }

    #[test]
    fn empty_first_part_falls_back_to_no_content() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#;
        assert_eq!(interpret(StatusCode::OK, body).unwrap(), NO_CONTENT);
    }

    #[test]
    fn unexpected_json_shape_has_no_content() {
        assert_eq!(interpret(StatusCode::OK, b"[1,2,3]").unwrap(), NO_CONTENT);
        assert_eq!(
            interpret(StatusCode::OK, br#"{"candidates":"nope"}"#).unwrap(),
            NO_CONTENT
        );
    }

    #[test]
    fn first_text_ignores_shape_of_other_elements() {
        let other_candidate =
            br#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}},{"content":"x"}]}"#;
        assert_eq!(interpret(StatusCode::OK, other_candidate).unwrap(), "hello");

        let other_part = br#"{"candidates":[{"content":{"parts":[{"text":"hello"},{"text":5}]}}]}"#;
        assert_eq!(interpret(StatusCode::OK, other_part).unwrap(), "hello");

        let extra_fields = br#"{"candidates":[{"content":{"parts":[{"text":"hi"}],"role":7},"finishReason":null}],"usageMetadata":"?"}"#;
        assert_eq!(interpret(StatusCode::OK, extra_fields).unwrap(), "hi");
    }

    #[test]
    fn null_body_is_a_failure() {
        let err = interpret(StatusCode::OK, b"null").unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
        assert_eq!(
            ApiResult::from(err),
            ApiResult::connection_failed("response body is null")
        );
    }

    #[test]
    fn error_envelope_without_message_uses_status() {
        let err = interpret(StatusCode::FORBIDDEN, br#"{"error":{"code":403}}"#).unwrap_err();
        assert_eq!(err.to_string(), "HTTP Error 403");
    }

    #[test]
    fn rounds_latency_to_nearest_millisecond() {
        assert_eq!(round_ms(Duration::from_micros(12_499)), 12);
        assert_eq!(round_ms(Duration::from_micros(12_500)), 13);
    }

    #[tokio::test]
    async fn success_returns_first_candidate_text() {
        let (base, seen) =
            spawn_fake(200, r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#).await;

        let res = run(&base, request("k-123", "hi")).await;
        match res {
            ApiResult::Success { text, .. } => assert_eq!(text, "hello"),
            other => panic!("expected success, got {other:?}"),
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].call, "gemini-2.5-flash:generateContent");
        assert_eq!(seen[0].key.as_deref(), Some("k-123"));
        assert_eq!(
            seen[0].body,
            serde_json::json!({"contents":[{"parts":[{"text":"hi"}]}]})
        );
    }

    #[tokio::test]
    async fn missing_candidates_yields_placeholder() {
        let (base, _) = spawn_fake(200, r#"{"usageMetadata":{}}"#).await;
        let res = run(&base, request("k", "hi")).await;
        assert!(matches!(res, ApiResult::Success { ref text, .. } if text == NO_CONTENT));
    }

    #[tokio::test]
    async fn error_status_surfaces_provider_message() {
        let (base, _) = spawn_fake(400, r#"{"error":{"message":"invalid key"}}"#).await;
        let res = run(&base, request("bad", "hi")).await;
        assert_eq!(res, ApiResult::failure(SHORT_CONNECTION_FAILED, "invalid key"));
    }

    #[tokio::test]
    async fn unparsable_error_body_falls_back_to_status_code() {
        let (base, _) = spawn_fake(502, "<html>bad gateway</html>").await;
        let res = run(&base, request("k", "hi")).await;
        assert_eq!(res, ApiResult::failure(SHORT_CONNECTION_FAILED, "HTTP Error 502"));
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_connection_failure() {
        let (base, _) = spawn_fake(200, "not json").await;
        let res = run(&base, request("k", "hi")).await;
        match res {
            ApiResult::Failure { short_label, detail } => {
                assert_eq!(short_label, SHORT_CONNECTION_FAILED);
                assert!(!detail.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_reports_error_without_key() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let res = run(&format!("http://{addr}/"), request("secret-key-xyz", "hi")).await;
        match res {
            ApiResult::Failure { short_label, detail } => {
                assert_eq!(short_label, SHORT_CONNECTION_FAILED);
                // The source chain is rendered after the top-level message.
                assert!(detail.starts_with("error sending request: "), "{detail}");
                assert!(!detail.contains("secret-key-xyz"), "detail leaked key: {detail}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
