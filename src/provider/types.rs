use crate::model::ModelId;
use std::future::Future;
use std::pin::Pin;

/// Short label for every transport-class failure.
pub const SHORT_CONNECTION_FAILED: &str = "CONNECTION FAILED";

/// One exchange worth of input. The key has already been validated non-empty.
#[derive(Clone)]
pub struct GenerateRequest {
    pub api_key: String,
    pub prompt: String,
    pub model: ModelId,
}

impl std::fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("api_key", &"<redacted>")
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .finish()
    }
}

/// Outcome of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult {
    Success { latency_ms: u64, text: String },
    Failure { short_label: String, detail: String },
}

impl ApiResult {
    pub fn failure(short_label: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiResult::Failure {
            short_label: short_label.into(),
            detail: detail.into(),
        }
    }

    pub fn connection_failed(detail: impl Into<String>) -> Self {
        Self::failure(SHORT_CONNECTION_FAILED, detail)
    }
}

/// Provider interface.
///
/// Exactly one request per call and no retries. Failures are folded into
/// [`ApiResult::Failure`], so the future itself never errors.
pub trait Provider {
    fn name(&self) -> &'static str;

    fn generate(&self, req: GenerateRequest) -> Pin<Box<dyn Future<Output = ApiResult> + Send>>;
}
