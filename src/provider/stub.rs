use super::{ApiResult, GenerateRequest, Provider};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Instant;

/// Offline provider: echoes the prompt after a short simulated round trip.
#[derive(Debug, Clone)]
pub struct StubProvider {
    delay: Duration,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(120),
        }
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn generate(&self, req: GenerateRequest) -> Pin<Box<dyn Future<Output = ApiResult> + Send>> {
        let delay = self.delay;
        Box::pin(async move {
            let started = Instant::now();
            tokio::time::sleep(delay).await;
            let text = format!("[stub provider]\nmodel: {}\n\nYou said: {}", req.model, req.prompt);
            ApiResult::Success {
                latency_ms: started.elapsed().as_millis() as u64,
                text,
            }
        })
    }
}
