//! Request lifecycle: idle -> processing -> success/failure -> idle.

use crate::clipboard::Clipboard;
use crate::model::ModelId;
use crate::provider::{ApiResult, GenerateRequest, Provider};
use crate::typewriter::{self, RevealTarget};
use crate::view::{ShakeTarget, Tone, View};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const API_KEY_MISSING: &str = "API KEY MISSING";

/// How long the copy control shows its confirmation.
pub const COPY_CONFIRM_FOR: Duration = Duration::from_millis(2000);

pub type SharedProvider = Arc<dyn Provider + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Processing,
}

/// Form values, read fresh at submit time.
#[derive(Clone, Default)]
pub struct RequestForm {
    pub api_key: String,
    pub prompt: String,
    pub model: ModelId,
}

impl std::fmt::Debug for RequestForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestForm")
            .field("api_key", &"<redacted>")
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Screen {
    phase: Phase,
    view: View,
    reveal_generation: u64,
    copy_generation: u64,
}

impl Screen {
    /// Stop any running reveal and return the generation for the next one.
    fn invalidate_reveal(&mut self) -> u64 {
        self.reveal_generation += 1;
        self.reveal_generation
    }
}

impl RevealTarget for Screen {
    fn current_reveal(&self) -> u64 {
        self.reveal_generation
    }

    fn push_char(&mut self, c: char) {
        self.view.response.push(c);
    }

    fn finish_reveal(&mut self) {
        self.view.response_tone = Tone::Done;
    }
}

fn lock(screen: &Mutex<Screen>) -> MutexGuard<'_, Screen> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of [`Controller::submit`].
pub enum Submission {
    /// An exchange is already in flight.
    Ignored,
    /// Validation failed; the failure is already rendered.
    Rejected,
    /// Processing state entered; run the exchange to finish it.
    Started(Exchange),
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Submission::Ignored => f.write_str("Ignored"),
            Submission::Rejected => f.write_str("Rejected"),
            Submission::Started(_) => f.write_str("Started(..)"),
        }
    }
}

/// Mediates between form input, the provider and the visible state.
#[derive(Clone)]
pub struct Controller {
    screen: Arc<Mutex<Screen>>,
    provider: SharedProvider,
}

impl Controller {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen::default())),
            provider,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        lock(&self.screen).phase
    }

    /// Snapshot of the visible state.
    pub fn view(&self) -> View {
        lock(&self.screen).view.clone()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Check-and-enter processing in one critical section.
    pub fn submit(&self, form: &RequestForm) -> Submission {
        let api_key = form.api_key.trim();
        let mut screen = lock(&self.screen);

        if screen.phase == Phase::Processing {
            tracing::debug!("submit ignored: exchange in flight");
            return Submission::Ignored;
        }

        screen.invalidate_reveal();

        if api_key.is_empty() {
            tracing::debug!("submit rejected: API key missing");
            let now = Instant::now();
            screen.view.show_failure(API_KEY_MISSING, "", now);
            screen.view.shake_now(ShakeTarget::KeyInput, now);
            return Submission::Rejected;
        }

        screen.phase = Phase::Processing;
        screen.view.show_processing();
        drop(screen);

        Submission::Started(Exchange {
            guard: ProcessingGuard {
                screen: self.screen.clone(),
            },
            request: GenerateRequest {
                api_key: api_key.to_string(),
                prompt: form.prompt.trim().to_string(),
                model: form.model,
            },
            provider: self.provider.clone(),
        })
    }

    /// Copy the displayed response. Best effort: failures are only logged.
    ///
    /// On success the copy control is confirmed for [`COPY_CONFIRM_FOR`]; the
    /// returned task reverts it.
    pub fn copy(&self, clipboard: &dyn Clipboard) -> Option<JoinHandle<()>> {
        let text = lock(&self.screen).view.response.clone();
        if let Err(e) = clipboard.set_text(&text) {
            tracing::debug!(error = %format!("{e:#}"), "copy failed");
            return None;
        }

        let generation = {
            let mut screen = lock(&self.screen);
            screen.copy_generation += 1;
            screen.view.confirm_copy();
            screen.copy_generation
        };

        let screen = self.screen.clone();
        Some(tokio::spawn(async move {
            tokio::time::sleep(COPY_CONFIRM_FOR).await;
            let mut screen = lock(&screen);
            // A later copy owns the label now.
            if screen.copy_generation == generation {
                screen.view.reset_copy();
            }
        }))
    }
}

/// Returns the controller to idle when dropped, whichever way the exchange
/// ended.
struct ProcessingGuard {
    screen: Arc<Mutex<Screen>>,
}

impl ProcessingGuard {
    fn render(&self, result: &ApiResult) {
        let mut screen = lock(&self.screen);
        let generation = screen.invalidate_reveal();

        match result {
            ApiResult::Success { latency_ms, text } => {
                screen.view.show_success(*latency_ms);
                drop(screen);
                typewriter::spawn(self.screen.clone(), generation, text.clone());
            }
            ApiResult::Failure { short_label, detail } => {
                screen.view.show_failure(short_label, detail, Instant::now());
            }
        }
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut screen = lock(&self.screen);
        screen.phase = Phase::Idle;
        screen.view.show_idle_controls();
    }
}

/// One in-flight exchange. Dropping it without running releases the
/// processing state as well.
pub struct Exchange {
    guard: ProcessingGuard,
    request: GenerateRequest,
    provider: SharedProvider,
}

impl Exchange {
    pub async fn run(self) -> ApiResult {
        let Exchange {
            guard,
            request,
            provider,
        } = self;

        let result = provider.generate(request).await;
        guard.render(&result);
        result
    }
}
