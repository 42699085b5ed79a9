//! Visible state shared by the front ends.
//!
//! Everything here is plain data plus pure transitions; the controller
//! decides when each transition happens and the front ends only draw.

use std::time::Duration;
use tokio::time::Instant;

pub const STATUS_IDLE: &str = "AWAITING INPUT";
pub const STATUS_PROCESSING: &str = "SYSTEM PROCESSING...";
pub const STATUS_ONLINE: &str = "SYSTEM ONLINE";
pub const LATENCY_NONE: &str = "--";
pub const HTTP_OK: &str = "200 OK";
pub const HTTP_ERROR: &str = "ERROR";
pub const COPY_LABEL: &str = "COPY";
pub const COPY_CONFIRMED: &str = "COPIED!";

/// Shake cue: six 100 ms half-swings.
const SHAKE_STEP: Duration = Duration::from_millis(100);
const SHAKE_STEPS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusDot {
    #[default]
    Neutral,
    Online,
    Error,
}

/// Colour role of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    Success,
    Error,
    /// Reveal finished.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakeTarget {
    KeyInput,
    Panel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shake {
    pub target: ShakeTarget,
    pub started: Instant,
}

impl Shake {
    /// Horizontal offset in cells at `now`; zero once the cue has played out.
    pub fn offset_at(&self, now: Instant) -> u16 {
        let step = (now.saturating_duration_since(self.started).as_millis()
            / SHAKE_STEP.as_millis()) as u32;
        if step >= SHAKE_STEPS {
            0
        } else {
            (step % 2 == 0) as u16
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub status_dot: StatusDot,
    pub status_text: String,
    pub status_tone: Tone,

    pub latency: String,
    pub http_status: String,
    pub metrics_tone: Tone,

    pub results_visible: bool,
    pub response: String,
    pub response_tone: Tone,

    pub submit_enabled: bool,
    pub busy: bool,

    /// Active shake cues, at most one per target.
    pub shakes: Vec<Shake>,

    pub copy_label: &'static str,
    pub copy_confirmed: bool,
}

impl Default for View {
    fn default() -> Self {
        Self {
            status_dot: StatusDot::Neutral,
            status_text: STATUS_IDLE.to_string(),
            status_tone: Tone::Plain,
            latency: LATENCY_NONE.to_string(),
            http_status: LATENCY_NONE.to_string(),
            metrics_tone: Tone::Plain,
            results_visible: false,
            response: String::new(),
            response_tone: Tone::Plain,
            submit_enabled: true,
            busy: false,
            shakes: Vec::new(),
            copy_label: COPY_LABEL,
            copy_confirmed: false,
        }
    }
}

impl View {
    pub fn show_processing(&mut self) {
        self.submit_enabled = false;
        self.busy = true;
        self.results_visible = false;
        self.status_dot = StatusDot::Neutral;
        self.status_text = STATUS_PROCESSING.to_string();
        self.status_tone = Tone::Plain;
    }

    pub fn show_idle_controls(&mut self) {
        self.submit_enabled = true;
        self.busy = false;
    }

    /// Success render. The response text itself is filled in by the typewriter.
    pub fn show_success(&mut self, latency_ms: u64) {
        self.status_dot = StatusDot::Online;
        self.status_text = STATUS_ONLINE.to_string();
        self.status_tone = Tone::Success;
        self.latency = format!("{latency_ms} ms");
        self.http_status = HTTP_OK.to_string();
        self.metrics_tone = Tone::Success;
        self.results_visible = true;
        self.response.clear();
        self.response_tone = Tone::Plain;
    }

    pub fn show_failure(&mut self, short_label: &str, detail: &str, now: Instant) {
        self.status_dot = StatusDot::Error;
        self.status_text = short_label.to_string();
        self.status_tone = Tone::Error;
        self.latency = LATENCY_NONE.to_string();
        self.http_status = HTTP_ERROR.to_string();
        self.metrics_tone = Tone::Error;
        self.results_visible = true;
        let shown = if detail.is_empty() { short_label } else { detail };
        self.response = format!("Error: {shown}");
        self.response_tone = Tone::Error;
        self.shake_now(ShakeTarget::Panel, now);
    }

    pub fn shake_now(&mut self, target: ShakeTarget, now: Instant) {
        self.shakes.retain(|s| s.target != target);
        self.shakes.push(Shake { target, started: now });
    }

    pub fn shake_offset(&self, target: ShakeTarget, now: Instant) -> u16 {
        self.shakes
            .iter()
            .find(|s| s.target == target)
            .map_or(0, |s| s.offset_at(now))
    }

    pub fn confirm_copy(&mut self) {
        self.copy_label = COPY_CONFIRMED;
        self.copy_confirmed = true;
    }

    pub fn reset_copy(&mut self) {
        self.copy_label = COPY_LABEL;
        self.copy_confirmed = false;
    }
}
