//! Character-by-character reveal of a response.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

pub const FAST_TICK: Duration = Duration::from_millis(5);
pub const SLOW_TICK: Duration = Duration::from_millis(20);

/// Texts longer than this many characters use [`FAST_TICK`].
pub const FAST_THRESHOLD: usize = 200;

pub fn tick_delay(text: &str) -> Duration {
    if text.chars().count() > FAST_THRESHOLD {
        FAST_TICK
    } else {
        SLOW_TICK
    }
}

/// Lazy reveal sequence.
///
/// The first character is ready immediately; every following item, and the
/// end of the stream, waits one tick measured from when the previous item was
/// taken. Dropping the stream cancels the sequence.
pub fn reveal(text: &str) -> impl Stream<Item = char> + Send + 'static {
    let delay = tick_delay(text);
    let chars: Vec<char> = text.chars().collect();
    tokio_stream::iter(chars).throttle(delay)
}

/// Display buffer a reveal writes into.
///
/// Implementors own a generation number; starting a new reveal bumps it and
/// clears the buffer, which makes every older running sequence stop.
pub trait RevealTarget: Send + 'static {
    fn current_reveal(&self) -> u64;
    fn push_char(&mut self, c: char);
    fn finish_reveal(&mut self);
}

/// Run `text` into `target` on a background task as generation `generation`.
///
/// Each append happens under the target's lock and only while `generation`
/// is still current, so two sequences never interleave.
pub fn spawn<T: RevealTarget>(target: Arc<Mutex<T>>, generation: u64, text: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let chars = reveal(&text);
        tokio::pin!(chars);

        while let Some(c) = chars.next().await {
            let mut t = target.lock().unwrap_or_else(PoisonError::into_inner);
            if t.current_reveal() != generation {
                tracing::trace!(generation, "reveal superseded");
                return;
            }
            t.push_char(c);
        }

        let mut t = target.lock().unwrap_or_else(PoisonError::into_inner);
        if t.current_reveal() == generation {
            t.finish_reveal();
        }
    })
}
