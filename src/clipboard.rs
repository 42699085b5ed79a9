/// Write-only text clipboard.
pub trait Clipboard {
    fn set_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Desktop clipboard via arboard.
///
/// The handle is opened lazily and kept alive: on X11 the selection is
/// served by the owning handle, so dropping it right after a write would
/// drop the copied text too.
#[cfg(feature = "clipboard")]
#[derive(Default)]
pub struct SystemClipboard {
    inner: std::sync::Mutex<Option<arboard::Clipboard>>,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> anyhow::Result<()> {
        use anyhow::Context;

        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new().context("failed to open system clipboard")?);
        }
        let Some(cb) = guard.as_mut() else {
            anyhow::bail!("system clipboard unavailable");
        };
        cb.set_text(text.to_owned())
            .context("failed to write clipboard")
    }
}

/// Used when the build has no clipboard support.
#[cfg(not(feature = "clipboard"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

#[cfg(not(feature = "clipboard"))]
impl Clipboard for NoClipboard {
    fn set_text(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("clipboard support is not enabled in this build")
    }
}

pub fn system() -> Box<dyn Clipboard> {
    #[cfg(feature = "clipboard")]
    {
        Box::new(SystemClipboard::new())
    }
    #[cfg(not(feature = "clipboard"))]
    {
        Box::new(NoClipboard)
    }
}
