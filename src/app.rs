use crate::controller::{Controller, RequestForm, SharedProvider, Submission};
use crate::model::ModelId;
use crate::provider::ApiResult;
use crate::view::{Tone, View};
use crate::{clipboard, config, provider};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Redraw cadence of the one-shot reveal.
const PRINT_TICK: Duration = Duration::from_millis(10);

pub fn build_provider(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    provider_name: &str,
) -> anyhow::Result<SharedProvider> {
    match provider_name {
        "google" => {
            #[cfg(feature = "google")]
            {
                let p = match cfg.and_then(|c| c.api_base.as_deref()) {
                    Some(base) => provider::google::GoogleProvider::with_api_base(http.clone(), base)?,
                    None => provider::google::GoogleProvider::new(http.clone())?,
                };
                Ok(Arc::new(p))
            }
            #[cfg(not(feature = "google"))]
            {
                let _ = http;
                let _ = cfg;
                anyhow::bail!("google provider is not enabled in this build")
            }
        }
        "stub" => Ok(Arc::new(provider::stub::StubProvider::new())),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

/// `--api-key`, then `GEMINI_API_KEY`, then config.
pub fn resolve_api_key(flag: Option<String>, cfg: Option<&config::Config>) -> Option<String> {
    pick_api_key(flag, std::env::var("GEMINI_API_KEY").ok(), cfg)
}

fn pick_api_key(
    flag: Option<String>,
    env: Option<String>,
    cfg: Option<&config::Config>,
) -> Option<String> {
    flag.or(env)
        .or_else(|| cfg.and_then(|c| c.google.api_key.clone()))
}

pub fn resolve_model(flag: Option<ModelId>, cfg: Option<&config::Config>) -> ModelId {
    flag.or_else(|| cfg.and_then(|c| c.model))
        .unwrap_or_default()
}

/// One exchange, rendered to stdout/stderr.
pub async fn cmd_probe(controller: &Controller, form: RequestForm, copy: bool) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();

    let result = match controller.submit(&form) {
        Submission::Started(exchange) => {
            writeln!(err, "{} [{} via {}]", controller.view().status_text, form.model, controller.provider_name())?;
            exchange.run().await
        }
        Submission::Rejected => {
            let view = controller.view();
            write_status(&mut err, &view)?;
            writeln!(err, "{}", view.response)?;
            anyhow::bail!("{}", view.status_text);
        }
        Submission::Ignored => anyhow::bail!("an exchange is already in flight"),
    };

    match result {
        ApiResult::Success { .. } => {
            write_status(&mut err, &controller.view())?;
            print_reveal(controller, &mut out).await?;

            if copy {
                let clip = clipboard::system();
                if controller.copy(clip.as_ref()).is_some() {
                    writeln!(err, "{}", controller.view().copy_label)?;
                }
            }
            Ok(())
        }
        ApiResult::Failure { short_label, detail } => {
            let view = controller.view();
            write_status(&mut err, &view)?;
            writeln!(err, "{}", view.response)?;
            anyhow::bail!("{short_label}: {detail}")
        }
    }
}

fn write_status(w: &mut impl Write, view: &View) -> std::io::Result<()> {
    writeln!(
        w,
        "{}  latency: {}  status: {}",
        view.status_text, view.latency, view.http_status
    )
}

/// Stream the controller's reveal buffer to `out` until the reveal is done.
async fn print_reveal(controller: &Controller, out: &mut impl Write) -> anyhow::Result<()> {
    let mut printed = 0usize;
    let mut ticker = tokio::time::interval(PRINT_TICK);

    loop {
        ticker.tick().await;
        let view = controller.view();
        if let Some(new) = view.response.get(printed..) {
            out.write_all(new.as_bytes())?;
            out.flush().ok();
            printed = view.response.len();
        }
        if view.response_tone == Tone::Done {
            break;
        }
    }
    writeln!(out)?;
    Ok(())
}
