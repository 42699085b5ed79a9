mod app;
mod cli;
mod clipboard;
mod config;
mod controller;
mod model;
mod paths;
mod provider;
mod typewriter;
mod view;

#[cfg(feature = "tui")]
mod tui;

use anyhow::Context;
use clap::Parser;
use controller::{Controller, RequestForm};

fn default_log_filter(args: &cli::Args) -> &'static str {
    #[cfg(feature = "tui")]
    {
        if matches!(args.cmd, Some(cli::Command::Tui)) {
            // Log lines would tear the alternate screen.
            return "off";
        }
    }
    let _ = args;
    "info"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(&args).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = paths::config_path()?;
    let cfg = config::Config::load_optional(&config_path)?;
    tracing::debug!(?config_path, ?cfg, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let provider_name = args
        .provider
        .clone()
        .or_else(|| cfg.as_ref().and_then(|c| c.provider.clone()))
        .unwrap_or_else(|| "google".to_string());

    let provider = app::build_provider(&http, cfg.as_ref(), &provider_name)?;
    let controller = Controller::new(provider);

    let form = RequestForm {
        api_key: app::resolve_api_key(args.api_key.clone(), cfg.as_ref()).unwrap_or_default(),
        prompt: args.prompt.join(" "),
        model: app::resolve_model(args.model, cfg.as_ref()),
    };

    #[cfg(feature = "tui")]
    {
        if let Some(cli::Command::Tui) = args.cmd {
            return tui::run_tui(controller, form).await;
        }
    }

    if form.prompt.trim().is_empty() {
        anyhow::bail!("No prompt provided. Try: gemini-probe \"Hello\" or `gemini-probe tui`");
    }

    app::cmd_probe(&controller, form, args.copy).await
}
