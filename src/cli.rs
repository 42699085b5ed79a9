use crate::model::ModelId;
use clap::{Parser, Subcommand};

/// Probe the Gemini generateContent API
#[derive(Debug, Parser)]
#[command(name = "gemini-probe")]
#[command(version)]
#[command(about = "Send one prompt to Gemini and watch the reply type out", long_about = None)]
pub struct Args {
    /// Model (default: config/model or gemini-2.5-flash)
    #[arg(short = 'm', long = "model", value_enum)]
    pub model: Option<ModelId>,

    /// Provider (default: config/provider or "google")
    #[arg(long = "provider")]
    pub provider: Option<String>,

    /// API key (default: GEMINI_API_KEY, then config google.api_key)
    #[arg(long = "api-key", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Copy the response to the system clipboard once revealed
    #[arg(long = "copy")]
    pub copy: bool,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Prompt text (positional) (used when no subcommand is given)
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the interactive terminal UI
    #[cfg(feature = "tui")]
    Tui,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_shot_flags() {
        let args = Args::try_parse_from([
            "gemini-probe",
            "-m",
            "gemini-1.5-flash",
            "--api-key",
            "k",
            "--copy",
            "hello",
            "there",
        ])
        .unwrap();
        assert_eq!(args.model, Some(ModelId::Gemini15Flash));
        assert_eq!(args.api_key.as_deref(), Some("k"));
        assert!(args.copy);
        assert_eq!(args.prompt, ["hello", "there"]);
        assert!(args.cmd.is_none());
    }

    #[test]
    fn rejects_unknown_model() {
        assert!(Args::try_parse_from(["gemini-probe", "-m", "gpt-4", "hi"]).is_err());
    }

    #[cfg(feature = "tui")]
    #[test]
    fn tui_subcommand() {
        let args = Args::try_parse_from(["gemini-probe", "tui"]).unwrap();
        assert!(matches!(args.cmd, Some(Command::Tui)));
    }
}
