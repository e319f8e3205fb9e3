mod ask_cmd;
mod chat_cmd;
mod config_cmd;
mod input;
mod model_check;
mod models_cmd;
mod terminal_output;
mod test_cmd;

use std::fmt;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, error};

use qwen_config::{config_file_path, load_and_prepare, ConfigError, QwenConfig};
use qwen_logging::{init_logger, LogSettings};

use ask_cmd::AskArgs;
use chat_cmd::ChatArgs;
use config_cmd::ConfigAction;

#[derive(Parser)]
#[command(name = "qwen")]
#[command(about = "Chat with local Qwen models served by Ollama")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask(AskArgs),
    /// Start an interactive chat session
    Chat(ChatArgs),
    /// Show or change the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List models installed on the Ollama server
    Models {
        /// Ollama base URL
        #[arg(long)]
        host: Option<String>,
    },
    /// Run the workspace test suite
    Test {
        /// Extra arguments passed to `cargo test`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Exit with this code; the user has already been told why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit(pub u8);

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit status {}", self.0)
    }
}

impl std::error::Error for Exit {}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = LogSettings::from_env();
    let log_dir = init_logger(&settings);
    debug!(log_dir = ?log_dir, "Logger initialized");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => ExitCode::from(exit_status(&e)),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Ask(args) => ask_cmd::run(args, load().await?).await?,
        Commands::Chat(args) => chat_cmd::run(args, load().await?).await?,
        Commands::Config { action } => {
            config_cmd::run(action, &config_file_path(), &mut std::io::stdout()).await?
        }
        Commands::Models { host } => models_cmd::run(host, load().await?).await?,
        Commands::Test { args } => return test_cmd::run(&args).await,
    }
    Ok(ExitCode::SUCCESS)
}

async fn load() -> Result<QwenConfig> {
    let path = config_file_path();
    debug!(path = %path.display(), "Loading config");
    Ok(load_and_prepare(&path).await?)
}

/// Connectivity and runtime failures exit 1, configuration problems exit 2.
fn exit_status(e: &anyhow::Error) -> u8 {
    if let Some(Exit(code)) = e.downcast_ref::<Exit>() {
        return *code;
    }
    if let Some(config_err) = e.downcast_ref::<ConfigError>() {
        eprintln!("❌ Configuration error: {config_err}");
        error!(error = %config_err, "Configuration error");
        return 2;
    }
    eprintln!("❌ Error: {e:#}");
    error!(error = %format!("{e:#}"), "Command failed");
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_chat_flags() {
        let cli = Cli::try_parse_from([
            "qwen", "chat", "-m", "qwen2.5:7b", "--max-messages", "4", "-y", "--no-log",
            "--session", "work-2024-05-17-1",
        ])
        .unwrap();
        let Some(Commands::Chat(args)) = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(args.model.as_deref(), Some("qwen2.5:7b"));
        assert_eq!(args.max_messages, Some(4));
        assert!(args.yes && args.no_log);
        assert_eq!(args.session.as_deref(), Some("work-2024-05-17-1"));
    }

    #[test]
    fn ask_joins_prompt_words() {
        let cli = Cli::try_parse_from(["qwen", "ask", "what", "is", "2+2?"]).unwrap();
        let Some(Commands::Ask(args)) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.prompt_text(), "what is 2+2?");
    }

    #[test]
    fn no_subcommand_is_allowed() {
        assert!(Cli::try_parse_from(["qwen"]).unwrap().command.is_none());
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(exit_status(&Exit(1).into()), 1);
        let config_err: anyhow::Error = ConfigError::UnknownKey("colour".into()).into();
        assert_eq!(exit_status(&config_err), 2);
        let wrapped = anyhow::Error::from(ConfigError::UnknownKey("x".into())).context("while saving");
        assert_eq!(exit_status(&wrapped), 2);
        assert_eq!(exit_status(&anyhow::anyhow!("boom")), 1);
    }
}
