mod api;
mod app;
mod commands;
mod config;
mod engine;
mod errors;
mod logging;
mod markup;
mod model;
mod output;
mod parse;
mod state;
mod theme;
mod tui;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::app::Runtime;
use crate::commands::config::ConfigCommand;
use crate::commands::directive::{DirectiveArgs, LearnArgs};
use crate::commands::kai::{AnalyzeArgs, ChatArgs, CreateArgs, MemoryCommand};
use crate::commands::state::StateCommand;
use crate::errors::CliError;
use crate::output::{OutputMode, print_error};

#[derive(Debug, Parser)]
#[command(
    name = "autocorp",
    version,
    about = "Autonomous Corp and KAI: model-driven terminal companions."
)]
struct Cli {
    #[arg(long, global = true)]
    profile: Option<String>,
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,
    /// Model id, e.g. gemini-2.5-flash
    #[arg(long, global = true)]
    model: Option<String>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    quiet: bool,
    #[arg(long, global = true, default_value_t = 30_000)]
    timeout: u64,
    #[arg(long, global = true, default_value_t = 2)]
    retries: u32,
    #[arg(long, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the Autonomous Corp console
    Corp,
    /// Open the KAI companion
    Kai,
    /// Issue one directive to the corporation
    Directive(DirectiveArgs),
    /// Feed an architect log entry to the corporation
    Learn(LearnArgs),
    /// Talk to KAI
    Chat(ChatArgs),
    /// Ask KAI for a creative piece
    Create(CreateArgs),
    /// Ask KAI a question about some text
    Analyze(AnalyzeArgs),
    /// Manage KAI's memory archive
    Memory {
        #[command(subcommand)]
        command: MemoryCommand,
    },
    /// Inspect or reset stored state
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
    /// List models available to the configured key
    Models,
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Corp => "corp",
            Commands::Kai => "kai",
            Commands::Directive(_) => "directive",
            Commands::Learn(_) => "learn",
            Commands::Chat(_) => "chat",
            Commands::Create(_) => "create",
            Commands::Analyze(_) => "analyze",
            Commands::Memory { .. } => "memory",
            Commands::State { .. } => "state",
            Commands::Models => "models",
            Commands::Config { .. } => "config",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    let result = run(cli, output.clone()).await;
    if let Err(err) = result {
        error!(error = %err, code = err.exit_code(), "command failed");
        print_error(&err, &output);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli, output: OutputMode) -> Result<(), CliError> {
    let config = config::load_config()?;
    let config_path = config::config_path()?;

    let mut runtime = Runtime {
        output,
        config,
        config_path,
        profile_override: cli.profile,
        api_url_override: cli.api_url,
        model_override: cli.model,
        timeout_ms: cli.timeout,
        retries: cli.retries,
    };

    runtime
        .output
        .print_verbose(&format!("config: {}", runtime.config_path.display()));
    if let Ok(dir) = runtime.data_dir() {
        if let Some(path) = logging::init(&dir, runtime.output.debug) {
            runtime
                .output
                .print_verbose(&format!("logging to {}", path.display()));
        }
    }
    info!(command = cli.command.name(), profile = %runtime.active_profile(), "start");

    match cli.command {
        Commands::Corp => tui::corp::handle(&runtime).await,
        Commands::Kai => tui::kai::handle(&runtime).await,
        Commands::Directive(args) => commands::directive::directive(&runtime, args).await,
        Commands::Learn(args) => commands::directive::learn(&runtime, args).await,
        Commands::Chat(args) => commands::kai::chat(&runtime, args).await,
        Commands::Create(args) => commands::kai::create(&runtime, args).await,
        Commands::Analyze(args) => commands::kai::analyze(&runtime, args).await,
        Commands::Memory { command } => commands::kai::memory(&runtime, command).await,
        Commands::State { command } => commands::state::handle(&runtime, command).await,
        Commands::Models => commands::models::handle(&runtime).await,
        Commands::Config { command } => commands::config::handle(&mut runtime, command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "autocorp",
            "directive",
            "grow revenue",
            "--mode",
            "edge",
            "--model",
            "gemini-2.5-pro",
            "--json",
        ])
        .expect("parse");
        assert!(cli.json);
        assert_eq!(cli.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(cli.command.name(), "directive");
    }

    #[test]
    fn memory_delete_takes_numeric_id() {
        assert!(Cli::try_parse_from(["autocorp", "memory", "delete", "abc"]).is_err());
        let cli = Cli::try_parse_from(["autocorp", "memory", "delete", "42"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Memory {
                command: MemoryCommand::Delete { id: 42 }
            }
        ));
    }
}
