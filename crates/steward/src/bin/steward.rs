//! Steward CLI.
//!
//! `start` runs the supervisor in this process; `stop`, `restart`, and
//! `send` talk to the running instance through its HTTP front door.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use steward::builtins;
use steward::capability::{CapabilityRegistry, FailureKind};
use steward::config::{Config, CONFIG_FILENAME};
use steward::core::Core;
use steward::error::{CoreError, CoreResult};
use steward::routing::{DispatchAudit, RouterOptions};
use steward::server::TriggerResponse;
use steward::supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "steward")]
#[command(about = "Personal assistant daemon", version)]
struct Cli {
    /// Config file path; created with defaults (and a fresh secret) when missing
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the assistant in this process until stopped
    Start,
    /// Ask the running instance to shut down
    Stop,
    /// Ask the running instance to restart its units
    Restart,
    /// Submit a one-off command to the running instance
    Send {
        /// The command text, e.g. `steward send what's the weather`
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("steward=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));

    if let Err(error) = run(cli, &config_path).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config_path: &Path) -> CoreResult<()> {
    let config = Config::load_or_create(config_path)?;
    match cli.command {
        Commands::Start => start(config).await,
        Commands::Stop => send_remote(&config, "stop").await,
        Commands::Restart => send_remote(&config, "restart").await,
        Commands::Send { command } => {
            if command.is_empty() {
                return Err(CoreError::InvalidInput(
                    "nothing to send; try `steward send what's the weather`".to_string(),
                ));
            }
            send_remote(&config, &command.join(" ")).await
        }
    }
}

async fn start(config: Config) -> CoreResult<()> {
    let supervisor = Supervisor::new(config.clone());

    let audit = Arc::new(DispatchAudit::new());
    let mut registry = CapabilityRegistry::new();
    builtins::register_builtins(&mut registry, audit.clone(), supervisor.control_handle());
    let core = Arc::new(Core::new(
        registry,
        audit,
        RouterOptions::from(&config.routing),
    )?);

    supervisor.run(core).await
}

async fn send_remote(config: &Config, command: &str) -> CoreResult<()> {
    if !config.api.enabled {
        return Err(CoreError::InvalidInput(
            "the http front door is disabled in the config; enable `api` to control a running instance".to_string(),
        ));
    }

    let url = format!("http://{}:{}/trigger", config.api.host, config.api.port);
    let response = reqwest::Client::new()
        .post(&url)
        .bearer_auth(&config.secret)
        .json(&serde_json::json!({ "command": command }))
        .send()
        .await
        .map_err(|error| {
            CoreError::Internal(format!(
                "could not reach {url}: {error} (is steward running?)"
            ))
        })?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
        return Err(CoreError::Authentication(
            "the running instance rejected the configured secret".to_string(),
        ));
    }

    let reply: TriggerResponse = response
        .json()
        .await
        .map_err(|error| CoreError::Internal(format!("unexpected response: {error}")))?;
    println!("{}", reply.reply_text);

    match reply.error_kind {
        None => Ok(()),
        Some(FailureKind::Unrecognized) => Err(CoreError::InvalidInput(format!(
            "command not recognized: {command}"
        ))),
        Some(FailureKind::ExecutorFailure) => Err(CoreError::Internal(
            "the command failed on the running instance".to_string(),
        )),
    }
}
