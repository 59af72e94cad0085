mod config;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use config::ParleyConfig;
use parley_agent::Orchestrator;
use parley_gateway::GatewayServer;
use parley_sandbox::Sandbox;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version, about = "Session-scoped chat orchestration with a script sandbox")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "parley.toml", global = true)]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one message and print the reply
    Chat {
        /// Session identifier
        #[arg(short, long)]
        session: String,
        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Run a script through the sandbox
    Exec {
        /// Deadline in seconds (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Script file, or `-` for stdin
        file: PathBuf,
    },
}

/// Loads `path`, or `.env` from the working directory, into the process environment.
///
/// Must run before [`init_tracing`] so a `RUST_LOG` from the file takes effect.
fn load_env(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn build_orchestrator(config: &ParleyConfig) -> anyhow::Result<Orchestrator> {
    let orchestrator = Orchestrator::from_env().context("Invalid backend configuration")?;
    Ok(match &config.agent.system_prompt {
        Some(prompt) => orchestrator.with_system_prompt(prompt.clone()),
        None => orchestrator,
    })
}

async fn read_source(file: &PathBuf) -> anyhow::Result<String> {
    if file.as_os_str() == "-" {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .context("Failed to read script from stdin")?;
        Ok(source)
    } else {
        tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read script '{}'", file.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let env_file = load_env(None);
    init_tracing(cli.log_format);
    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = ParleyConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid listen address '{host}:{port}'"))?;

            let orchestrator = Arc::new(build_orchestrator(&config)?);
            let sandbox = Arc::new(Sandbox::new(config.sandbox.clone()));
            info!(
                provider = %orchestrator.provider(),
                interpreter = %config.sandbox.interpreter,
                "Starting parley gateway"
            );
            GatewayServer::serve(addr, orchestrator, sandbox).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Chat { session, message } => {
            let orchestrator = build_orchestrator(&config)?;
            let reply = orchestrator.chat(&message.join(" "), &session).await?;
            println!("{reply}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exec { timeout, file } => {
            let source = read_source(&file).await?;
            let sandbox = Sandbox::new(config.sandbox.clone());
            let result = match timeout {
                Some(secs) => sandbox.run(&source, Duration::from_secs(secs)).await,
                None => sandbox.run_default(&source).await,
            };
            println!("{}", result.output);
            if result.is_ok() {
                Ok(ExitCode::SUCCESS)
            } else {
                info!(status = %result.status, "Script did not succeed");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
