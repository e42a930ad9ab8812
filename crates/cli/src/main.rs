mod config;
mod error;
mod sink;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::{Agent, RemoteToolHost, stream};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::Config;
use error::{Error, Result};
use sink::StdoutSink;

const CONFIG_FILE: &str = "chartwise.toml";

#[derive(Parser)]
#[command(name = "chartwise")]
#[command(about = "Answer data questions with charts, using remote data tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./chartwise.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tool provider endpoint, overriding tools.url
    #[arg(long, global = true)]
    tools_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one request and print each message as a JSON line
    Run {
        /// The question to answer
        prompt: String,
    },
    /// List the tools the provider offers
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { prompt } => cmd_run(&config, cli.tools_url.as_deref(), prompt).await,
        Commands::Tools => cmd_tools(&config, cli.tools_url.as_deref()).await,
    }
}

async fn cmd_run(config: &Config, tools_url: Option<&str>, prompt: String) -> Result<()> {
    let backend = config.backend()?;
    let tools = RemoteToolHost::new(config.tool_client(tools_url)?);
    let session_id = Uuid::new_v4().to_string();
    let agent = Agent::new(Arc::new(backend), Arc::new(tools), config.agent()?);

    info!(session = %session_id, model = %config.backend.model, "starting run");
    stream::run(agent, prompt, session_id, Arc::new(StdoutSink::new())).await?;
    Ok(())
}

async fn cmd_tools(config: &Config, tools_url: Option<&str>) -> Result<()> {
    let client = toolwire::Client::new(config.tool_client(tools_url)?);
    let tools = client.session().list_tools().await?;

    if tools.is_empty() {
        println!("No tools offered.");
        return Ok(());
    }

    for tool in tools {
        match tool.description.as_deref() {
            Some(description) => println!("{:<24}  {description}", tool.name),
            None => println!("{}", tool.name),
        }
    }
    Ok(())
}

/// An explicit `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if !path.exists() => Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        }),
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}
