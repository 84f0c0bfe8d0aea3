//! CLI entry and dispatch.

use std::fs;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use weft_core::config::{self, Config, default_config_toml};

#[derive(Parser)]
#[command(name = "weft")]
#[command(version = "0.1")]
#[command(about = "Multi-connection chat client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Connect to this server on startup (in addition to configured ones)
    #[arg(long, value_name = "HOST")]
    server: Option<String>,

    /// Nick override for this run
    #[arg(long)]
    nick: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Inspect or create the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Write a starter config file
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { command }) => run_config(&command),
        None => run_chat(cli.server, cli.nick),
    }
}

fn run_config(command: &ConfigCommands) -> Result<()> {
    let path = config::paths::config_path();
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init => {
            if path.exists() {
                bail!("config already exists at {}", path.display());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&path, default_config_toml())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Created config at {}", path.display());
            Ok(())
        }
    }
}

fn run_chat(server: Option<String>, nick: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(nick) = nick {
        config.nick = nick;
    }

    // Logs go to a file: the terminal belongs to the chat frontend.
    let _guard = init_tracing(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(crate::frontend::run(config, server))
}

fn init_tracing(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let home = config::paths::weft_home();
    fs::create_dir_all(&home).with_context(|| format!("failed to create {}", home.display()))?;
    let file = tracing_appender::rolling::never(&home, "weft.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_env("WEFT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
