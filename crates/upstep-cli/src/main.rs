//! upstep CLI - inspect and repair migration checkpoints

mod commands;
mod store;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use upstep_config::{AppConfig, ConfigLoader, LogConfig, StoreBackend};

use crate::store::OpenedStore;

#[derive(Parser)]
#[command(name = "upstep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (YAML or TOML). Defaults to ~/.upstep/config.yml
    #[arg(long, global = true, env = "UPSTEP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured store backend
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Override the configured store path
    #[arg(long, global = true, env = "UPSTEP_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Override the configured key/value namespace
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the last applied migration version
    Status,
    /// Overwrite the checkpoint with a specific version
    Set {
        /// Version of the last migration considered applied
        #[arg(allow_negative_numbers = true)]
        version: i64,
    },
    /// Remove the checkpoint so all migrations run again
    Clear,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BackendArg {
    Sqlite,
    File,
    Memory,
}

impl From<BackendArg> for StoreBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sqlite => StoreBackend::Sqlite,
            BackendArg::File => StoreBackend::File,
            BackendArg::Memory => StoreBackend::Memory,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_root = data_root(cli.config.as_deref());
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_root.join("config.yml"));

    // Config decides the final log settings, so loading it logs through a
    // bootstrap subscriber built from RUST_LOG and the command line.
    let bootstrap = build_subscriber(&LogConfig::default().level, cli.log_json);
    let mut config = tracing::subscriber::with_default(bootstrap, || {
        ConfigLoader::load_or_default(&config_path)
    })
    .with_context(|| format!("failed to load {}", config_path.display()))?;
    apply_overrides(&mut config, &cli);

    tracing::subscriber::set_global_default(build_subscriber(
        &config.log.level,
        config.log.json,
    ))
    .context("failed to install log subscriber")?;

    let opened = OpenedStore::open(&config.store, &data_root)?;
    match cli.command {
        Commands::Status => commands::status(&opened),
        Commands::Set { version } => commands::set(&opened, version),
        Commands::Clear => commands::clear(&opened),
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(backend) = cli.backend {
        config.store.backend = backend.into();
    }
    if let Some(path) = &cli.store_path {
        config.store.path = Some(path.clone());
    }
    if let Some(namespace) = &cli.namespace {
        config.store.namespace = namespace.clone();
    }
    if cli.log_json {
        config.log.json = true;
    }
}

/// Directory holding config and data: the `--config` file's directory when
/// one is given, `~/.upstep` otherwise.
fn data_root(config: Option<&Path>) -> PathBuf {
    config
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| match config {
            Some(_) => PathBuf::from("."),
            None => ConfigLoader::default_config_dir(),
        })
}

fn build_subscriber(level: &str, json: bool) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}
