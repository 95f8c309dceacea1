use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::{compute_line_diff, render_diff, Engine};
use crate::server;
use crate::store::Store;

const DEFAULT_CONFIG_FILE: &str = "MangoDesk.toml";

#[derive(Parser)]
#[command(name = "mangodesk")]
#[command(about = "AI meeting-notes summaries with version history and email sharing")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show a line diff between two text files
    Diff {
        /// Earlier version
        previous: PathBuf,

        /// Later version
        current: PathBuf,

        /// Print the diff as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Create or upgrade the database schema
    Migrate,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config_path = self.config;

        match self.command {
            Commands::Serve { host, port } => {
                let mut config = load_config(config_path.as_deref())?;
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }

                let bind_address = config.bind_address();
                let engine = Engine::new(config)?;
                server::serve(engine, &bind_address).await?;
                Ok(())
            }
            Commands::Diff { previous, current, json } => {
                let output = diff_files(&previous, &current, json)?;
                print!("{}", output);
                Ok(())
            }
            Commands::Init { path, force } => {
                let target = init_config(path, force)?;
                info!("Wrote default configuration to {}", target.display());
                Ok(())
            }
            Commands::Migrate => {
                let config = load_config(config_path.as_deref())?;
                Store::open(&config.database.path).with_context(|| {
                    format!("Failed to migrate {}", config.database.path.display())
                })?;
                info!("✅ Database schema is up to date: {}", config.database.path.display());
                Ok(())
            }
        }
    }
}

/// Config file (or defaults) with environment overrides applied
fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load_or_default(path)?;
    config.apply_env()?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

fn diff_files(previous: &Path, current: &Path, json: bool) -> Result<String> {
    let previous_text = std::fs::read_to_string(previous)
        .with_context(|| format!("Failed to read {}", previous.display()))?;
    let current_text = std::fs::read_to_string(current)
        .with_context(|| format!("Failed to read {}", current.display()))?;

    let diff = compute_line_diff(&previous_text, &current_text);
    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(&diff)?))
    } else {
        Ok(render_diff(&diff))
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let dir = match path {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&dir)?;

    let target = dir.join(DEFAULT_CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }

    Config::default().save(&target)?;
    Ok(target)
}
