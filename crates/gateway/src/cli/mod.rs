//! CLI surface (§6.2): `serve` (default), `run <task>`, `doctor`,
//! `config {show,validate}`. A REPL and a read-only admin inspector are
//! explicitly out of scope.

pub mod config_cmd;
pub mod doctor;
pub mod run;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sa_domain::config::Config;
use sa_domain::error::{Error as DomainError, Result as DomainResult};

#[derive(Debug, Parser)]
#[command(name = "orchestrator", version, about = "Persistent multi-source agent orchestration runtime")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the supervisor and HTTP front-end. The default when no
    /// subcommand is given.
    Serve,
    /// Run a single task to completion and print its final response.
    /// Exits with status 1 if the invocation ends `failed`.
    Run {
        /// The task description to hand to the agent.
        task: String,
    },
    /// Sanity-check configuration and store connectivity without starting
    /// the supervisor.
    Doctor,
    /// Inspect or validate the loaded configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (after env overrides) as TOML.
    Show,
    /// Run `Config::validate` and print any issues.
    Validate,
}

/// Load configuration from `path` (if it exists; a missing file falls back
/// to `Config::default()`), then apply the `ORCHESTRATOR_DB` /
/// `ORCHESTRATOR_MODEL` environment overrides (§6.3).
pub fn load_config(path: &std::path::Path) -> DomainResult<Config> {
    let mut config = if path.exists() {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| DomainError::Config(e.to_string()))?
    } else {
        Config::default()
    };

    if let Ok(db) = std::env::var("ORCHESTRATOR_DB") {
        config.paths.db = PathBuf::from(db);
    }
    if let Ok(model) = std::env::var("ORCHESTRATOR_MODEL") {
        config.models.default = model;
    }

    Ok(config)
}
