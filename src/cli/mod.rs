//! Switchboard CLI
//!
//! Commands:
//! - `switchboard run` - Supervise nodes with an interactive shell
//! - `switchboard chains` - List the chain catalog
//! - `switchboard rpc` - One-shot JSON-RPC call against a node

pub mod output;
pub mod rpc;
pub mod shell;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

/// Local mainchain and sidechain node supervisor
#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(author, version, about = "Launch and supervise a local mainchain and its sidechains")]
pub struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, global = true, default_value = "config", env = "SWITCHBOARD_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Managed directory with node executables and chain data
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Chain catalog file to use instead of the bundled one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the poll loop and read commands from an interactive shell
    Run {
        /// Chains to launch at startup, in order
        #[arg(long = "launch", value_name = "CHAIN")]
        launch: Vec<String>,

        /// Run headless until a signal arrives
        #[arg(long)]
        no_shell: bool,

        /// Serve /health and /status on this port
        #[arg(long)]
        status_port: Option<u16>,
    },

    /// List the chains in the catalog
    Chains {
        #[arg(long)]
        json: bool,
    },

    /// Call an RPC method on a node
    Rpc {
        /// Chain id from the catalog
        chain: String,
        method: String,
        /// Parameters, parsed as JSON where possible
        #[arg(allow_hyphen_values = true)]
        params: Vec<String>,
    },
}

impl Cli {
    /// Command-line flags win over files and environment
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(home) = &self.home {
            config.paths.home = Some(home.clone());
        }
        if let Some(catalog) = &self.catalog {
            config.paths.catalog = Some(catalog.clone());
        }
        if let Commands::Run {
            status_port: Some(port),
            ..
        } = &self.command
        {
            config.status_port = Some(*port);
        }
    }
}
