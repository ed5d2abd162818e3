use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Port for the HTTP status sink (disabled when unset)
    #[serde(default)]
    pub status_port: Option<u16>,
    /// Interface the status sink listens on
    #[serde(default = "default_status_host")]
    pub status_host: IpAddr,
}

fn default_status_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Managed directory holding node executables and `data/<chain-id>/`
    #[serde(default)]
    pub home: Option<PathBuf>,
    /// Catalog file overriding the bundled chain list
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Health/sync poll period in milliseconds
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
        }
    }
}

/// Cross-chain protocol constants
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Mainchain block count below which sidechains are proposed and activated
    #[serde(default = "default_bootstrap_threshold")]
    pub bootstrap_threshold: u64,
    /// Blocks generated on the mainchain after proposing sidechains
    #[serde(default = "default_bootstrap_blocks")]
    pub bootstrap_blocks: u64,
    /// Fee passed to `refreshbmm`
    #[serde(default = "default_fee")]
    pub bmm_fee: f64,
    /// Fee passed to `createsidechaindeposit`
    #[serde(default = "default_fee")]
    pub deposit_fee: f64,
}

fn default_bootstrap_threshold() -> u64 {
    200
}

fn default_bootstrap_blocks() -> u64 {
    201
}

fn default_fee() -> f64 {
    0.001
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            bootstrap_threshold: default_bootstrap_threshold(),
            bootstrap_blocks: default_bootstrap_blocks(),
            bmm_fee: default_fee(),
            deposit_fee: default_fee(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Host the nodes listen on
    #[serde(default = "default_rpc_host")]
    pub host: String,
    /// JSON-RPC request id sent with every call
    #[serde(default = "default_request_id")]
    pub request_id: String,
}

fn default_rpc_host() -> String {
    "localhost".to_string()
}

fn default_request_id() -> String {
    "switchboard".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: default_rpc_host(),
            request_id: default_request_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            poll: PollConfig::default(),
            protocol: ProtocolConfig::default(),
            rpc: RpcConfig::default(),
            logging: LoggingConfig::default(),
            status_port: None,
            status_host: default_status_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("poll.interval_ms", 1000)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/ci.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SWITCHBOARD_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SWITCHBOARD_PATHS__HOME, etc.)
            .add_source(
                Environment::with_prefix("SWITCHBOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Managed directory, falling back to `~/.switchboard3`
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.paths
            .home
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".switchboard3")))
    }

    /// Listen address for the status sink, when enabled
    pub fn status_addr(&self) -> Option<SocketAddr> {
        self.status_port
            .map(|port| SocketAddr::new(self.status_host, port))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.poll.interval_ms == 0 {
            errors.push("poll.interval_ms must be positive".to_string());
        }

        if self.protocol.bootstrap_blocks < self.protocol.bootstrap_threshold {
            errors.push(format!(
                "protocol.bootstrap_blocks ({}) must reach bootstrap_threshold ({})",
                self.protocol.bootstrap_blocks, self.protocol.bootstrap_threshold
            ));
        }

        for (name, fee) in [
            ("bmm_fee", self.protocol.bmm_fee),
            ("deposit_fee", self.protocol.deposit_fee),
        ] {
            if !fee.is_finite() || fee < 0.0 {
                errors.push(format!("protocol.{name} must be a non-negative number"));
            }
        }

        if self.rpc.host.trim().is_empty() {
            errors.push("rpc.host must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
