use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the node supervisor
#[derive(Error, Debug)]
pub enum SwitchboardError {
    // Process lifecycle errors
    #[error("Launch failed: {0}")]
    Launch(#[from] LaunchError),

    // Node communication errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("{flow} failed: {reason}")]
    Protocol { flow: &'static str, reason: String },

    // Command errors
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Chain {0} cannot be launched")]
    NotLaunchable(String),

    #[error("Chain {0} is already launched")]
    AlreadyLaunched(String),

    #[error("Mainchain must be running before {0} can be launched")]
    MainchainNotRunning(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for SwitchboardError
pub type Result<T> = std::result::Result<T, SwitchboardError>;

impl SwitchboardError {
    pub fn protocol(flow: &'static str, reason: impl Into<String>) -> Self {
        SwitchboardError::Protocol {
            flow,
            reason: reason.into(),
        }
    }
}

/// Errors that make the supervisor unable to start
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("catalog does not parse: {0}")]
    CatalogParse(#[from] serde_json::Error),

    #[error("cannot read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("cannot determine home directory")]
    NoHomeDir,
}

/// Errors starting a node process
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("executable not found: {0}")]
    MissingExecutable(PathBuf),

    #[error("cannot spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// JSON-RPC failures. Routine while a node is still starting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("unexpected HTTP status {status}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    BadStatus { status: u16, message: Option<String> },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors sending the kill signal to a node
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminateError {
    #[error("process {pid} is not running")]
    NotRunning { pid: u32 },

    #[error("cannot signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

impl TerminateError {
    /// Whether the process was already gone; callers treat this as success.
    pub fn is_already_gone(&self) -> bool {
        matches!(self, TerminateError::NotRunning { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_status_display_includes_node_message() {
        let err = RpcError::BadStatus {
            status: 500,
            message: Some("Sidechain slot already in use".into()),
        };
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 500: Sidechain slot already in use"
        );

        let bare = RpcError::BadStatus {
            status: 401,
            message: None,
        };
        assert_eq!(bare.to_string(), "unexpected HTTP status 401");
    }

    #[test]
    fn test_protocol_error_names_flow() {
        let err = SwitchboardError::protocol("deposit", "getdepositaddress: node unreachable");
        assert_eq!(err.to_string(), "deposit failed: getdepositaddress: node unreachable");
    }
}
