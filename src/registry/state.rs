use serde::{Deserialize, Serialize};

/// Lifecycle of a launched chain. There is no failure state: a dead process
/// is removed from the registry instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Created, not yet polled
    #[default]
    Unknown,
    /// Process started, RPC not confirmed responsive
    Waiting,
    /// RPC answered on the last poll
    Running,
}

impl Lifecycle {
    /// State after an RPC probe. The first success promotes; a failure only
    /// demotes a chain that was running.
    pub fn after_probe(self, responsive: bool) -> Lifecycle {
        match (self, responsive) {
            (_, true) => Lifecycle::Running,
            (Lifecycle::Running, false) => Lifecycle::Waiting,
            (state, false) => state,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Lifecycle::Running)
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Unknown => write!(f, "unknown"),
            Lifecycle::Waiting => write!(f, "waiting"),
            Lifecycle::Running => write!(f, "running"),
        }
    }
}

/// Runtime status of one launched chain
#[derive(Debug)]
pub struct ChainRuntimeState<H> {
    pub id: String,
    pub lifecycle: Lifecycle,
    /// Send `refreshbmm` on every successful poll
    pub auto_mine: bool,
    pub process: H,
    /// Distinguishes successive launches of the same chain
    pub launch_seq: u64,
    /// Block count from the last successful probe
    pub block_count: Option<u64>,
}

impl<H> ChainRuntimeState<H> {
    /// Freshly launched chain: waiting for its first answer, auto-mine on
    pub fn launched(id: impl Into<String>, process: H, launch_seq: u64) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::Waiting,
            auto_mine: true,
            process,
            launch_seq,
            block_count: None,
        }
    }
}
