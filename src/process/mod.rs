//! Node process lifecycle
//!
//! Starting nodes with chain-specific arguments, force-killing them, and
//! checking liveness against the OS process table rather than anything the
//! supervisor recorded itself.

mod layout;
mod proc_table;
mod supervisor;

pub use layout::{InstallLayout, NODE_LOG_FILE};
pub use proc_table::ProcessFingerprint;
pub use supervisor::{launch_args, NodeProcess, ProcessSupervisor};

use std::path::Path;

use crate::catalog::ChainDescriptor;
use crate::error::{LaunchError, TerminateError};

/// OS-level control over node processes
pub trait ProcessControl: Send + Sync {
    /// Owned handle of one launched node
    type Handle: Send;

    fn launch(&self, chain: &ChainDescriptor, data_dir: &Path)
        -> Result<Self::Handle, LaunchError>;

    /// Send a forced kill. `TerminateError::NotRunning` means already gone.
    fn terminate(&self, handle: &mut Self::Handle) -> Result<(), TerminateError>;

    /// Query the OS, not cached state, for whether the process still runs
    fn is_alive(&self, handle: &mut Self::Handle) -> bool;

    fn pid(&self, handle: &Self::Handle) -> Option<u32>;
}
