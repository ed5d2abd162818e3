use std::path::{Path, PathBuf};

use crate::catalog::ChainDescriptor;

/// Node output is appended here inside each chain's data directory
pub const NODE_LOG_FILE: &str = "switchboard.log";

/// The managed directory: executables at the root, `data/<chain-id>/` below it
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_path(&self, chain: &ChainDescriptor) -> PathBuf {
        self.root.join(&chain.bin)
    }

    pub fn data_root(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn data_dir(&self, chain: &ChainDescriptor) -> PathBuf {
        self.data_root().join(&chain.id)
    }

    /// Create the managed directory if it does not exist yet
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}
