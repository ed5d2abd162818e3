//! Chain catalog
//!
//! Static, read-only description of every chain the supervisor can manage.
//! Position 0 is the overview pseudo-entry, position 1 the mainchain, and
//! every later position a sidechain. Roles are fixed at load time.

mod descriptor;

pub use descriptor::{ChainDescriptor, ChainRole};

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

const BUNDLED_CATALOG: &str = include_str!("../../data/chain_data.json");

/// Catalog index of the overview pseudo-entry
pub const OVERVIEW_INDEX: usize = 0;
/// Catalog index of the mainchain
pub const MAINCHAIN_INDEX: usize = 1;

/// Ordered, immutable list of chain descriptors
#[derive(Debug, Clone)]
pub struct Catalog {
    chains: Vec<ChainDescriptor>,
}

impl Catalog {
    /// Parse and validate a catalog payload
    pub fn load(bytes: &[u8]) -> Result<Self, ConfigError> {
        let mut chains: Vec<ChainDescriptor> = serde_json::from_slice(bytes)?;

        if chains.len() <= MAINCHAIN_INDEX {
            return Err(ConfigError::InvalidCatalog(format!(
                "expected at least an overview and a mainchain entry, found {}",
                chains.len()
            )));
        }

        for (index, chain) in chains.iter_mut().enumerate() {
            chain.role = ChainRole::for_position(index);
        }

        let mut ids = HashSet::new();
        let mut slots = HashSet::new();
        for chain in &chains {
            if chain.id.trim().is_empty() {
                return Err(ConfigError::InvalidCatalog(format!(
                    "entry {:?} has an empty id",
                    chain.name
                )));
            }
            if !ids.insert(chain.id.as_str()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "duplicate chain id {:?}",
                    chain.id
                )));
            }
            if chain.role == ChainRole::Overview {
                continue;
            }
            if chain.port == 0 {
                return Err(ConfigError::InvalidCatalog(format!(
                    "chain {:?} needs a non-zero rpc port",
                    chain.id
                )));
            }
            if chain.bin.trim().is_empty() {
                return Err(ConfigError::InvalidCatalog(format!(
                    "chain {:?} has no executable",
                    chain.id
                )));
            }
            if chain.role == ChainRole::Sidechain && !slots.insert(chain.slot) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "sidechain {:?} reuses slot {}",
                    chain.id, chain.slot
                )));
            }
        }

        Ok(Self { chains })
    }

    /// The catalog compiled into the binary
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::load(BUNDLED_CATALOG.as_bytes())
    }

    /// Load a catalog file from disk
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&bytes)
    }

    /// Index of the chain with this identity
    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.chains.iter().position(|chain| chain.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&ChainDescriptor> {
        self.chains.get(index)
    }

    pub fn by_id(&self, id: &str) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|chain| chain.id == id)
    }

    pub fn mainchain(&self) -> &ChainDescriptor {
        &self.chains[MAINCHAIN_INDEX]
    }

    pub fn sidechains(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains
            .iter()
            .filter(|chain| chain.role == ChainRole::Sidechain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, port: &str, slot: u32) -> String {
        format!(
            r#"{{"id":"{id}","name":"{id}","description":"","regtest":true,"bin":"{id}-qt",
                "port":"{port}","rpc_user":"user","rpc_password":"pass","slot":{slot},"version":"1"}}"#
        )
    }

    fn catalog_json(entries: &[String]) -> Vec<u8> {
        format!("[{}]", entries.join(",")).into_bytes()
    }

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = Catalog::bundled().unwrap();
        assert_eq!(catalog.get(OVERVIEW_INDEX).unwrap().role, ChainRole::Overview);
        assert_eq!(catalog.mainchain().role, ChainRole::Mainchain);
        assert_eq!(catalog.mainchain().id, "drivechain");
        assert!(catalog.sidechains().count() >= 1);
    }

    #[test]
    fn test_roles_follow_position() {
        let bytes = catalog_json(&[
            entry("overview", "0", 0),
            entry("drivechain", "9000", 0),
            entry("alpha", "9001", 2),
            entry("beta", "9002", 3),
        ]);
        let catalog = Catalog::load(&bytes).unwrap();

        assert_eq!(catalog.lookup("alpha"), Some(2));
        assert_eq!(catalog.lookup("missing"), None);
        assert_eq!(catalog.get(2).unwrap().role, ChainRole::Sidechain);
        assert_eq!(catalog.mainchain().port, 9000);
        let sidechains: Vec<_> = catalog.sidechains().map(|c| c.id.as_str()).collect();
        assert_eq!(sidechains, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_rejects_unparseable_payload() {
        let err = Catalog::load(b"{not json").unwrap_err();
        assert!(matches!(err, ConfigError::CatalogParse(_)));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let bytes = catalog_json(&[
            entry("overview", "0", 0),
            entry("drivechain", "9000", 0),
            entry("drivechain", "9001", 2),
        ]);
        let err = Catalog::load(&bytes).unwrap_err();
        assert!(err.to_string().contains("duplicate chain id"));
    }

    #[test]
    fn test_rejects_shared_sidechain_slot() {
        let bytes = catalog_json(&[
            entry("overview", "0", 0),
            entry("drivechain", "9000", 0),
            entry("alpha", "9001", 2),
            entry("beta", "9002", 2),
        ]);
        let err = Catalog::load(&bytes).unwrap_err();
        assert!(err.to_string().contains("reuses slot 2"));
    }

    #[test]
    fn test_mainchain_slot_does_not_collide_with_sidechains() {
        let bytes = catalog_json(&[
            entry("overview", "0", 0),
            entry("drivechain", "9000", 0),
            entry("alpha", "9001", 0),
        ]);
        assert!(Catalog::load(&bytes).is_ok());
    }

    #[test]
    fn test_requires_mainchain_entry() {
        let bytes = catalog_json(&[entry("overview", "0", 0)]);
        assert!(matches!(
            Catalog::load(&bytes).unwrap_err(),
            ConfigError::InvalidCatalog(_)
        ));
    }
}
