use serde::{Deserialize, Deserializer, Serialize};

/// What a catalog entry stands for, decided once from its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    /// Pseudo-entry with no process behind it
    Overview,
    Mainchain,
    #[default]
    Sidechain,
}

impl ChainRole {
    pub(crate) fn for_position(index: usize) -> Self {
        match index {
            super::OVERVIEW_INDEX => ChainRole::Overview,
            super::MAINCHAIN_INDEX => ChainRole::Mainchain,
            _ => ChainRole::Sidechain,
        }
    }
}

impl std::fmt::Display for ChainRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainRole::Overview => write!(f, "overview"),
            ChainRole::Mainchain => write!(f, "mainchain"),
            ChainRole::Sidechain => write!(f, "sidechain"),
        }
    }
}

/// One manageable chain: identity, network parameters and RPC credentials
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Run the node in regression-test mode
    pub regtest: bool,
    /// Executable name inside the managed directory
    pub bin: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    pub rpc_user: String,
    #[serde(skip_serializing)]
    pub rpc_password: String,
    /// Registration slot on the mainchain
    pub slot: u32,
    #[serde(default)]
    pub version: String,
    #[serde(skip_deserializing)]
    pub role: ChainRole,
}

impl ChainDescriptor {
    pub fn is_sidechain(&self) -> bool {
        self.role == ChainRole::Sidechain
    }
}

// Custom Debug to never leak rpc_password into logs or error messages.
impl std::fmt::Debug for ChainDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("regtest", &self.regtest)
            .field("bin", &self.bin)
            .field("port", &self.port)
            .field("rpc_user", &self.rpc_user)
            .field("rpc_password", &"[REDACTED]")
            .field("slot", &self.slot)
            .field("version", &self.version)
            .finish()
    }
}

/// Upstream catalogs store the port as a string.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}
