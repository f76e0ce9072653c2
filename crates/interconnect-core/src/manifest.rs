//! Server manifests and client connection states

use serde::{Deserialize, Serialize};

use crate::Identity;

/// Metadata key naming the import policy a server applies at its border
pub const IMPORT_POLICY_KEY: &str = "import_policy";

/// Manifest describing a server's capabilities and requirements.
///
/// The schema of `metadata` belongs to the application; the core reads only
/// the `import_policy` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Server's identity (for verification)
    pub identity: Identity,
    /// Human-readable server name
    pub name: String,
    /// Substrate hash (if applicable)
    #[serde(default)]
    pub substrate: Option<String>,
    /// Additional metadata (app-defined)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Manifest {
    pub fn new(identity: Identity, name: impl Into<String>) -> Self {
        Manifest {
            identity,
            name: name.into(),
            substrate: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_substrate(mut self, hash: impl Into<String>) -> Self {
        self.substrate = Some(hash.into());
        self
    }

    /// Name the import policy this server applies at its border
    pub fn with_import_policy(mut self, policy: impl Into<String>) -> Self {
        if !self.metadata.is_object() {
            self.metadata = serde_json::Value::Object(Default::default());
        }
        if let Some(map) = self.metadata.as_object_mut() {
            map.insert(
                IMPORT_POLICY_KEY.to_string(),
                serde_json::Value::String(policy.into()),
            );
        }
        self
    }

    /// The import policy named by this manifest, if any
    pub fn import_policy(&self) -> Option<&str> {
        self.metadata.get(IMPORT_POLICY_KEY)?.as_str()
    }
}

/// Client-facing connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Establishing connection
    Connecting,
    /// Receiving initial state
    Syncing,
    /// Normal operation
    Live,
    /// Authority lost, read-only mode
    Ghost,
}
