//! Policy book: the import policies a server declares
//!
//! The manifest names the active policy through `metadata.import_policy`.
//! A server with no matching entry falls back to the book's default.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use interconnect_core::{InterconnectError, InterconnectResult, Manifest};

use crate::ImportPolicy;

/// Named import policies plus a fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyBook {
    #[serde(default)]
    pub policies: BTreeMap<String, ImportPolicy>,
    /// Used when the manifest names no policy or an unknown one
    pub default: ImportPolicy,
}

impl Default for PolicyBook {
    fn default() -> Self {
        PolicyBook::new(ImportPolicy::new("default"))
    }
}

impl PolicyBook {
    pub fn new(default: ImportPolicy) -> Self {
        PolicyBook {
            policies: BTreeMap::new(),
            default,
        }
    }

    pub fn with_policy(mut self, policy: ImportPolicy) -> Self {
        self.policies.insert(policy.name.clone(), policy);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ImportPolicy> {
        self.policies.get(name)
    }

    /// Policy selected by `manifest`, or the default
    pub fn select(&self, manifest: Option<&Manifest>) -> &ImportPolicy {
        let Some(name) = manifest.and_then(Manifest::import_policy) else {
            return &self.default;
        };
        match self.policies.get(name) {
            Some(policy) => policy,
            None => {
                tracing::warn!(policy = name, "manifest names an undeclared import policy, using default");
                &self.default
            }
        }
    }

    pub fn load(path: &Path) -> InterconnectResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| InterconnectError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> InterconnectResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
