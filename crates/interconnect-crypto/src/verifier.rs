//! Identity verifier - the scheme registry
//!
//! Schemes are registered through [`IdentityVerifierBuilder`] before the
//! verifier is built. A built verifier has no registration API: a scheme
//! added after startup could downgrade identities that already exist, so
//! the set is frozen for the life of the process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use interconnect_core::{
    validate_scheme, Identity, InterconnectError, InterconnectResult, ED25519_SCHEME,
    LOCAL_SCHEME, URL_SCHEME,
};

use crate::{DelegatedScheme, Ed25519, Ed25519Scheme, LocalScheme, SchemeKind, VerificationStrategy};

static GLOBAL: OnceLock<Arc<IdentityVerifier>> = OnceLock::new();

/// Proof that an identity passed its scheme's check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub identity: Identity,
    /// Strength of the check that was applied
    pub kind: SchemeKind,
}

/// Maps scheme names to verification strategies
pub struct IdentityVerifier {
    schemes: HashMap<String, Arc<dyn VerificationStrategy>>,
}

impl IdentityVerifier {
    pub fn builder() -> IdentityVerifierBuilder {
        IdentityVerifierBuilder::default()
    }

    /// `ed25519`, `url` and `local`
    pub fn with_defaults() -> Self {
        Self::from_config(&RegistryConfig::default())
            .unwrap_or_else(|_| IdentityVerifier { schemes: HashMap::new() })
    }

    /// Build from the persisted list of enabled schemes.
    ///
    /// Only builtin schemes can be named here; other cryptographic schemes
    /// need their algorithm plugged in through the builder.
    pub fn from_config(config: &RegistryConfig) -> InterconnectResult<Self> {
        let mut builder = Self::builder();
        for name in &config.schemes {
            builder = match name.as_str() {
                ED25519_SCHEME => builder.register(name, Ed25519Scheme::new(Ed25519))?,
                URL_SCHEME => builder.register(name, DelegatedScheme)?,
                LOCAL_SCHEME => builder.register(name, LocalScheme)?,
                other => return Err(InterconnectError::UnknownScheme(other.to_string())),
            };
        }
        Ok(builder.build())
    }

    /// Verify `signature` over `message` for `identity`.
    ///
    /// An unregistered scheme is rejected; it never falls back to a weaker one.
    pub fn verify(
        &self,
        identity: &Identity,
        message: &[u8],
        signature: Option<&[u8]>,
    ) -> InterconnectResult<Verified> {
        let strategy = self
            .schemes
            .get(identity.scheme())
            .ok_or_else(|| InterconnectError::UnknownScheme(identity.scheme().to_string()))?;

        strategy.verify(identity, message, signature)?;

        Ok(Verified {
            identity: identity.clone(),
            kind: strategy.kind(),
        })
    }

    /// How `scheme` establishes trust, if registered
    pub fn kind_of(&self, scheme: &str) -> Option<SchemeKind> {
        self.schemes.get(scheme).map(|s| s.kind())
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.schemes.contains_key(scheme)
    }

    /// Registered scheme names, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Snapshot of the enabled schemes for persistence
    pub fn to_config(&self) -> RegistryConfig {
        RegistryConfig {
            schemes: self.schemes().into_iter().map(str::to_string).collect(),
        }
    }

    /// Install as the process-wide verifier. Fails if one is already installed.
    pub fn install(self) -> InterconnectResult<Arc<IdentityVerifier>> {
        let verifier = Arc::new(self);
        GLOBAL
            .set(Arc::clone(&verifier))
            .map_err(|_| InterconnectError::RegistryAlreadyInstalled)?;
        tracing::info!(schemes = ?verifier.schemes(), "identity verifier installed");
        Ok(verifier)
    }

    /// The process-wide verifier, if installed
    pub fn global() -> Option<Arc<IdentityVerifier>> {
        GLOBAL.get().cloned()
    }
}

impl std::fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Collects schemes before the verifier is frozen
#[derive(Default)]
pub struct IdentityVerifierBuilder {
    schemes: HashMap<String, Arc<dyn VerificationStrategy>>,
}

impl IdentityVerifierBuilder {
    /// Register `strategy` under `scheme`; names are unique
    pub fn register(
        mut self,
        scheme: &str,
        strategy: impl VerificationStrategy + 'static,
    ) -> InterconnectResult<Self> {
        validate_scheme(scheme)
            .map_err(|_| InterconnectError::InvalidSchemeName(scheme.to_string()))?;
        if self.schemes.contains_key(scheme) {
            return Err(InterconnectError::SchemeAlreadyRegistered(scheme.to_string()));
        }
        self.schemes.insert(scheme.to_string(), Arc::new(strategy));
        Ok(self)
    }

    pub fn build(self) -> IdentityVerifier {
        IdentityVerifier {
            schemes: self.schemes,
        }
    }
}

/// Persisted list of schemes enabled at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub schemes: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            schemes: vec![
                ED25519_SCHEME.to_string(),
                URL_SCHEME.to_string(),
                LOCAL_SCHEME.to_string(),
            ],
        }
    }
}

impl RegistryConfig {
    pub fn load(path: &Path) -> InterconnectResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| InterconnectError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> InterconnectResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
