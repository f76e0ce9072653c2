//! Server configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use interconnect_authority::DEFAULT_LEDGER_CAPACITY;
use interconnect_core::{InterconnectError, InterconnectResult};
use interconnect_crypto::RegistryConfig;

use crate::LogFormat;

/// Interconnect server configuration
///
/// Durations are written the human way in the JSON file ("5s", "250ms").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name other servers use to reach this one
    pub name: String,
    /// How long the origin waits for a destination's answer
    #[serde(with = "duration_str")]
    pub transfer_timeout: Duration,
    /// Liveness probe period
    #[serde(with = "duration_str")]
    pub probe_interval: Duration,
    /// Consecutive failed probes before a unit is Unreachable
    pub unreachable_threshold: u32,
    /// Acknowledgements remembered for replayed transfers
    pub ledger_capacity: usize,
    /// Authority state file; in-memory when unset
    pub authority_file: Option<PathBuf>,
    /// Substrate directory; in-memory when unset
    pub substrate_dir: Option<PathBuf>,
    /// Identity schemes installed at startup
    pub registry: RegistryConfig,
    /// Policy book file
    pub policy_file: Option<PathBuf>,
    /// Import policy this server advertises in its manifest
    pub import_policy: Option<String>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: "interconnect".to_string(),
            transfer_timeout: Duration::from_secs(5),
            probe_interval: Duration::from_secs(1),
            unreachable_threshold: 3,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            authority_file: None,
            substrate_dir: None,
            registry: RegistryConfig::default(),
            policy_file: None,
            import_policy: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        ServerConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> InterconnectResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ServerConfig =
            serde_json::from_str(&text).map_err(|e| InterconnectError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> InterconnectResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> InterconnectResult<()> {
        if self.name.is_empty() {
            return Err(InterconnectError::Config("server name is empty".into()));
        }
        if !self.name.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(InterconnectError::Config(format!(
                "server name `{}` must be printable ascii without spaces",
                self.name
            )));
        }
        if self.transfer_timeout.is_zero() {
            return Err(InterconnectError::Config("transfer_timeout must be positive".into()));
        }
        if self.probe_interval.is_zero() {
            return Err(InterconnectError::Config("probe_interval must be positive".into()));
        }
        if self.unreachable_threshold == 0 {
            return Err(InterconnectError::Config(
                "unreachable_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
