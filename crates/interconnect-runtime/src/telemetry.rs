//! Tracing subscriber setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interconnect_core::{InterconnectError, InterconnectResult};

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, for development
    #[default]
    Pretty,
    /// One JSON object per event, for log collectors
    Json,
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> InterconnectResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| InterconnectError::Config(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| InterconnectError::Config(e.to_string()))?;

    tracing::debug!(?format, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_fails() {
        // The first call may lose to another test in this binary
        let _ = init_tracing(LogFormat::Json);
        assert!(matches!(
            init_tracing(LogFormat::Pretty),
            Err(InterconnectError::Config(_))
        ));
    }
}
