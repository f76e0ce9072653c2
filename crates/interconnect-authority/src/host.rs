//! Callbacks the core needs from its host application

use async_trait::async_trait;
use serde_json::Value;

use interconnect_core::{AuthorityState, Identity, InterconnectError, InterconnectResult, UnitKey};
use interconnect_substrate::ContentHash;

/// The application side of the protocol
#[async_trait]
pub trait Host: Send + Sync {
    /// Give meaning to passport bytes for import-policy evaluation
    fn interpret(&self, passport: &[u8]) -> InterconnectResult<Value>;

    /// Liveness check for whatever the unit's authority depends on
    async fn is_reachable(&self, unit: &UnitKey) -> bool;

    fn on_authority_change(
        &self,
        _unit: &UnitKey,
        _old: Option<&AuthorityState>,
        _new: Option<&AuthorityState>,
    ) {
    }

    /// A passport was admitted; `value` has had stripped fields removed
    fn on_admitted(&self, _unit: &UnitKey, _identity: &Identity, _value: &Value) {}

    /// Substrate a unit can ghost from. `None` means any cached object will do.
    fn substrate_for(&self, _unit: &UnitKey) -> Option<Vec<ContentHash>> {
        None
    }
}

/// Interpret passport bytes as JSON
pub fn interpret_json(passport: &[u8]) -> InterconnectResult<Value> {
    serde_json::from_slice(passport)
        .map_err(|e| InterconnectError::InvalidWireFormat(format!("passport is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_json() {
        assert_eq!(interpret_json(br#"{"age_days": 45}"#).unwrap(), json!({"age_days": 45}));
        assert!(matches!(
            interpret_json(b"\xff\xfe"),
            Err(InterconnectError::InvalidWireFormat(_))
        ));
    }
}
