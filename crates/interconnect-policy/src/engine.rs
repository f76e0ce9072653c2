//! Import policy evaluation
//!
//! Order of evaluation:
//! 1. reject-if rules in declaration order; the first that holds decides
//! 2. every accept-if rule must hold; a policy without one admits nothing
//! 3. strip-field rules run on the admitted value
//!
//! Stripping mutates the interpreted value only. The signed passport bytes
//! were verified before evaluation and are never touched.

use serde_json::Value;

use interconnect_core::{InterconnectError, InterconnectResult};

use crate::{ImportPolicy, Rule};

/// Outcome of evaluating a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Admit,
    Reject(String),
    /// Admitted after removing the listed fields
    AdmitStripped(Vec<String>),
}

impl PolicyDecision {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, PolicyDecision::Reject(_))
    }

    /// Fields removed on admission
    pub fn stripped(&self) -> &[String] {
        match self {
            PolicyDecision::AdmitStripped(fields) => fields,
            _ => &[],
        }
    }

    /// `PolicyRejected` for a rejection
    pub fn into_result(self) -> InterconnectResult<Vec<String>> {
        match self {
            PolicyDecision::Admit => Ok(Vec::new()),
            PolicyDecision::AdmitStripped(fields) => Ok(fields),
            PolicyDecision::Reject(reason) => Err(InterconnectError::PolicyRejected(reason)),
        }
    }
}

/// Stateless evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportPolicyEngine;

impl ImportPolicyEngine {
    pub fn new() -> Self {
        ImportPolicyEngine
    }

    /// Evaluate `policy` against an interpreted passport, stripping fields
    /// from `payload` when it is admitted
    pub fn evaluate(&self, policy: &ImportPolicy, payload: &mut Value) -> PolicyDecision {
        for rule in &policy.rules {
            if let Rule::RejectIf { when, reason } = rule {
                if when.matches(payload) {
                    tracing::debug!(policy = %policy.name, %reason, "reject-if matched");
                    return PolicyDecision::Reject(reason.clone());
                }
            }
        }

        let mut accept_rules = policy.accept_rules().peekable();
        if accept_rules.peek().is_none() {
            return PolicyDecision::Reject(format!("policy `{}` admits nothing", policy.name));
        }
        if let Some(position) = accept_rules.position(|p| !p.matches(payload)) {
            tracing::debug!(policy = %policy.name, rule = position, "accept-if not satisfied");
            return PolicyDecision::Reject(format!(
                "accept-if rule {} of policy `{}` not satisfied",
                position, policy.name
            ));
        }

        let stripped: Vec<String> = policy
            .strip_rules()
            .filter_map(|path| path.remove(payload).map(|_| path.to_string()))
            .collect();

        if stripped.is_empty() {
            PolicyDecision::Admit
        } else {
            PolicyDecision::AdmitStripped(stripped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldPath, Predicate};
    use proptest::prelude::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn veterans_only() -> ImportPolicy {
        ImportPolicy::new("veterans")
            .accept_if(Predicate::exists(path("age_days")))
            .reject_if(Predicate::lt(path("payload.age_days"), 30), "account too new")
    }

    #[test]
    fn test_age_gate() {
        let engine = ImportPolicyEngine::new();
        let policy = veterans_only();

        let mut young = json!({"age_days": 10});
        assert_eq!(
            engine.evaluate(&policy, &mut young),
            PolicyDecision::Reject("account too new".into())
        );

        let mut old = json!({"age_days": 45});
        assert_eq!(engine.evaluate(&policy, &mut old), PolicyDecision::Admit);
    }

    #[test]
    fn test_first_reject_wins() {
        let policy = ImportPolicy::new("p")
            .accept_any()
            .reject_if(Predicate::exists(path("a")), "first")
            .reject_if(Predicate::exists(path("b")), "second");
        let mut payload = json!({"a": 1, "b": 2});
        assert_eq!(
            ImportPolicyEngine.evaluate(&policy, &mut payload),
            PolicyDecision::Reject("first".into())
        );
    }

    #[test]
    fn test_accept_rules_are_anded() {
        let policy = ImportPolicy::new("p")
            .accept_if(Predicate::exists(path("a")))
            .accept_if(Predicate::exists(path("b")));

        let mut both = json!({"a": 1, "b": 2});
        assert!(ImportPolicyEngine.evaluate(&policy, &mut both).is_admitted());

        let mut one = json!({"a": 1});
        assert!(!ImportPolicyEngine.evaluate(&policy, &mut one).is_admitted());
    }

    #[test]
    fn test_default_reject() {
        let mut payload = json!({"anything": true});
        let empty = ImportPolicy::new("empty");
        assert!(!ImportPolicyEngine.evaluate(&empty, &mut payload).is_admitted());

        let deny_list_only = ImportPolicy::new("deny").reject_if(Predicate::exists(path("x")), "x");
        assert!(!ImportPolicyEngine.evaluate(&deny_list_only, &mut payload).is_admitted());
    }

    #[test]
    fn test_strip_only_on_admit() {
        let policy = ImportPolicy::new("p")
            .accept_if(Predicate::exists(path("name")))
            .strip_field(path("inventory.contraband"))
            .strip_field(path("absent"));

        let mut payload = json!({"name": "ann", "inventory": {"contraband": 3, "gold": 5}});
        let decision = ImportPolicyEngine.evaluate(&policy, &mut payload);
        assert_eq!(
            decision,
            PolicyDecision::AdmitStripped(vec!["payload.inventory.contraband".into()])
        );
        assert_eq!(payload, json!({"name": "ann", "inventory": {"gold": 5}}));

        let mut rejected = json!({"inventory": {"contraband": 3}});
        assert!(!ImportPolicyEngine.evaluate(&policy, &mut rejected).is_admitted());
        assert_eq!(rejected, json!({"inventory": {"contraband": 3}}));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            PolicyDecision::Reject("no".into()).into_result(),
            Err(InterconnectError::PolicyRejected("no".into()))
        );
        assert_eq!(
            PolicyDecision::AdmitStripped(vec!["payload.x".into()]).into_result(),
            Ok(vec!["payload.x".to_string()])
        );
    }

    proptest! {
        #[test]
        fn test_age_threshold_is_exact(age in 0u32..10_000) {
            let mut payload = json!({"age_days": age});
            let decision = ImportPolicyEngine.evaluate(&veterans_only(), &mut payload);
            prop_assert_eq!(decision.is_admitted(), age >= 30);
        }
    }
}
