//! Predicates and rules
//!
//! Rules serialize as externally tagged JSON:
//!
//! ```json
//! {"reject_if": {"when": {"compare": {"path": "payload.age_days", "op": "lt", "value": 30}},
//!                "reason": "account too new"}}
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FieldPath;

/// Comparison operator for [`Predicate::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Comparison::Ne, None) => true,
            (_, None) => false,
            (Comparison::Eq, Some(o)) => o == Ordering::Equal,
            (Comparison::Ne, Some(o)) => o != Ordering::Equal,
            (Comparison::Lt, Some(o)) => o == Ordering::Less,
            (Comparison::Le, Some(o)) => o != Ordering::Greater,
            (Comparison::Gt, Some(o)) => o == Ordering::Greater,
            (Comparison::Ge, Some(o)) => o != Ordering::Less,
        }
    }
}

/// Order two JSON values of the same kind. Numbers compare by value
/// regardless of integer/float representation.
fn compare_values(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

/// A test against an interpreted passport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Always,
    Exists(FieldPath),
    Missing(FieldPath),
    /// The field is present and compares against `value`. A missing field
    /// matches nothing.
    Compare {
        path: FieldPath,
        op: Comparison,
        value: Value,
    },
    OneOf {
        path: FieldPath,
        values: Vec<Value>,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Exists(path) => path.lookup(payload).is_some(),
            Predicate::Missing(path) => path.lookup(payload).is_none(),
            Predicate::Compare { path, op, value } => path
                .lookup(payload)
                .is_some_and(|field| op.holds(compare_values(field, value))),
            Predicate::OneOf { path, values } => path.lookup(payload).is_some_and(|field| {
                values
                    .iter()
                    .any(|v| compare_values(field, v) == Some(Ordering::Equal))
            }),
            Predicate::All(all) => all.iter().all(|p| p.matches(payload)),
            Predicate::Any(any) => any.iter().any(|p| p.matches(payload)),
            Predicate::Not(inner) => !inner.matches(payload),
        }
    }

    pub fn exists(path: FieldPath) -> Self {
        Predicate::Exists(path)
    }

    pub fn compare(path: FieldPath, op: Comparison, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            path,
            op,
            value: value.into(),
        }
    }

    pub fn equals(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Eq, value)
    }

    pub fn lt(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Lt, value)
    }

    pub fn ge(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Ge, value)
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

/// One admission rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Must hold for the passport to be admitted
    AcceptIf(Predicate),
    /// Rejects with `reason` when it holds
    RejectIf { when: Predicate, reason: String },
    /// Removed from the interpreted value on admission
    StripField(FieldPath),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_comparison_ignores_representation() {
        let payload = json!({"age_days": 30});
        assert!(Predicate::equals(path("age_days"), 30.0).matches(&payload));
        assert!(Predicate::ge(path("age_days"), 30).matches(&payload));
        assert!(!Predicate::lt(path("age_days"), 30).matches(&payload));
    }

    #[test]
    fn test_missing_field_matches_no_comparison() {
        let payload = json!({});
        assert!(!Predicate::lt(path("age_days"), 30).matches(&payload));
        assert!(!Predicate::ge(path("age_days"), 30).matches(&payload));
        assert!(Predicate::Missing(path("age_days")).matches(&payload));
    }

    #[test]
    fn test_mismatched_kinds() {
        let payload = json!({"age_days": "ten"});
        assert!(!Predicate::lt(path("age_days"), 30).matches(&payload));
        assert!(Predicate::compare(path("age_days"), Comparison::Ne, 30).matches(&payload));
    }

    #[test]
    fn test_combinators() {
        let payload = json!({"realm": "eu", "level": 12});
        let p = Predicate::All(vec![
            Predicate::OneOf {
                path: path("realm"),
                values: vec![json!("eu"), json!("us")],
            },
            Predicate::lt(path("level"), 10).negate(),
        ]);
        assert!(p.matches(&payload));
        assert!(!Predicate::Any(vec![]).matches(&payload));
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = Rule::RejectIf {
            when: Predicate::lt(path("age_days"), 30),
            reason: "account too new".into(),
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({"reject_if": {
                "when": {"compare": {"path": "payload.age_days", "op": "lt", "value": 30}},
                "reason": "account too new"
            }})
        );
        let back: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(back, rule);

        let strip: Rule = serde_json::from_value(json!({"strip_field": "payload.secret"})).unwrap();
        assert_eq!(strip, Rule::StripField(path("secret")));
        let always: Predicate = serde_json::from_value(json!("always")).unwrap();
        assert_eq!(always, Predicate::Always);
    }
}
