//! Import policy: an ordered rule list declared by a destination

use serde::{Deserialize, Serialize};

use crate::{FieldPath, Predicate, Rule};

/// Admission rules a destination applies to every incoming passport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPolicy {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl ImportPolicy {
    /// An empty policy. With no accept-if rule it admits nothing.
    pub fn new(name: impl Into<String>) -> Self {
        ImportPolicy {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn accept_if(mut self, predicate: Predicate) -> Self {
        self.rules.push(Rule::AcceptIf(predicate));
        self
    }

    /// Admit anything no reject-if rule catches
    pub fn accept_any(self) -> Self {
        self.accept_if(Predicate::Always)
    }

    pub fn reject_if(mut self, predicate: Predicate, reason: impl Into<String>) -> Self {
        self.rules.push(Rule::RejectIf {
            when: predicate,
            reason: reason.into(),
        });
        self
    }

    pub fn strip_field(mut self, path: FieldPath) -> Self {
        self.rules.push(Rule::StripField(path));
        self
    }

    pub fn accept_rules(&self) -> impl Iterator<Item = &Predicate> {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::AcceptIf(p) => Some(p),
            _ => None,
        })
    }

    pub fn strip_rules(&self) -> impl Iterator<Item = &FieldPath> {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::StripField(path) => Some(path),
            _ => None,
        })
    }
}
