//! Authority states for content units
//!
//! Every server holds exactly one [`AuthorityState`] per content unit it
//! knows about. Across the federation a unit has exactly one authoritative
//! server at any instant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ServerRef;

/// Server-local view of who is authoritative for a content unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthorityState {
    /// This server computes and serves truth for the unit
    Active,
    /// Origin side of a delegation: remains source of truth, stops serving writes
    Delegated { to: ServerRef },
    /// Delegate side of a delegation
    DelegatedFrom { origin: ServerRef },
    /// Authority permanently left this server (terminal)
    Transferred { to: ServerRef },
    /// The authority this unit depends on stopped answering probes
    Unreachable,
    /// Read-only serving from the substrate cache
    Ghost,
}

impl AuthorityState {
    /// Short lowercase name, used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            AuthorityState::Active => "active",
            AuthorityState::Delegated { .. } => "delegated",
            AuthorityState::DelegatedFrom { .. } => "delegated_from",
            AuthorityState::Transferred { .. } => "transferred",
            AuthorityState::Unreachable => "unreachable",
            AuthorityState::Ghost => "ghost",
        }
    }

    /// `Transferred` is terminal: no event moves a unit out of it on this server
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthorityState::Transferred { .. })
    }

    /// Whether this server may accept writes for the unit
    #[inline]
    pub fn permits_writes(&self) -> bool {
        matches!(
            self,
            AuthorityState::Active | AuthorityState::DelegatedFrom { .. }
        )
    }

    /// Whether this server is the single authority (live or degraded)
    #[inline]
    pub fn is_authoritative(&self) -> bool {
        matches!(self, AuthorityState::Active | AuthorityState::Ghost)
    }

    /// Whether reads may be served locally
    #[inline]
    pub fn serves_reads(&self) -> bool {
        !matches!(
            self,
            AuthorityState::Transferred { .. } | AuthorityState::Unreachable
        )
    }

    /// States watched by the liveness probe
    #[inline]
    pub fn is_probed(&self) -> bool {
        matches!(
            self,
            AuthorityState::Active | AuthorityState::Unreachable | AuthorityState::Ghost
        )
    }
}

impl fmt::Display for AuthorityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityState::Delegated { to } => write!(f, "delegated(to={})", to),
            AuthorityState::DelegatedFrom { origin } => {
                write!(f, "delegated_from(origin={})", origin)
            }
            AuthorityState::Transferred { to } => write!(f, "transferred(to={})", to),
            other => f.write_str(other.name()),
        }
    }
}

/// A recorded state change, handed to authority-change hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityChange {
    pub old: Option<AuthorityState>,
    pub new: Option<AuthorityState>,
}

impl AuthorityChange {
    pub fn new(old: Option<AuthorityState>, new: Option<AuthorityState>) -> Self {
        AuthorityChange { old, new }
    }
}
