//! Authority lifecycle for a single content unit
//!
//! ```text
//!            delegate(to)               transfer_out accepted
//!   Active ---------------> Delegated   Active ----------------> Transferred
//!     ^  <--------------------'            |
//!     |        revoke                      | N failed probes
//!     |                                    v
//!     +------- probe succeeds -------- Unreachable --(substrate)--> Ghost
//!     +------- probe succeeds ---------------------------------------'
//! ```
//!
//! An outgoing transfer holds a pending marker with a deadline. The marker
//! is not a state: it blocks other transfers and delegations for the unit,
//! and any operation that finds it expired clears it.

use tokio::time::Instant;

use interconnect_core::{
    AuthorityChange, AuthorityState, CorrelationId, InterconnectError, InterconnectResult,
    ServerRef, UnitKey,
};

/// The in-flight outgoing transfer of a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub correlation: CorrelationId,
    pub destination: ServerRef,
    pub deadline: Instant,
}

impl PendingTransfer {
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Server-local authority record for one unit.
///
/// A vacant record (`state() == None`) is a unit this server holds no
/// authority view of; only incoming transfers, delegations and claims can
/// populate it.
#[derive(Debug, Clone)]
pub struct UnitAuthority {
    unit: UnitKey,
    state: Option<AuthorityState>,
    pending: Option<PendingTransfer>,
    failures: u32,
    changes: Vec<AuthorityChange>,
}

impl UnitAuthority {
    pub fn vacant(unit: UnitKey) -> Self {
        UnitAuthority {
            unit,
            state: None,
            pending: None,
            failures: 0,
            changes: Vec::new(),
        }
    }

    /// Record restored from storage
    pub fn restored(unit: UnitKey, state: AuthorityState) -> Self {
        UnitAuthority {
            state: Some(state),
            ..UnitAuthority::vacant(unit)
        }
    }

    pub fn unit(&self) -> &UnitKey {
        &self.unit
    }

    pub fn state(&self) -> Option<&AuthorityState> {
        self.state.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingTransfer> {
        self.pending.as_ref()
    }

    /// Consecutive failed probes
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Drain the transitions made since the last call
    pub fn take_changes(&mut self) -> Vec<AuthorityChange> {
        std::mem::take(&mut self.changes)
    }

    fn set_state(&mut self, new: Option<AuthorityState>) {
        if self.state != new {
            tracing::info!(
                unit = %self.unit,
                old = ?self.state.as_ref().map(AuthorityState::name),
                new = ?new.as_ref().map(AuthorityState::name),
                "authority transition"
            );
            self.changes.push(AuthorityChange::new(self.state.clone(), new.clone()));
            self.state = new;
        }
    }

    fn invalid(&self, event: &'static str) -> InterconnectError {
        match &self.state {
            Some(from) => InterconnectError::InvalidTransition {
                from: from.clone(),
                event,
            },
            None => InterconnectError::UnitNotFound(self.unit.clone()),
        }
    }

    /// Drop the pending marker if its deadline passed. Returns whether one was dropped.
    pub fn clear_expired(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some(pending) if pending.is_expired(now) => {
                tracing::warn!(
                    unit = %self.unit,
                    correlation = %pending.correlation,
                    "pending transfer expired, authority stays active"
                );
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    fn ensure_not_pending(&mut self, now: Instant) -> InterconnectResult<()> {
        self.clear_expired(now);
        if self.pending.is_some() {
            return Err(InterconnectError::TransferConflict(self.unit.clone()));
        }
        Ok(())
    }

    /// First authority assignment
    pub fn claim(&mut self) -> InterconnectResult<()> {
        if self.state.is_some() {
            return Err(self.invalid("claim"));
        }
        self.set_state(Some(AuthorityState::Active));
        Ok(())
    }

    /// Mark an outgoing transfer in flight
    pub fn begin_transfer(
        &mut self,
        destination: ServerRef,
        correlation: CorrelationId,
        deadline: Instant,
        now: Instant,
    ) -> InterconnectResult<()> {
        self.ensure_not_pending(now)?;
        if self.state != Some(AuthorityState::Active) {
            return Err(self.invalid("transfer_out"));
        }
        self.pending = Some(PendingTransfer {
            correlation,
            destination,
            deadline,
        });
        Ok(())
    }

    /// The destination acknowledged: authority leaves this server.
    ///
    /// Also commits when the marker already expired and nothing replaced
    /// it, since the destination's acknowledgement is final.
    pub fn commit_transfer(
        &mut self,
        correlation: CorrelationId,
        destination: ServerRef,
    ) -> InterconnectResult<()> {
        let ours = match &self.pending {
            Some(pending) => pending.correlation == correlation,
            None => self.state == Some(AuthorityState::Active),
        };
        if !ours {
            return Err(self.invalid("commit_transfer"));
        }
        self.pending = None;
        self.failures = 0;
        self.set_state(Some(AuthorityState::Transferred { to: destination }));
        Ok(())
    }

    /// Clear the marker for `correlation`. Returns false if it was not ours.
    pub fn rollback_transfer(&mut self, correlation: CorrelationId) -> bool {
        match &self.pending {
            Some(pending) if pending.correlation == correlation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Destination side of a transfer
    pub fn accept_transfer_in(&mut self) -> InterconnectResult<()> {
        match &self.state {
            None
            | Some(AuthorityState::Transferred { .. })
            | Some(AuthorityState::Unreachable)
            | Some(AuthorityState::Ghost) => {
                self.failures = 0;
                self.set_state(Some(AuthorityState::Active));
                Ok(())
            }
            Some(_) => Err(self.invalid("transfer_in")),
        }
    }

    /// Hand writes to `to` while staying the source of truth
    pub fn delegate(&mut self, to: ServerRef, now: Instant) -> InterconnectResult<()> {
        self.ensure_not_pending(now)?;
        if self.state != Some(AuthorityState::Active) {
            return Err(self.invalid("delegate"));
        }
        self.set_state(Some(AuthorityState::Delegated { to }));
        Ok(())
    }

    /// Origin side: take the delegation back
    pub fn revoke(&mut self) -> InterconnectResult<()> {
        if !matches!(self.state, Some(AuthorityState::Delegated { .. })) {
            return Err(self.invalid("revoke"));
        }
        self.set_state(Some(AuthorityState::Active));
        Ok(())
    }

    /// Delegate side: start serving writes on behalf of `origin`
    pub fn accept_delegation(&mut self, origin: ServerRef) -> InterconnectResult<()> {
        match &self.state {
            None | Some(AuthorityState::Transferred { .. }) => {
                self.set_state(Some(AuthorityState::DelegatedFrom { origin }));
                Ok(())
            }
            Some(_) => Err(self.invalid("accept_delegation")),
        }
    }

    /// Delegate side: `by` revoked the delegation. Only the origin may.
    pub fn end_delegation(&mut self, by: &ServerRef) -> InterconnectResult<()> {
        match &self.state {
            Some(AuthorityState::DelegatedFrom { origin }) if origin != by => {
                Err(InterconnectError::NotOrigin(origin.clone()))
            }
            Some(AuthorityState::DelegatedFrom { .. }) => {
                self.set_state(None);
                Ok(())
            }
            _ => Err(self.invalid("end_delegation")),
        }
    }

    /// A liveness probe failed.
    ///
    /// A live pending transfer counts as proof of liveness. Reaching
    /// `threshold` consecutive failures moves Active to Unreachable, and on to
    /// Ghost in the same step when substrate is available.
    pub fn probe_failed(&mut self, threshold: u32, substrate_present: bool, now: Instant) {
        self.clear_expired(now);
        if self.pending.is_some() {
            self.failures = 0;
            return;
        }

        match self.state {
            Some(AuthorityState::Active) => {
                self.failures += 1;
                if self.failures >= threshold.max(1) {
                    self.set_state(Some(AuthorityState::Unreachable));
                    if substrate_present {
                        self.set_state(Some(AuthorityState::Ghost));
                    }
                }
            }
            Some(AuthorityState::Unreachable) => {
                self.failures += 1;
                if substrate_present {
                    self.set_state(Some(AuthorityState::Ghost));
                }
            }
            Some(AuthorityState::Ghost) => self.failures += 1,
            _ => {}
        }
    }

    /// A liveness probe succeeded
    pub fn probe_succeeded(&mut self) {
        self.failures = 0;
        if matches!(
            self.state,
            Some(AuthorityState::Unreachable) | Some(AuthorityState::Ghost)
        ) {
            self.set_state(Some(AuthorityState::Active));
        }
    }
}
