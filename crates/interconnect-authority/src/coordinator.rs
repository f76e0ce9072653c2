//! Transfer coordinator: the origin side of a handoff
//!
//! 1. Mark the unit pending (fails with `TransferConflict` if one is in flight)
//! 2. Deliver the envelope, bounded by the transfer timeout
//! 3. On acknowledgement commit `Transferred`; on rejection, timeout, error
//!    or cancellation clear the marker so the unit stays `Active`
//!
//! Commit runs synchronously right after the acknowledgement is received,
//! with no await in between: once the destination admitted the unit, the
//! caller dropping the future cannot undo the handoff.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use interconnect_core::{CorrelationId, InterconnectError, InterconnectResult, ServerRef, UnitKey};
use interconnect_crypto::{seal, PassportSigner};
use interconnect_transport::LinkDirectory;
use interconnect_wire::{PassportEnvelope, TransferAck, TransferMessage, TransferReply};

use crate::AuthorityTable;

/// Result of a transfer attempt that reached a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The destination is now authoritative
    Accepted(TransferAck),
    /// Terminal for this attempt; retrying needs a new call
    Rejected(InterconnectError),
    /// No answer in time; the unit is `Active` here again
    TimedOut { correlation: CorrelationId },
}

impl TransferOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransferOutcome::Accepted(_))
    }
}

/// Clears the pending marker unless disarmed
struct PendingGuard<'a> {
    table: &'a AuthorityTable,
    unit: &'a UnitKey,
    correlation: CorrelationId,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let correlation = self.correlation;
        match self.table.update(self.unit, |record| Ok(record.rollback_transfer(correlation))) {
            Ok(true) => tracing::warn!(unit = %self.unit, %correlation, "transfer rolled back"),
            Ok(false) => {}
            Err(e) => tracing::error!(unit = %self.unit, error = %e, "rollback failed"),
        }
    }
}

pub struct TransferCoordinator {
    local: ServerRef,
    table: Arc<AuthorityTable>,
    links: Arc<LinkDirectory>,
    timeout: Duration,
}

impl TransferCoordinator {
    pub fn new(
        local: ServerRef,
        table: Arc<AuthorityTable>,
        links: Arc<LinkDirectory>,
        timeout: Duration,
    ) -> Self {
        TransferCoordinator {
            local,
            table,
            links,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Hand `unit` to `destination` under a fresh correlation id
    pub async fn initiate_transfer(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        envelope: PassportEnvelope,
    ) -> InterconnectResult<TransferOutcome> {
        self.initiate_transfer_with(unit, destination, envelope, CorrelationId::generate())
            .await
    }

    /// Hand `unit` to `destination` under `correlation`.
    ///
    /// Reusing the correlation id of a timed-out attempt is safe: a
    /// destination that already admitted it answers with the original ack.
    pub async fn initiate_transfer_with(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        envelope: PassportEnvelope,
        correlation: CorrelationId,
    ) -> InterconnectResult<TransferOutcome> {
        let link = self.links.resolve(destination)?;

        let now = Instant::now();
        let deadline = now + self.timeout;
        self.table.update(unit, |record| {
            record.begin_transfer(destination.clone(), correlation, deadline, now)
        })?;
        let guard = PendingGuard {
            table: &self.table,
            unit,
            correlation,
            armed: true,
        };

        tracing::debug!(%unit, %destination, %correlation, "transfer started");
        let message = TransferMessage {
            correlation,
            unit: unit.clone(),
            origin: self.local.clone(),
            envelope,
        };

        let reply = match tokio::time::timeout_at(deadline, link.deliver(message)).await {
            Err(_) => {
                tracing::warn!(%unit, %destination, %correlation, "transfer timed out");
                return Ok(TransferOutcome::TimedOut { correlation });
            }
            Ok(Err(e)) => {
                tracing::warn!(%unit, %destination, error = %e, "transfer delivery failed");
                return Err(e);
            }
            Ok(Ok(reply)) => reply,
        };

        match reply {
            TransferReply::Accepted(ack) if ack.correlation == correlation && &ack.unit == unit => {
                guard.disarm();
                self.table
                    .update(unit, |record| record.commit_transfer(correlation, destination.clone()))?;
                tracing::info!(%unit, %destination, "authority transferred");
                Ok(TransferOutcome::Accepted(ack))
            }
            TransferReply::Accepted(ack) => Err(InterconnectError::InvalidWireFormat(format!(
                "acknowledgement for {} does not match transfer {}",
                ack.correlation, correlation
            ))),
            TransferReply::Rejected(rejection) => {
                let error = rejection.to_error();
                tracing::warn!(%unit, %destination, error = %error, "transfer rejected");
                Ok(TransferOutcome::Rejected(error))
            }
        }
    }

    /// Seal `passport` with `signer` and hand `unit` to `destination`
    pub async fn transfer_passport(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        passport: impl Into<Bytes>,
        signer: &impl PassportSigner,
    ) -> InterconnectResult<TransferOutcome> {
        let envelope = seal(destination.as_str().to_string(), passport, signer);
        self.initiate_transfer(unit, destination, envelope).await
    }

    /// Delegate writes for `unit` to `to`
    pub fn delegate(&self, unit: &UnitKey, to: &ServerRef) -> InterconnectResult<()> {
        let now = Instant::now();
        self.table.update(unit, |record| record.delegate(to.clone(), now))
    }

    /// Take back a delegation made by this server
    pub fn revoke(&self, unit: &UnitKey) -> InterconnectResult<()> {
        self.table.update(unit, |record| record.revoke())
    }
}
