//! Border: the destination side of a transfer
//!
//! Admission sequence for an incoming [`TransferMessage`]:
//! 1. The envelope is opened: identity verified against the passport bytes
//! 2. A correlation id already acknowledged for the same unit gets its
//!    original ack back; reused for another unit it is a conflict
//! 3. The host interprets the passport
//! 4. The import policy admits, rejects or strips
//! 5. The unit becomes `Active` here and the ack is recorded
//!
//! Steps 2 to 4 run without any lock. Step 5 re-checks the ledger under the
//! unit's lock, so concurrent duplicates resolve to a single admission.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use interconnect_core::{InterconnectError, InterconnectResult, ServerRef};
use interconnect_crypto::IdentityVerifier;
use interconnect_policy::{ImportPolicy, ImportPolicyEngine};
use interconnect_transport::TransferHandler;
use interconnect_wire::{TransferAck, TransferMessage, TransferRejection, TransferReply};

use crate::{AdmissionLedger, AuthorityTable, Host};

pub struct Border {
    local: ServerRef,
    verifier: Arc<IdentityVerifier>,
    policy: ImportPolicy,
    engine: ImportPolicyEngine,
    table: Arc<AuthorityTable>,
    host: Arc<dyn Host>,
    ledger: Mutex<AdmissionLedger>,
}

impl Border {
    pub fn new(
        local: ServerRef,
        verifier: Arc<IdentityVerifier>,
        policy: ImportPolicy,
        table: Arc<AuthorityTable>,
        host: Arc<dyn Host>,
        ledger_capacity: usize,
    ) -> Self {
        Border {
            local,
            verifier,
            policy,
            engine: ImportPolicyEngine::new(),
            table,
            host,
            ledger: Mutex::new(AdmissionLedger::new(ledger_capacity)),
        }
    }

    pub fn policy(&self) -> &ImportPolicy {
        &self.policy
    }

    /// Acknowledgements currently remembered
    pub fn ledger_len(&self) -> usize {
        self.ledger.lock().len()
    }

    /// Run the admission sequence
    pub fn admit(&self, message: &TransferMessage) -> InterconnectResult<TransferAck> {
        let opened = self.verifier.open(&message.envelope)?;
        if let Some(ack) = replayed(&self.ledger.lock(), message)? {
            tracing::debug!(correlation = %message.correlation, "replayed transfer, returning original ack");
            return Ok(ack);
        }

        let mut value = self.host.interpret(&opened.payload)?;
        let stripped = self
            .engine
            .evaluate(&self.policy, &mut value)
            .into_result()?;

        let (ack, fresh) = self.table.upsert(&message.unit, |record| {
            let mut ledger = self.ledger.lock();
            if let Some(ack) = replayed(&ledger, message)? {
                return Ok((ack, false));
            }
            record.accept_transfer_in()?;
            let ack = TransferAck {
                correlation: message.correlation,
                unit: message.unit.clone(),
                acknowledged_by: self.local.clone(),
                stripped,
            };
            ledger.record(ack.clone());
            Ok((ack, true))
        })?;

        if fresh {
            tracing::info!(
                unit = %message.unit,
                origin = %message.origin,
                identity = %opened.identity,
                stripped = ack.stripped.len(),
                "transfer admitted"
            );
            self.host.on_admitted(&message.unit, &opened.identity, &value);
        }
        Ok(ack)
    }
}

/// The recorded ack for `message`, if its correlation id was admitted before
fn replayed(
    ledger: &AdmissionLedger,
    message: &TransferMessage,
) -> InterconnectResult<Option<TransferAck>> {
    match ledger.get(&message.correlation) {
        Some(ack) if ack.unit == message.unit => Ok(Some(ack.clone())),
        Some(_) => Err(InterconnectError::TransferConflict(message.unit.clone())),
        None => Ok(None),
    }
}

#[async_trait]
impl TransferHandler for Border {
    async fn handle_transfer(&self, message: TransferMessage) -> TransferReply {
        match self.admit(&message) {
            Ok(ack) => TransferReply::Accepted(ack),
            Err(e) => {
                tracing::warn!(
                    unit = %message.unit,
                    origin = %message.origin,
                    error = %e,
                    "transfer rejected at border"
                );
                TransferReply::Rejected(TransferRejection::from_error(
                    message.correlation,
                    message.unit,
                    &e,
                ))
            }
        }
    }
}
