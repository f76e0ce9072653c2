//! Admission ledger
//!
//! Remembers the acknowledgement for each admitted correlation id so a
//! retried transfer gets the same answer instead of a second admission.
//! Bounded: the oldest entries are evicted first.

use std::collections::{HashMap, VecDeque};

use interconnect_core::CorrelationId;
use interconnect_wire::TransferAck;

/// Default number of acknowledgements kept
pub const DEFAULT_LEDGER_CAPACITY: usize = 4096;

pub struct AdmissionLedger {
    capacity: usize,
    order: VecDeque<CorrelationId>,
    acks: HashMap<CorrelationId, TransferAck>,
}

impl AdmissionLedger {
    pub fn new(capacity: usize) -> Self {
        AdmissionLedger {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            acks: HashMap::new(),
        }
    }

    /// Acknowledgement previously issued for `correlation`
    pub fn get(&self, correlation: &CorrelationId) -> Option<&TransferAck> {
        self.acks.get(correlation)
    }

    pub fn record(&mut self, ack: TransferAck) {
        if self.acks.contains_key(&ack.correlation) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.acks.remove(&oldest);
            }
        }
        self.order.push_back(ack.correlation);
        self.acks.insert(ack.correlation, ack);
    }

    pub fn len(&self) -> usize {
        self.acks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acks.is_empty()
    }
}

impl Default for AdmissionLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}
