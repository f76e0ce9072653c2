//! Direct in-process link
//!
//! Calls the destination's handler in the caller's task. Every message is
//! encoded and decoded on the way, so the codec sees exactly what a network
//! binding would send. Partitions and latency can be injected for tests and
//! local simulations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use interconnect_core::{InterconnectError, InterconnectResult};
use interconnect_wire::{TransferFrame, TransferMessage, TransferReply};

use crate::{decode_reply, decode_request, TransferHandler, TransferLink};

/// Link to a handler in the same process
pub struct MemoryLink {
    handler: Arc<dyn TransferHandler>,
    partitioned: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryLink {
    pub fn new(handler: Arc<dyn TransferHandler>) -> Self {
        MemoryLink {
            handler,
            partitioned: AtomicBool::new(false),
            latency: Mutex::new(None),
        }
    }

    /// While partitioned, deliveries fail with `Unreachable`
    pub fn set_partitioned(&self, partitioned: bool) {
        self.partitioned.store(partitioned, Ordering::SeqCst);
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned.load(Ordering::SeqCst)
    }

    /// Delay applied before the destination sees each message
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }
}

#[async_trait]
impl TransferLink for MemoryLink {
    async fn deliver(&self, message: TransferMessage) -> InterconnectResult<TransferReply> {
        if self.is_partitioned() {
            return Err(InterconnectError::Unreachable);
        }
        let request = TransferFrame::from(message).encode()?;

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self.handler.handle_transfer(decode_request(&request)?).await;
        tracing::debug!(correlation = %reply.correlation(), accepted = reply.is_accepted(), "memory link reply");

        let response = TransferFrame::from(reply).encode()?;
        decode_reply(&response)
    }
}
