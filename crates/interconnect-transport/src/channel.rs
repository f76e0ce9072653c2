//! Channel-backed endpoint
//!
//! A destination served by its own task: encoded frames arrive on an mpsc
//! queue, each with a oneshot for the encoded reply. Requests are handled
//! concurrently, one spawned task each.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use interconnect_core::{InterconnectError, InterconnectResult};
use interconnect_wire::{TransferFrame, TransferMessage, TransferReply};

use crate::{decode_reply, decode_request, TransferHandler, TransferLink};

type Request = (Bytes, oneshot::Sender<Bytes>);

/// Origin-side handle to a channel endpoint
#[derive(Clone)]
pub struct ChannelLink {
    tx: mpsc::Sender<Request>,
}

#[async_trait]
impl TransferLink for ChannelLink {
    async fn deliver(&self, message: TransferMessage) -> InterconnectResult<TransferReply> {
        let request = TransferFrame::from(message).encode()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| InterconnectError::Unreachable)?;
        let response = reply_rx.await.map_err(|_| {
            InterconnectError::Transport("endpoint dropped the request".to_string())
        })?;
        decode_reply(&response)
    }
}

/// Start serving `handler`; the endpoint stops once every link is dropped
pub fn spawn_endpoint(handler: Arc<dyn TransferHandler>, buffer_size: usize) -> (ChannelLink, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Request>(buffer_size);

    let task = tokio::spawn(async move {
        while let Some((request, reply_tx)) = rx.recv().await {
            let message = match decode_request(&request) {
                Ok(message) => message,
                Err(e) => {
                    // Undecodable: no correlation id to answer with.
                    tracing::warn!("dropping malformed transfer frame: {}", e);
                    continue;
                }
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let reply = handler.handle_transfer(message).await;
                match TransferFrame::from(reply).encode() {
                    Ok(bytes) => {
                        let _ = reply_tx.send(bytes);
                    }
                    Err(e) => tracing::warn!("failed to encode transfer reply: {}", e),
                }
            });
        }
        tracing::debug!("transfer endpoint closed");
    });

    (ChannelLink { tx }, task)
}
