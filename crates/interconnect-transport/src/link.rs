//! Transport ports

use async_trait::async_trait;

use interconnect_core::{InterconnectError, InterconnectResult};
use interconnect_wire::{TransferFrame, TransferMessage, TransferReply};

/// Origin side: carries a transfer to one destination and its reply back
#[async_trait]
pub trait TransferLink: Send + Sync {
    /// Deliver `message` and wait for the destination's answer.
    ///
    /// A rejection is a successful delivery; errors mean the message or the
    /// reply did not make it.
    async fn deliver(&self, message: TransferMessage) -> InterconnectResult<TransferReply>;
}

/// Destination side: admits or refuses incoming transfers
#[async_trait]
pub trait TransferHandler: Send + Sync {
    async fn handle_transfer(&self, message: TransferMessage) -> TransferReply;
}

/// Decode a request frame
pub fn decode_request(bytes: &[u8]) -> InterconnectResult<TransferMessage> {
    match TransferFrame::decode(bytes)? {
        TransferFrame::Transfer(message) => Ok(message),
        other => Err(InterconnectError::InvalidWireFormat(format!(
            "expected transfer, got {:?}",
            other.kind()
        ))),
    }
}

/// Decode a reply frame
pub fn decode_reply(bytes: &[u8]) -> InterconnectResult<TransferReply> {
    let frame = TransferFrame::decode(bytes)?;
    let kind = frame.kind();
    frame
        .into_reply()
        .ok_or_else(|| InterconnectError::InvalidWireFormat(format!("expected reply, got {kind:?}")))
}
