//! Complete frame structure for transfer messages
//!
//! Frame = Fixed Header + Body
//!
//! The body is a kind-specific sequence of length-prefixed fields
//! (`[LEN:4 LE][VALUE:LEN]`):
//! - Transfer: unit, origin, identity, destination, passport, signature (if SIGNED)
//! - Ack: unit, acknowledged_by, then `[COUNT:2 LE]` stripped field names (if STRIPPED)
//! - Reject: `[CODE:1]`, unit, reason

use bytes::{Buf, BufMut, Bytes, BytesMut};

use interconnect_core::{
    CorrelationId, Identity, InterconnectError, InterconnectResult, ServerRef, UnitKey,
};

use crate::{
    FrameHeader, FrameKind, PassportEnvelope, RejectCode, TransferAck, TransferMessage,
    TransferRejection, TransferReply, FIXED_HEADER_SIZE,
};

/// Maximum size of a single field (passports included)
pub const MAX_FIELD_SIZE: usize = 4 * 1024 * 1024;

/// Maximum frame size
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of stripped field names in one acknowledgement
pub const MAX_STRIPPED_FIELDS: usize = 1024;

/// Any message that crosses the wire during a handoff
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferFrame {
    Transfer(TransferMessage),
    Accepted(TransferAck),
    Rejected(TransferRejection),
}

impl From<TransferMessage> for TransferFrame {
    fn from(msg: TransferMessage) -> Self {
        TransferFrame::Transfer(msg)
    }
}

impl From<TransferReply> for TransferFrame {
    fn from(reply: TransferReply) -> Self {
        match reply {
            TransferReply::Accepted(ack) => TransferFrame::Accepted(ack),
            TransferReply::Rejected(rej) => TransferFrame::Rejected(rej),
        }
    }
}

impl TransferFrame {
    pub fn kind(&self) -> FrameKind {
        match self {
            TransferFrame::Transfer(_) => FrameKind::Transfer,
            TransferFrame::Accepted(_) => FrameKind::Ack,
            TransferFrame::Rejected(_) => FrameKind::Reject,
        }
    }

    pub fn correlation(&self) -> CorrelationId {
        match self {
            TransferFrame::Transfer(msg) => msg.correlation,
            TransferFrame::Accepted(ack) => ack.correlation,
            TransferFrame::Rejected(rej) => rej.correlation,
        }
    }

    /// Extract the reply, if this frame is one
    pub fn into_reply(self) -> Option<TransferReply> {
        match self {
            TransferFrame::Transfer(_) => None,
            TransferFrame::Accepted(ack) => Some(TransferReply::Accepted(ack)),
            TransferFrame::Rejected(rej) => Some(TransferReply::Rejected(rej)),
        }
    }

    /// Serialize frame to bytes
    pub fn encode(&self) -> InterconnectResult<Bytes> {
        let mut header = FrameHeader::new(self.kind(), self.correlation());
        let mut body = BytesMut::new();

        match self {
            TransferFrame::Transfer(msg) => {
                put_field(&mut body, msg.unit.as_bytes())?;
                put_field(&mut body, msg.origin.as_str().as_bytes())?;
                put_field(&mut body, msg.envelope.identity.to_string().as_bytes())?;
                put_field(&mut body, &msg.envelope.destination)?;
                put_field(&mut body, &msg.envelope.passport)?;
                if let Some(signature) = &msg.envelope.signature {
                    header.flags.set_signed(true);
                    put_field(&mut body, signature)?;
                }
            }
            TransferFrame::Accepted(ack) => {
                put_field(&mut body, ack.unit.as_bytes())?;
                put_field(&mut body, ack.acknowledged_by.as_str().as_bytes())?;
                if !ack.stripped.is_empty() {
                    if ack.stripped.len() > MAX_STRIPPED_FIELDS {
                        return Err(InterconnectError::InvalidWireFormat(format!(
                            "Too many stripped fields: {}",
                            ack.stripped.len()
                        )));
                    }
                    header.flags.set_stripped(true);
                    body.put_u16_le(ack.stripped.len() as u16);
                    for field in &ack.stripped {
                        put_field(&mut body, field.as_bytes())?;
                    }
                }
            }
            TransferFrame::Rejected(rej) => {
                body.put_u8(rej.code.to_byte());
                put_field(&mut body, rej.unit.as_bytes())?;
                put_field(&mut body, rej.reason.as_bytes())?;
            }
        }

        let total_size = FIXED_HEADER_SIZE + body.len();
        if total_size > MAX_FRAME_SIZE {
            return Err(InterconnectError::InvalidWireFormat(format!(
                "Frame too large: {} > {}",
                total_size, MAX_FRAME_SIZE
            )));
        }
        header.body_len = body.len() as u32;

        let mut buf = BytesMut::with_capacity(total_size);
        header.serialize(&mut buf);
        buf.put_slice(&body);
        Ok(buf.freeze())
    }

    /// Parse frame from bytes
    pub fn decode(buf: &[u8]) -> InterconnectResult<Self> {
        let header = FrameHeader::parse(buf)?;
        let expected = FIXED_HEADER_SIZE + header.body_len as usize;
        if expected > MAX_FRAME_SIZE {
            return Err(InterconnectError::InvalidWireFormat(format!(
                "Frame too large: {} > {}",
                expected, MAX_FRAME_SIZE
            )));
        }
        if buf.len() < expected {
            return Err(InterconnectError::BufferTooShort {
                expected,
                actual: buf.len(),
            });
        }
        if buf.len() > expected {
            return Err(InterconnectError::InvalidWireFormat(
                "Trailing bytes after frame body".into(),
            ));
        }

        let mut body = FieldReader::new(&buf[FIXED_HEADER_SIZE..]);
        let correlation = header.correlation;

        let frame = match header.kind {
            FrameKind::Transfer => {
                let unit = UnitKey::new(body.field()?);
                let origin = ServerRef::new(body.text("origin")?);
                let identity: Identity = body.text("identity")?.parse()?;
                let destination = Bytes::copy_from_slice(body.field()?);
                let passport = Bytes::copy_from_slice(body.field()?);
                let signature = if header.flags.is_signed() {
                    Some(Bytes::copy_from_slice(body.field()?))
                } else {
                    None
                };
                TransferFrame::Transfer(TransferMessage {
                    correlation,
                    unit,
                    origin,
                    envelope: PassportEnvelope {
                        destination,
                        passport,
                        identity,
                        signature,
                    },
                })
            }
            FrameKind::Ack => {
                let unit = UnitKey::new(body.field()?);
                let acknowledged_by = ServerRef::new(body.text("acknowledged_by")?);
                let mut stripped = Vec::new();
                if header.flags.is_stripped() {
                    let count = body.u16()? as usize;
                    if count > MAX_STRIPPED_FIELDS {
                        return Err(InterconnectError::InvalidWireFormat(format!(
                            "Too many stripped fields: {}",
                            count
                        )));
                    }
                    for _ in 0..count {
                        stripped.push(body.text("stripped field")?);
                    }
                }
                TransferFrame::Accepted(TransferAck {
                    correlation,
                    unit,
                    acknowledged_by,
                    stripped,
                })
            }
            FrameKind::Reject => {
                let code_byte = body.u8()?;
                let code = RejectCode::from_byte(code_byte).ok_or_else(|| {
                    InterconnectError::InvalidWireFormat(format!(
                        "Unknown reject code: {}",
                        code_byte
                    ))
                })?;
                let unit = UnitKey::new(body.field()?);
                let reason = body.text("reason")?;
                TransferFrame::Rejected(TransferRejection {
                    correlation,
                    unit,
                    code,
                    reason,
                })
            }
        };

        body.finish()?;
        Ok(frame)
    }
}

fn put_field(buf: &mut BytesMut, value: &[u8]) -> InterconnectResult<()> {
    if value.len() > MAX_FIELD_SIZE {
        return Err(InterconnectError::InvalidWireFormat(format!(
            "Field too large: {} > {}",
            value.len(),
            MAX_FIELD_SIZE
        )));
    }
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value);
    Ok(())
}

/// Cursor over a frame body
struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        FieldReader { buf }
    }

    fn need(&self, n: usize) -> InterconnectResult<()> {
        if self.buf.remaining() < n {
            return Err(InterconnectError::BufferTooShort {
                expected: n,
                actual: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> InterconnectResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self) -> InterconnectResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    fn field(&mut self) -> InterconnectResult<&'a [u8]> {
        self.need(4)?;
        let len = self.buf.get_u32_le() as usize;
        if len > MAX_FIELD_SIZE {
            return Err(InterconnectError::InvalidWireFormat(format!(
                "Field too large: {} > {}",
                len, MAX_FIELD_SIZE
            )));
        }
        self.need(len)?;
        let (value, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(value)
    }

    fn text(&mut self, what: &str) -> InterconnectResult<String> {
        let raw = self.field()?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| InterconnectError::InvalidWireFormat(format!("{} is not utf-8", what)))
    }

    fn finish(self) -> InterconnectResult<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(InterconnectError::InvalidWireFormat(format!(
                "{} unread body bytes",
                self.buf.len()
            )))
        }
    }
}
