//! Fixed header for transfer frames
//!
//! Fixed header is 22 bytes:
//! - Byte 0: Version (4 bits) + Frame kind (4 bits)
//! - Byte 1: Flags
//! - Bytes 2-17: Correlation ID
//! - Bytes 18-21: Body length (LE)

use bytes::BufMut;

use interconnect_core::{CorrelationId, InterconnectError, InterconnectResult};

use crate::FrameFlags;

/// Fixed header size in bytes
pub const FIXED_HEADER_SIZE: usize = 22;

/// Current wire protocol version
pub const WIRE_VERSION: u8 = 0;

/// Frame kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Origin -> destination transfer request
    Transfer = 0,
    /// Destination accepted authority
    Ack = 1,
    /// Destination refused authority
    Reject = 2,
}

impl FrameKind {
    pub fn from_nibble(n: u8) -> Option<Self> {
        match n {
            0 => Some(FrameKind::Transfer),
            1 => Some(FrameKind::Ack),
            2 => Some(FrameKind::Reject),
            _ => None,
        }
    }

    #[inline]
    pub fn to_nibble(self) -> u8 {
        self as u8
    }
}

/// Fixed header structure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Wire protocol version (4 bits, 0-15)
    pub version: u8,
    pub kind: FrameKind,
    pub flags: FrameFlags,
    pub correlation: CorrelationId,
    /// Length of everything after the fixed header
    pub body_len: u32,
}

impl FrameHeader {
    pub fn new(kind: FrameKind, correlation: CorrelationId) -> Self {
        FrameHeader {
            version: WIRE_VERSION,
            kind,
            flags: FrameFlags::NONE,
            correlation,
            body_len: 0,
        }
    }

    /// Parse header from bytes
    pub fn parse(buf: &[u8]) -> InterconnectResult<Self> {
        if buf.len() < FIXED_HEADER_SIZE {
            return Err(InterconnectError::BufferTooShort {
                expected: FIXED_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        // Byte 0: Version + Kind
        let version = buf[0] >> 4;
        if version != WIRE_VERSION {
            return Err(InterconnectError::InvalidWireFormat(format!(
                "Unsupported wire version: {}",
                version
            )));
        }
        let kind = FrameKind::from_nibble(buf[0] & 0x0F)
            .ok_or_else(|| InterconnectError::InvalidWireFormat("Unknown frame kind".into()))?;

        // Byte 1: Flags
        let flags = FrameFlags::new(buf[1]);
        if flags.has_unknown_bits() {
            return Err(InterconnectError::InvalidWireFormat(
                "Reserved flag bits set".into(),
            ));
        }

        // Bytes 2-17: Correlation ID
        let mut correlation = [0u8; CorrelationId::SIZE];
        correlation.copy_from_slice(&buf[2..18]);

        // Bytes 18-21: Body length
        let body_len = u32::from_le_bytes([buf[18], buf[19], buf[20], buf[21]]);

        Ok(FrameHeader {
            version,
            kind,
            flags,
            correlation: CorrelationId::from_bytes(correlation),
            body_len,
        })
    }

    /// Serialize header
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u8((self.version << 4) | self.kind.to_nibble());
        buf.put_u8(self.flags.0);
        buf.put_slice(&self.correlation.to_bytes());
        buf.put_u32_le(self.body_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let corr = CorrelationId::from_bytes([7u8; 16]);
        let mut header = FrameHeader::new(FrameKind::Ack, corr);
        header.flags.set_stripped(true);
        header.body_len = 0x0102;

        let mut buf = Vec::new();
        header.serialize(&mut buf);
        assert_eq!(buf.len(), FIXED_HEADER_SIZE);
        assert_eq!(buf[0], 0x01);
        assert_eq!(buf[1], FrameFlags::STRIPPED);
        assert_eq!(&buf[18..22], &[0x02, 0x01, 0, 0]);

        assert_eq!(FrameHeader::parse(&buf).unwrap(), header);
    }

    #[test]
    fn test_header_too_short() {
        assert_eq!(
            FrameHeader::parse(&[0u8; 5]),
            Err(InterconnectError::BufferTooShort {
                expected: FIXED_HEADER_SIZE,
                actual: 5
            })
        );
    }

    #[test]
    fn test_header_rejects_unknown_kind_and_version() {
        let mut buf = vec![0u8; FIXED_HEADER_SIZE];
        buf[0] = 0x0F;
        assert!(matches!(
            FrameHeader::parse(&buf),
            Err(InterconnectError::InvalidWireFormat(_))
        ));
        buf[0] = 0x10;
        assert!(matches!(
            FrameHeader::parse(&buf),
            Err(InterconnectError::InvalidWireFormat(_))
        ));
    }
}
