//! Passport envelope
//!
//! The envelope carries an application payload the protocol never parses,
//! next to the identity that vouches for it. Only the signature is checked
//! at this layer; the payload's meaning belongs to the application.

use bytes::Bytes;

use interconnect_core::Identity;

/// Opaque passport payload plus protocol-level identity and signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassportEnvelope {
    /// Where the passport is headed (app-defined, opaque)
    pub destination: Bytes,
    /// App-defined payload (inventory, stats, follower lists...)
    pub passport: Bytes,
    /// Who vouches for the payload
    pub identity: Identity,
    /// Signature over `passport`, required by cryptographic schemes
    pub signature: Option<Bytes>,
}

impl PassportEnvelope {
    /// Create an unsigned envelope
    pub fn new(destination: impl Into<Bytes>, passport: impl Into<Bytes>, identity: Identity) -> Self {
        PassportEnvelope {
            destination: destination.into(),
            passport: passport.into(),
            identity,
            signature: None,
        }
    }

    /// Attach a signature
    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The bytes covered by the signature
    #[inline]
    pub fn signed_message(&self) -> &[u8] {
        &self.passport
    }

    /// Total size of the variable-length parts
    pub fn payload_size(&self) -> usize {
        self.destination.len()
            + self.passport.len()
            + self.signature.as_ref().map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_builder() {
        let env = PassportEnvelope::new("zone-b", vec![1u8, 2, 3], Identity::local("p1"));
        assert!(!env.is_signed());
        assert_eq!(env.signed_message(), &[1, 2, 3]);

        let env = env.with_signature(vec![9u8; 64]);
        assert!(env.is_signed());
        assert_eq!(env.payload_size(), 6 + 3 + 64);
    }
}
