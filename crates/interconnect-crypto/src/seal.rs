//! Passport sealing - Wire + Crypto binding
//!
//! Binds the passport envelope to identity verification:
//! - Sealing signs the passport bytes with the holder's key
//! - Opening checks the signature through the verifier before the payload
//!   is handed to anything that interprets it

use bytes::Bytes;

use interconnect_core::{Identity, InterconnectResult};
use interconnect_wire::PassportEnvelope;

use crate::{IdentityVerifier, Keypair, SchemeKind};

/// Something that can vouch for a passport
pub trait PassportSigner {
    fn identity(&self) -> &Identity;

    /// Signature over `message`, or `None` for schemes that do not sign
    fn sign(&self, message: &[u8]) -> Option<Vec<u8>>;
}

impl PassportSigner for Keypair {
    fn identity(&self) -> &Identity {
        Keypair::identity(self)
    }

    fn sign(&self, message: &[u8]) -> Option<Vec<u8>> {
        Some(Keypair::sign(self, message).to_vec())
    }
}

/// A `url:` or `local:` holder; passports go out unsigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedIdentity(pub Identity);

impl PassportSigner for UnsignedIdentity {
    fn identity(&self) -> &Identity {
        &self.0
    }

    fn sign(&self, _: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

/// Build an envelope for `passport`, signed if the signer signs
pub fn seal(
    destination: impl Into<Bytes>,
    passport: impl Into<Bytes>,
    signer: &impl PassportSigner,
) -> PassportEnvelope {
    let envelope = PassportEnvelope::new(destination, passport, signer.identity().clone());
    match signer.sign(envelope.signed_message()) {
        Some(signature) => envelope.with_signature(signature),
        None => envelope,
    }
}

/// A passport whose identity has been verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPassport {
    pub payload: Bytes,
    pub identity: Identity,
    pub kind: SchemeKind,
}

impl IdentityVerifier {
    /// Verify the envelope's identity against its signature and release the
    /// payload. Nothing about the payload is inspected here.
    pub fn open(&self, envelope: &PassportEnvelope) -> InterconnectResult<OpenedPassport> {
        let verified = self.verify(
            &envelope.identity,
            envelope.signed_message(),
            envelope.signature.as_deref(),
        )?;

        tracing::debug!(
            identity = %verified.identity,
            kind = ?verified.kind,
            bytes = envelope.passport.len(),
            "passport opened"
        );

        Ok(OpenedPassport {
            payload: envelope.passport.clone(),
            identity: verified.identity,
            kind: verified.kind,
        })
    }
}
