//! Verification strategies for identity schemes
//!
//! Each scheme verifies in one of three ways:
//! - Cryptographic: signature mandatory, checked against a key recovered
//!   from the identity's fingerprint
//! - Delegated (`url`): accepted at the protocol layer; trust comes from the
//!   named server out of band, so policies must treat it as weaker
//! - Local: accepted unconditionally, for trusted transports only

use std::collections::HashMap;

use interconnect_core::{Identity, InterconnectError, InterconnectResult};

use crate::PublicKey;

/// How a scheme establishes trust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeKind {
    /// The holder proves possession of a key
    Cryptographic,
    /// A named server vouches out of band
    Delegated,
    /// The connection itself is trusted
    Local,
}

impl SchemeKind {
    #[inline]
    pub fn requires_signature(self) -> bool {
        self == SchemeKind::Cryptographic
    }
}

/// A single verification capability, registered under a scheme name
pub trait VerificationStrategy: Send + Sync {
    fn kind(&self) -> SchemeKind;

    /// Check `signature` over `message` for `identity`
    fn verify(
        &self,
        identity: &Identity,
        message: &[u8],
        signature: Option<&[u8]>,
    ) -> InterconnectResult<()>;
}

/// Signature primitive behind a cryptographic scheme
pub trait SignatureAlgorithm: Send + Sync {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 (strict verification)
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

impl SignatureAlgorithm for Ed25519 {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        PublicKey::from_bytes(public_key).is_some_and(|key| key.verify(message, signature))
    }
}

/// Key discovery: map an identity payload to public key material
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, fingerprint: &str) -> Option<Vec<u8>>;
}

/// The fingerprint is the hex-encoded public key
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineKeyResolver;

impl KeyResolver for InlineKeyResolver {
    fn resolve(&self, fingerprint: &str) -> Option<Vec<u8>> {
        hex::decode(fingerprint).ok()
    }
}

/// Fingerprints looked up in a fixed table, loaded at startup
#[derive(Debug, Clone, Default)]
pub struct KeyDirectory {
    keys: HashMap<String, Vec<u8>>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        KeyDirectory::default()
    }

    pub fn with_key(mut self, fingerprint: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        self.keys.insert(fingerprint.into(), key.into());
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for KeyDirectory {
    fn resolve(&self, fingerprint: &str) -> Option<Vec<u8>> {
        self.keys.get(fingerprint).cloned()
    }
}

/// Signature-checking scheme: `A` verifies, `R` finds the key
#[derive(Debug, Clone, Default)]
pub struct CryptographicScheme<A, R = InlineKeyResolver> {
    algorithm: A,
    resolver: R,
}

impl<A: SignatureAlgorithm> CryptographicScheme<A> {
    pub fn new(algorithm: A) -> Self {
        CryptographicScheme {
            algorithm,
            resolver: InlineKeyResolver,
        }
    }
}

impl<A: SignatureAlgorithm, R: KeyResolver> CryptographicScheme<A, R> {
    pub fn with_resolver(algorithm: A, resolver: R) -> Self {
        CryptographicScheme {
            algorithm,
            resolver,
        }
    }
}

/// The builtin `ed25519` scheme
pub type Ed25519Scheme = CryptographicScheme<Ed25519>;

impl<A: SignatureAlgorithm, R: KeyResolver> VerificationStrategy for CryptographicScheme<A, R> {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Cryptographic
    }

    fn verify(
        &self,
        identity: &Identity,
        message: &[u8],
        signature: Option<&[u8]>,
    ) -> InterconnectResult<()> {
        let signature = signature.ok_or(InterconnectError::MissingSignature)?;
        let Some(public_key) = self.resolver.resolve(identity.payload()) else {
            tracing::debug!(%identity, "no key material for fingerprint");
            return Err(InterconnectError::SignatureInvalid);
        };
        if self.algorithm.verify(&public_key, message, signature) {
            Ok(())
        } else {
            Err(InterconnectError::SignatureInvalid)
        }
    }
}

/// `url:` identities: the named server vouches, nothing to check here
#[derive(Debug, Clone, Copy, Default)]
pub struct DelegatedScheme;

impl VerificationStrategy for DelegatedScheme {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Delegated
    }

    fn verify(&self, _: &Identity, _: &[u8], _: Option<&[u8]>) -> InterconnectResult<()> {
        Ok(())
    }
}

/// `local:` identities: the transport is trusted
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheme;

impl VerificationStrategy for LocalScheme {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Local
    }

    fn verify(&self, _: &Identity, _: &[u8], _: Option<&[u8]>) -> InterconnectResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Keypair;

    #[test]
    fn test_ed25519_scheme() {
        let keypair = Keypair::generate();
        let scheme = Ed25519Scheme::new(Ed25519);
        let msg = b"passport";
        let sig = keypair.sign(msg);

        assert!(scheme.verify(keypair.identity(), msg, Some(&sig)).is_ok());
        assert_eq!(
            scheme.verify(keypair.identity(), msg, None),
            Err(InterconnectError::MissingSignature)
        );
        assert_eq!(
            scheme.verify(keypair.identity(), b"other", Some(&sig)),
            Err(InterconnectError::SignatureInvalid)
        );
    }

    #[test]
    fn test_unrecoverable_key_is_invalid() {
        let scheme = Ed25519Scheme::new(Ed25519);
        let id = Identity::ed25519("zz-not-a-key");
        assert_eq!(
            scheme.verify(&id, b"m", Some(&[0u8; 64])),
            Err(InterconnectError::SignatureInvalid)
        );
    }

    #[test]
    fn test_key_directory_resolver() {
        let keypair = Keypair::generate();
        let directory = KeyDirectory::new().with_key("alice-2024", keypair.verifying_key_bytes());
        let scheme = CryptographicScheme::with_resolver(Ed25519, directory);
        let id = Identity::ed25519("alice-2024");
        let sig = keypair.sign(b"m");

        assert!(scheme.verify(&id, b"m", Some(&sig)).is_ok());
        assert_eq!(
            scheme.verify(&Identity::ed25519("bob"), b"m", Some(&sig)),
            Err(InterconnectError::SignatureInvalid)
        );
    }

    #[test]
    fn test_trusting_schemes_ignore_signature() {
        let url = Identity::url("alice@example.com");
        let local = Identity::local("p1");
        assert!(DelegatedScheme.verify(&url, b"m", None).is_ok());
        assert!(DelegatedScheme.verify(&url, b"m", Some(b"junk")).is_ok());
        assert!(LocalScheme.verify(&local, b"m", None).is_ok());
        assert_eq!(DelegatedScheme.kind(), SchemeKind::Delegated);
        assert!(!LocalScheme.kind().requires_signature());
    }
}
