//! Key management using Ed25519
//!
//! An `ed25519:` identity's payload is the hex-encoded verifying key, so the
//! key needed to check a signature is recoverable from the identity itself.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use interconnect_core::Identity;

/// Ed25519 public key length
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature length
pub const SIGNATURE_SIZE: usize = 64;

/// Keypair for an `ed25519:` identity
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    identity: Identity,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create keypair from existing signing key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let identity = Identity::ed25519(fingerprint(&verifying_key));
        Keypair {
            signing_key,
            verifying_key,
            identity,
        }
    }

    /// Get the signing key bytes (secret)
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the verifying key bytes (public)
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// The `ed25519:<fingerprint>` identity of this keypair
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Short key id for logs (first 8 bytes of SHA-256 of the public key)
    pub fn key_id(&self) -> String {
        key_id(&self.verifying_key)
    }

    /// Public half of the keypair
    pub fn public(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.verifying_key,
        }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature with the same strict rules the border applies
    pub fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_SIZE]) -> bool {
        let sig = Signature::from_bytes(signature);
        self.verifying_key.verify_strict(message, &sig).is_ok()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Public key for verification only
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create from verifying key bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; PUBLIC_KEY_SIZE] = bytes.try_into().ok()?;
        let verifying_key = VerifyingKey::from_bytes(bytes).ok()?;
        Some(PublicKey { verifying_key })
    }

    /// Recover the key from a hex fingerprint
    pub fn from_fingerprint(fingerprint: &str) -> Option<Self> {
        let mut bytes = [0u8; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(fingerprint, &mut bytes).ok()?;
        Self::from_bytes(&bytes)
    }

    /// Verify a signature of any length; malformed signatures fail
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => self.verifying_key.verify_strict(message, &sig).is_ok(),
            Err(_) => false,
        }
    }

    /// Get the verifying key bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.verifying_key.to_bytes()
    }

    /// The identity this key verifies for
    pub fn identity(&self) -> Identity {
        Identity::ed25519(fingerprint(&self.verifying_key))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("key_id", &key_id(&self.verifying_key))
            .finish()
    }
}

/// Hex fingerprint: the full verifying key
fn fingerprint(verifying_key: &VerifyingKey) -> String {
    hex::encode(verifying_key.as_bytes())
}

fn key_id(verifying_key: &VerifyingKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifying_key.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..8])
}
