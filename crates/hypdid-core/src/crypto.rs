//! Identity keys for the hypdid registry.
//!
//! Wraps Ed25519 keypairs with strong types and provides the deterministic
//! seed derivation used to give a node a stable swarm identity.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An Ed25519 keypair identifying a log writer or swarm participant.
///
/// Wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed. Deterministic.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Verify a signature made by this keypair.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        self.public_key().verify(message, signature)
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Check that a stored public key actually belongs to the given secret seed.
pub fn verify_keypair(public: &PublicKey, seed: &[u8; 32]) -> bool {
    SigningKey::from_bytes(seed).verifying_key().to_bytes() == public.0
}

/// Derive a stable identity seed from a storage path.
///
/// The same storage location always yields the same swarm identity across
/// restarts. Pure function so callers can substitute an explicit seed.
pub fn derive_seed(storage_path: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"hypdid-identity-v0:");
    hasher.update(storage_path.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_verify_keypair() {
        let keypair = Keypair::generate();
        assert!(verify_keypair(&keypair.public_key(), &keypair.seed()));

        let other = Keypair::generate();
        assert!(!verify_keypair(&other.public_key(), &keypair.seed()));
    }

    #[test]
    fn test_derive_seed_stable() {
        let s1 = derive_seed("/home/alice/.hypdid/storage");
        let s2 = derive_seed("/home/alice/.hypdid/storage");
        assert_eq!(s1, s2);

        let s3 = derive_seed("/home/bob/.hypdid/storage");
        assert_ne!(s1, s3);
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = Keypair::from_seed(&[3u8; 32]);
        let signature = keypair.sign(b"hello");

        assert!(keypair.verify(b"hello", &signature).is_ok());
        assert!(matches!(
            keypair.verify(b"tampered", &signature),
            Err(CoreError::InvalidSignature)
        ));

        let other = Keypair::from_seed(&[4u8; 32]);
        assert!(matches!(
            other.public_key().verify(b"hello", &signature),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_public_key_hex() {
        let keypair = Keypair::from_seed(&[7u8; 32]);
        let pk = keypair.public_key();
        assert_eq!(pk.to_hex().len(), 64);
    }
}
