//! # Key Management
//!
//! Ed25519 keypairs, 32-byte public identities, signatures, and the
//! [`Signer`] proof that a payer authorized a call.
//!
//! ## Identities vs. keys
//!
//! A [`Pubkey`] is just 32 bytes. Most of them are Ed25519 public keys
//! belonging to someone who holds the matching secret, but derived
//! addresses (vaults, holding accounts) are deliberately *not* curve points,
//! so nobody holds a secret for them. `Pubkey` therefore accepts any 32
//! bytes; validating curve membership is the job of
//! [`super::address::is_on_curve`], not the constructor.
//!
//! ## Security considerations
//!
//! - We use OS-level RNG (`OsRng`) for key generation.
//! - Secret key bytes are never logged. `Debug` prints the public half only.

use ed25519_dalek::{Signature as DalekSignature, Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during key operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or malformed encoding")]
    InvalidSecretKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,

    #[error("signature verification failed")]
    VerificationFailed,
}

// ---------------------------------------------------------------------------
// Pubkey
// ---------------------------------------------------------------------------

/// A 32-byte public identity: a wallet's Ed25519 key, a program id, or a
/// derived account address.
///
/// Serializes as base58 in human-readable formats (JSON, logs) and as 32 raw
/// bytes in binary formats (bincode on disk), so the durable layout stays
/// exactly 32 bytes per identity.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    /// Wraps raw bytes. `const` so program ids can be compile-time constants.
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns a copy of the raw bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Borrows the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Try to create a `Pubkey` from a byte slice of exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey(format!("expected 32 bytes, got {}", slice.len())))?;
        Ok(Self(bytes))
    }

    /// Base58 encoding, the form users see and paste around.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Hex encoding. 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify an Ed25519 signature made by the holder of this key.
    ///
    /// Always fails for derived addresses: they are not curve points, so no
    /// verifying key can be built from them.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let dalek_sig = DalekSignature::from_bytes(&signature.0);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Pubkey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// An Ed25519 signature over a message. Always 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Base58 encoding, used as the transaction id in receipts.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| KeyError::InvalidSignatureEncoding)?;
        let arr: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSignatureEncoding)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_base58();
        write!(f, "Signature({}...)", &s[..s.len().min(12)])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            self.0.to_vec().serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            let arr: [u8; 64] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))?;
            Ok(Self(arr))
        }
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An Ed25519 keypair: the secret that lets a holder deposit and withdraw.
///
/// Intentionally not `Serialize`. Exporting a secret should be a deliberate
/// call to [`to_bytes`](Self::to_bytes), never a side effect of shoving a
/// keypair into a JSON response.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key, as written by
    /// `timelock-node init`.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public identity of this keypair.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Exports the raw 32-byte secret. Handle with care.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "Keypair(pub={})", self.pubkey())
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Proof that an identity authorized the current operation.
///
/// Obtained by holding the keypair ([`Signer::from`]), by presenting a valid
/// signature ([`Signer::verify`]), or by re-deriving an off-curve address
/// from its seeds ([`super::address::derived_signer`]). The last path is
/// open to any code linked into the host; it cannot yield a signer for a
/// wallet key. Operations that move value take a `&Signer`, never a bare
/// `Pubkey`, so "who is asking" is settled before any business logic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    key: Pubkey,
}

impl Signer {
    /// Verifies `signature` over `message` against `key`.
    pub fn verify(key: &Pubkey, message: &[u8], signature: &Signature) -> Result<Self, KeyError> {
        if key.verify(message, signature) {
            Ok(Self { key: *key })
        } else {
            Err(KeyError::VerificationFailed)
        }
    }

    /// Only the address module may mint signers for derived addresses.
    pub(crate) fn derived(key: Pubkey) -> Self {
        Self { key }
    }

    /// The authorized identity.
    pub fn pubkey(&self) -> Pubkey {
        self.key
    }
}

impl From<&Keypair> for Signer {
    fn from(keypair: &Keypair) -> Self {
        Self {
            key: keypair.pubkey(),
        }
    }
}
