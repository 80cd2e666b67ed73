//! # Hashing Utilities
//!
//! SHA-256 is the only hash function the ledger uses. It drives three
//! things:
//!
//! - **Derived addresses**: `sha256(seeds || bump || program || marker)`,
//!   see [`super::address`].
//! - **Account discriminators**: the first 8 bytes of
//!   `sha256("account:<Name>")` tag every typed account so one kind of
//!   record can never be decoded as another.
//! - **Transaction ids**: receipts are keyed by the hash of the signed
//!   message.
//!
//! Addresses are part of the durable format, so swapping the hash would
//! orphan every vault ever created. Don't.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a `Vec<u8>`. Prefer [`sha256_array`] when
/// the fixed-size type propagates naturally.
///
/// # Example
///
/// ```
/// use timelock_protocol::crypto::sha256;
///
/// let hash = sha256(b"time locked");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    hashv(&[data])
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Feeding the parts sequentially into the hasher gives the same digest as
/// hashing their concatenation, minus the temporary buffer. This is the
/// primitive behind address derivation, where the preimage is a list of
/// seeds.
pub fn hashv(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Computes the 8-byte type discriminator for a named account type.
///
/// `discriminator("Vault")` is the first 8 bytes of
/// `sha256("account:Vault")`. Every typed account starts with its
/// discriminator, so decoding the wrong type fails loudly instead of
/// producing garbage.
pub fn discriminator(type_name: &str) -> [u8; 8] {
    let digest = hashv(&[b"account:", type_name.as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}
