//! # Cryptographic Primitives
//!
//! Everything security-related in the ledger flows through here:
//!
//! - **Ed25519** for signatures: who authorized a deposit or withdrawal.
//! - **SHA-256** for derived addresses, account discriminators, and
//!   transaction ids.
//! - **Off-curve derivation** for vault and holding-account addresses,
//!   so no private party can ever hold their keys.
//!
//! Everything here is a thin, type-safe wrapper around audited crates.
//! We don't roll our own.

pub mod address;
pub mod hash;
pub mod keys;

pub use address::{
    associated_token_address, create_program_address, derived_signer, find_program_address,
    is_on_curve, AddressError,
};
pub use hash::{discriminator, hashv, sha256, sha256_array};
pub use keys::{KeyError, Keypair, Pubkey, Signature, Signer};
