// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Timelock Protocol: Core Library
//!
//! The ledger that time-locked vaults live on. Nothing in here knows what a
//! vault is; it provides the ground the vault program stands on:
//!
//! - **crypto**: Ed25519 identities and signatures, SHA-256, and
//!   off-curve derived addresses that no private key can sign for.
//! - **ledger**: a sled-backed account store with all-or-nothing
//!   transactions, storage deposits (rent), and a pluggable clock.
//! - **token**: a small fungible-asset program: mints, holding accounts,
//!   decimals-checked transfers.
//! - **config**: program identities and every other constant.
//!
//! ## Design Philosophy
//!
//! 1. One operation, one transaction. If any check fails, nothing moved.
//! 2. Addresses are recomputed, never looked up.
//! 3. Every account is just `(lamports, owner, data)`. No special cases.
//! 4. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod token;

pub use crypto::keys::{Keypair, Pubkey, Signature, Signer};
pub use ledger::{Clock, Ledger, LedgerError, LedgerResult, LedgerTxn, TxResult};
