//! # Accounts & Rent
//!
//! The ledger is a flat map from 32-byte address to [`Account`]. There are
//! no special cases: wallets, mints, token holdings and vault records are
//! all the same struct, distinguished only by `owner` (which program may
//! touch `data`) and the bytes inside `data`.
//!
//! ## Rent
//!
//! Storage isn't free. Every account that carries data must hold a
//! minimum lamport balance proportional to its size:
//!
//! ```text
//! minimum_balance(space) = (128 + space) * 3_480 * 2
//! ```
//!
//! The deposit is parked, not burned: closing the account hands every
//! lamport back to whoever the closer names.

use serde::{Deserialize, Serialize};

use crate::config::{
    ACCOUNT_STORAGE_OVERHEAD, EXEMPTION_THRESHOLD_YEARS, LAMPORTS_PER_BYTE_YEAR,
    SYSTEM_PROGRAM_ID,
};
use crate::crypto::keys::Pubkey;

/// A single ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Native balance, in lamports.
    pub lamports: u64,
    /// The program allowed to mutate `data` and debit `lamports`.
    pub owner: Pubkey,
    /// Program-defined contents. Fixed size once allocated.
    pub data: Vec<u8>,
}

impl Account {
    /// A plain wallet: system-owned, no data.
    pub fn wallet(lamports: u64) -> Self {
        Self {
            lamports,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
        }
    }

    /// A zero-filled data account of `space` bytes owned by `owner`.
    pub fn allocate(lamports: u64, space: usize, owner: Pubkey) -> Self {
        Self {
            lamports,
            owner,
            data: vec![0u8; space],
        }
    }

    /// Returns `true` for system-owned accounts.
    pub fn is_wallet(&self) -> bool {
        self.owner == SYSTEM_PROGRAM_ID
    }

    /// Whether the balance covers the storage deposit for this account's size.
    pub fn is_rent_exempt(&self) -> bool {
        self.lamports >= Rent::minimum_balance(self.data.len())
    }
}

/// Storage deposit calculator.
pub struct Rent;

impl Rent {
    /// Minimum lamports an account of `space` data bytes must hold.
    pub fn minimum_balance(space: usize) -> u64 {
        (ACCOUNT_STORAGE_OVERHEAD + space as u64) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_THRESHOLD_YEARS
    }
}
