//! Ledger error type.

use thiserror::Error;

use crate::crypto::address::AddressError;
use crate::crypto::keys::Pubkey;

/// Everything that can go wrong inside the host ledger or the typed-asset
/// ledger on top of it.
///
/// Business failures abort the surrounding transaction and leave zero state
/// change. `Storage` is the only variant that means the disk itself is
/// unhappy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The paying wallet can't cover the debit.
    #[error("insufficient funds in {account}: need {needed} lamports, have {available}")]
    InsufficientFunds {
        account: Pubkey,
        needed: u64,
        available: u64,
    },

    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Tried to allocate an address that is already live.
    #[error("account already in use: {0}")]
    AccountAlreadyInUse(Pubkey),

    /// The address is not an initialized mint.
    #[error("invalid mint: {0}")]
    InvalidMint(Pubkey),

    #[error("mint mismatch: expected {expected}, found {found}")]
    MintMismatch { expected: Pubkey, found: Pubkey },

    #[error("decimals mismatch: expected {expected}, found {found}")]
    DecimalsMismatch { expected: u8, found: u8 },

    #[error("insufficient tokens in {account}: need {needed}, have {available}")]
    InsufficientTokens {
        account: Pubkey,
        needed: u64,
        available: u64,
    },

    /// Token accounts must be drained before they can be closed.
    #[error("token account {account} still holds {amount} units")]
    NonZeroTokenBalance { account: Pubkey, amount: u64 },

    /// The caller is not the owner (or authority) the account names.
    #[error("owner mismatch on {account}: expected {expected}, found {found}")]
    OwnerMismatch {
        account: Pubkey,
        expected: Pubkey,
        found: Pubkey,
    },

    /// A data-carrying account would fall below its storage deposit.
    #[error("rent not covered for {account}: need {needed} lamports, have {available}")]
    RentNotCovered {
        account: Pubkey,
        needed: u64,
        available: u64,
    },

    /// A balance would exceed `u64::MAX`.
    #[error("arithmetic overflow")]
    Overflow,

    #[error("address derivation failed: {0}")]
    Address(#[from] AddressError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for LedgerError {
    fn from(e: sled::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
