//! Token program account layouts.

use serde::{Deserialize, Serialize};

use crate::crypto::keys::Pubkey;

/// A fungible asset definition.
///
/// Stored bincode-encoded at the front of a
/// [`MINT_ACCOUNT_SPACE`](crate::config::MINT_ACCOUNT_SPACE)-byte account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    /// Who may create new supply. `None` means the supply is fixed.
    pub mint_authority: Option<Pubkey>,
    /// Total units in circulation.
    pub supply: u64,
    /// Display precision. Transfers must quote it back.
    pub decimals: u8,
    pub is_initialized: bool,
}

/// A balance of one mint held on behalf of one owner.
///
/// `owner` is the authority that can move the balance, which is not the
/// same thing as the ledger owner of the account (always the token
/// program).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}
