//! # Typed-Asset Ledger
//!
//! A minimal fungible-token program on top of the host ledger: mints,
//! holding accounts, associated-account derivation, decimals-checked
//! transfers, and closure of empty accounts.
//!
//! Every mint and holding account is owned by
//! [`TOKEN_PROGRAM_ID`](crate::config::TOKEN_PROGRAM_ID). A holding
//! account's `owner` field names the authority that may move its balance,
//! which can be a wallet or a derived address such as a vault.

pub mod ops;
pub mod state;

pub use ops::{
    close_account, create_associated_account, create_mint, get_or_create_associated_account,
    load_mint, load_token_account, mint_to, transfer_checked,
};
pub use state::{Mint, TokenAccount};
