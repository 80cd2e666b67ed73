//! # Deposits
//!
//! `CreateNativeVault` and `CreateAssetVault`. Both run entirely inside the
//! caller's ledger transaction: every check happens before the first write,
//! and any failure after that rolls the whole thing back anyway.
//!
//! ## Native
//!
//! ```text
//! payer --rent--> record account (allocated, VAULT_ACCOUNT_SPACE)
//! payer --amount--> record account
//! ```
//!
//! Lamports already sitting at the vault address (anyone can send them) are
//! folded into the record account and reduce the rent the payer is charged.
//!
//! ## Asset
//!
//! ```text
//! payer --rent--> record account
//! payer --rent--> vault's holding account (derived from vault + mint, reused if already open)
//! payer's holding account --amount (decimals-checked)--> vault's holding account
//! ```

use timelock_protocol::config::VAULT_PROGRAM_ID;
use timelock_protocol::crypto::address::associated_token_address;
use timelock_protocol::ledger::{abort, ConflictableTransactionError, LedgerTxn, TxResult};
use timelock_protocol::token;
use timelock_protocol::{Pubkey, Signer};

use crate::address::{holding_address, validate_id, vault_address, vault_signer};
use crate::error::VaultError;
use crate::state::{AssetKind, VaultRecord, VAULT_ACCOUNT_SPACE};

/// Lifts a plain vault result into the transaction.
pub(crate) fn lift<T>(r: Result<T, VaultError>) -> TxResult<T, VaultError> {
    r.map_err(ConflictableTransactionError::Abort)
}

/// Parameters shared by both deposit kinds.
#[derive(Debug, Clone)]
pub struct DepositParams<'a> {
    pub id: &'a str,
    pub amount: u64,
    pub unlock_time: i64,
    /// Ledger clock at execution; becomes `created_at`.
    pub now: i64,
}

/// Validates the common inputs and checks no vault is live at the address.
/// A plain wallet there is not a vault.
fn claim(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    params: &DepositParams<'_>,
) -> TxResult<(Pubkey, u8), VaultError> {
    lift(validate_id(params.id))?;
    if params.amount == 0 {
        return abort(VaultError::ZeroAmount);
    }
    let (vault, bump) = lift(vault_address(&payer.pubkey(), params.id))?;
    if let Some(existing) = txn.get(&vault)? {
        if !(existing.is_wallet() && existing.data.is_empty()) {
            return abort(VaultError::VaultAlreadyExists);
        }
    }
    Ok((vault, bump))
}

fn new_record(payer: &Signer, params: &DepositParams<'_>, bump: u8, asset_kind: AssetKind) -> VaultRecord {
    VaultRecord {
        id: params.id.to_string(),
        owner: payer.pubkey(),
        asset_kind,
        amount: params.amount,
        unlock_time: params.unlock_time,
        created_at: params.now,
        bump,
    }
}

/// Allocates the record account and writes the record into it.
fn write_record(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    vault: &Pubkey,
    record: &VaultRecord,
) -> TxResult<(), VaultError> {
    let signer = lift(vault_signer(record))?;
    txn.create_account(payer, &signer, VAULT_ACCOUNT_SPACE, &VAULT_PROGRAM_ID)?;
    txn.write_data(&VAULT_PROGRAM_ID, vault, &lift(record.pack())?)
}

/// Locks `amount` lamports from `payer` until `unlock_time`.
pub fn create_native_vault(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    params: &DepositParams<'_>,
) -> TxResult<(Pubkey, VaultRecord), VaultError> {
    let (vault, bump) = claim(txn, payer, params)?;
    let record = new_record(payer, params, bump, AssetKind::Native);
    write_record(txn, payer, &vault, &record)?;
    txn.transfer_lamports(payer, &vault, params.amount)?;
    Ok((vault, record))
}

/// Locks `amount` units of `mint` from the payer's associated holding
/// account until `unlock_time`.
///
/// `explicit_holding`, if given, must be the vault's derived holding
/// address.
pub fn create_asset_vault(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    params: &DepositParams<'_>,
    mint: &Pubkey,
    explicit_holding: Option<&Pubkey>,
) -> TxResult<(Pubkey, VaultRecord), VaultError> {
    let (vault, bump) = claim(txn, payer, params)?;
    let mint_state = token::load_mint(txn, mint)?;
    let asset_kind = AssetKind::Asset {
        mint: *mint,
        decimals: mint_state.decimals,
    };
    let record = new_record(payer, params, bump, asset_kind);

    let holding = lift(holding_address(&vault, mint))?;
    if explicit_holding.is_some_and(|h| *h != holding) {
        return abort(VaultError::HoldingAccountMismatch);
    }

    write_record(txn, payer, &vault, &record)?;
    token::get_or_create_associated_account(txn, payer, &vault, mint)?;

    let source = lift(associated_token_address(&payer.pubkey(), mint).map_err(VaultError::from))?;
    token::transfer_checked(
        txn,
        &source,
        mint,
        &holding,
        payer,
        params.amount,
        mint_state.decimals,
    )?;
    Ok((vault, record))
}
