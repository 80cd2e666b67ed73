//! # Withdrawals
//!
//! `WithdrawNative` and `WithdrawAsset`. The checks run in a fixed order so
//! callers get the most fundamental complaint first:
//!
//! 1. a record exists at the address (`VaultDoesNotExist`)
//! 2. the address re-derives from the record (`VaultAddressMismatch`)
//! 3. the signer is the owner (`Unauthorized`)
//! 4. the asset kind matches (`VaultIsNotNative` / `VaultIsNotSplToken`)
//! 5. the ledger clock has reached `unlock_time` (`VaultNotUnlocked`)
//!
//! Then the value moves and the record is closed in the same transaction.
//! A withdrawn vault is gone; a second withdrawal sees `VaultDoesNotExist`.

use timelock_protocol::config::VAULT_PROGRAM_ID;
use timelock_protocol::ledger::{abort, LedgerTxn, TxResult};
use timelock_protocol::token;
use timelock_protocol::{Pubkey, Signer};

use crate::address::{holding_address, verify_vault_address, vault_signer};
use crate::deposit::lift;
use crate::error::VaultError;
use crate::state::{AssetKind, VaultRecord};

/// Loads the record at `vault`, or `VaultDoesNotExist`.
pub fn load_record(
    txn: &LedgerTxn<'_, VaultError>,
    vault: &Pubkey,
) -> TxResult<VaultRecord, VaultError> {
    let Some(account) = txn.get(vault)? else {
        return abort(VaultError::VaultDoesNotExist);
    };
    if account.owner != VAULT_PROGRAM_ID || !VaultRecord::is_vault_data(&account.data) {
        return abort(VaultError::VaultDoesNotExist);
    }
    lift(VaultRecord::unpack(&account.data))
}

/// Checks 1-3: exists, address, owner.
fn authorize(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    vault: &Pubkey,
) -> TxResult<VaultRecord, VaultError> {
    let record = load_record(txn, vault)?;
    lift(verify_vault_address(vault, &record))?;
    if record.owner != payer.pubkey() {
        return abort(VaultError::Unauthorized);
    }
    Ok(record)
}

fn check_unlocked(record: &VaultRecord, now: i64) -> TxResult<(), VaultError> {
    if !record.is_unlocked(now) {
        return abort(VaultError::VaultNotUnlocked {
            unlock_time: record.unlock_time,
            now,
        });
    }
    Ok(())
}

/// Releases a native vault to its owner. Returns the record and the
/// lamports paid out (escrowed amount plus the storage deposit).
pub fn withdraw_native(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    vault: &Pubkey,
    now: i64,
) -> TxResult<(VaultRecord, u64), VaultError> {
    let record = authorize(txn, payer, vault)?;
    if record.asset_kind != AssetKind::Native {
        return abort(VaultError::VaultIsNotNative);
    }
    check_unlocked(&record, now)?;

    let released = txn.close_account(&VAULT_PROGRAM_ID, vault, &payer.pubkey())?;
    Ok((record, released))
}

/// Releases an asset vault to its owner. Returns the record and the token
/// units paid out.
///
/// The owner's associated holding account is created if missing. The vault's
/// holding account is drained, closed, and its deposit refunded along with
/// the record's.
pub fn withdraw_asset(
    txn: &LedgerTxn<'_, VaultError>,
    payer: &Signer,
    vault: &Pubkey,
    mint: &Pubkey,
    now: i64,
) -> TxResult<(VaultRecord, u64), VaultError> {
    let record = authorize(txn, payer, vault)?;
    let decimals = match record.asset_kind {
        AssetKind::Asset { mint: m, decimals } if m == *mint => decimals,
        _ => return abort(VaultError::VaultIsNotSplToken),
    };
    check_unlocked(&record, now)?;

    let owner = payer.pubkey();
    let holding = lift(holding_address(vault, mint))?;
    let signer = lift(vault_signer(&record))?;

    let destination = token::get_or_create_associated_account(txn, payer, &owner, mint)?;
    let balance = token::load_token_account(txn, &holding)?.amount;
    token::transfer_checked(txn, &holding, mint, &destination, &signer, balance, decimals)?;
    token::close_account(txn, &holding, &owner, &signer)?;
    txn.close_account(&VAULT_PROGRAM_ID, vault, &owner)?;
    Ok((record, balance))
}
