//! Token program operations.
//!
//! Every function here runs inside a caller's [`LedgerTxn`], so a vault
//! deposit can create a record, allocate a holding account and move tokens
//! in one atomic step.

use super::state::{Mint, TokenAccount};
use crate::config::{
    ASSOCIATED_TOKEN_PROGRAM_ID, MINT_ACCOUNT_SPACE, TOKEN_ACCOUNT_SPACE, TOKEN_PROGRAM_ID,
};
use crate::crypto::address::{derived_signer, find_program_address, AddressError};
use crate::crypto::keys::{Pubkey, Signer};
use crate::ledger::{fail, Ledger, LedgerError, LedgerResult, LedgerTxn, TxResult};

fn address_result<T, E: From<LedgerError>>(r: Result<T, AddressError>) -> TxResult<T, E> {
    r.or_else(|e| fail(e.into()))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads an initialized mint, or fails with `InvalidMint`.
pub fn load_mint<E: From<LedgerError>>(txn: &LedgerTxn<'_, E>, mint: &Pubkey) -> TxResult<Mint, E> {
    let Some(account) = txn.get(mint)? else {
        return fail(LedgerError::InvalidMint(*mint));
    };
    if account.owner != TOKEN_PROGRAM_ID || account.data.len() != MINT_ACCOUNT_SPACE {
        return fail(LedgerError::InvalidMint(*mint));
    }
    match bincode::deserialize::<Mint>(&account.data) {
        Ok(state) if state.is_initialized => Ok(state),
        _ => fail(LedgerError::InvalidMint(*mint)),
    }
}

/// Loads a token holding account.
pub fn load_token_account<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    address: &Pubkey,
) -> TxResult<TokenAccount, E> {
    let account = txn.get_required(address)?;
    if account.owner != TOKEN_PROGRAM_ID {
        return fail(LedgerError::OwnerMismatch {
            account: *address,
            expected: TOKEN_PROGRAM_ID,
            found: account.owner,
        });
    }
    if account.data.len() != TOKEN_ACCOUNT_SPACE {
        return fail(LedgerError::Serialization(format!(
            "{address} is not a token account"
        )));
    }
    match bincode::deserialize(&account.data) {
        Ok(state) => Ok(state),
        Err(e) => fail(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Creates and initializes a mint at the address held by `mint`.
pub fn create_mint<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    payer: &Signer,
    mint: &Signer,
    authority: &Pubkey,
    decimals: u8,
) -> TxResult<(), E> {
    txn.create_account(payer, mint, MINT_ACCOUNT_SPACE, &TOKEN_PROGRAM_ID)?;
    txn.write_state(
        &TOKEN_PROGRAM_ID,
        &mint.pubkey(),
        &Mint {
            mint_authority: Some(*authority),
            supply: 0,
            decimals,
            is_initialized: true,
        },
    )
}

/// Creates `wallet`'s associated holding account for `mint`, rent paid by
/// `payer`. Fails with `AccountAlreadyInUse` if it already exists.
///
/// `wallet` does not have to sign: anyone may open a holding account on
/// someone else's behalf, it only ever receives.
pub fn create_associated_account<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    payer: &Signer,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> TxResult<Pubkey, E> {
    load_mint(txn, mint)?;

    let (address, bump) = address_result(find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    ))?;
    let account_signer = address_result(derived_signer(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref(), &[bump]],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    ))?;

    txn.create_account(payer, &account_signer, TOKEN_ACCOUNT_SPACE, &TOKEN_PROGRAM_ID)?;
    txn.write_state(
        &TOKEN_PROGRAM_ID,
        &address,
        &TokenAccount {
            mint: *mint,
            owner: *wallet,
            amount: 0,
        },
    )?;
    Ok(address)
}

/// Like [`create_associated_account`], but returns the existing account
/// untouched if it's already there. An existing account must hold `mint`
/// for `wallet`.
pub fn get_or_create_associated_account<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    payer: &Signer,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> TxResult<Pubkey, E> {
    let (address, _) = address_result(find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    ))?;
    if txn.exists(&address)? {
        let holding = load_token_account(txn, &address)?;
        if holding.mint != *mint {
            return fail(LedgerError::MintMismatch {
                expected: *mint,
                found: holding.mint,
            });
        }
        if holding.owner != *wallet {
            return fail(LedgerError::OwnerMismatch {
                account: address,
                expected: *wallet,
                found: holding.owner,
            });
        }
        return Ok(address);
    }
    create_associated_account(txn, payer, wallet, mint)
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Creates `amount` new units in `destination`. Only the mint authority
/// may call this.
pub fn mint_to<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Signer,
    amount: u64,
) -> TxResult<(), E> {
    let mut mint_state = load_mint(txn, mint)?;
    if mint_state.mint_authority != Some(authority.pubkey()) {
        return fail(LedgerError::OwnerMismatch {
            account: *mint,
            expected: mint_state.mint_authority.unwrap_or_default(),
            found: authority.pubkey(),
        });
    }

    let mut holding = load_token_account(txn, destination)?;
    if holding.mint != *mint {
        return fail(LedgerError::MintMismatch {
            expected: *mint,
            found: holding.mint,
        });
    }

    let (Some(supply), Some(balance)) = (
        mint_state.supply.checked_add(amount),
        holding.amount.checked_add(amount),
    ) else {
        return fail(LedgerError::Overflow);
    };
    mint_state.supply = supply;
    holding.amount = balance;

    txn.write_state(&TOKEN_PROGRAM_ID, mint, &mint_state)?;
    txn.write_state(&TOKEN_PROGRAM_ID, destination, &holding)
}

/// Moves `amount` units from `source` to `destination`.
///
/// The caller must quote the mint and its decimals. A transfer that names
/// the wrong mint or the wrong precision fails instead of moving a
/// different asset, or a thousandfold different amount, than intended.
pub fn transfer_checked<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    source: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Signer,
    amount: u64,
    decimals: u8,
) -> TxResult<(), E> {
    let mint_state = load_mint(txn, mint)?;
    if mint_state.decimals != decimals {
        return fail(LedgerError::DecimalsMismatch {
            expected: mint_state.decimals,
            found: decimals,
        });
    }

    let mut from = load_token_account(txn, source)?;
    if from.mint != *mint {
        return fail(LedgerError::MintMismatch {
            expected: *mint,
            found: from.mint,
        });
    }
    if from.owner != authority.pubkey() {
        return fail(LedgerError::OwnerMismatch {
            account: *source,
            expected: from.owner,
            found: authority.pubkey(),
        });
    }

    let mut to = load_token_account(txn, destination)?;
    if to.mint != *mint {
        return fail(LedgerError::MintMismatch {
            expected: *mint,
            found: to.mint,
        });
    }

    if from.amount < amount {
        return fail(LedgerError::InsufficientTokens {
            account: *source,
            needed: amount,
            available: from.amount,
        });
    }
    if source == destination {
        return Ok(());
    }

    from.amount -= amount;
    to.amount = match to.amount.checked_add(amount) {
        Some(total) => total,
        None => return fail(LedgerError::Overflow),
    };
    txn.write_state(&TOKEN_PROGRAM_ID, source, &from)?;
    txn.write_state(&TOKEN_PROGRAM_ID, destination, &to)
}

/// Closes an empty holding account, sending its storage deposit to
/// `destination`. Returns the lamports released.
pub fn close_account<E: From<LedgerError>>(
    txn: &LedgerTxn<'_, E>,
    account: &Pubkey,
    destination: &Pubkey,
    authority: &Signer,
) -> TxResult<u64, E> {
    let holding = load_token_account(txn, account)?;
    if holding.owner != authority.pubkey() {
        return fail(LedgerError::OwnerMismatch {
            account: *account,
            expected: holding.owner,
            found: authority.pubkey(),
        });
    }
    if holding.amount != 0 {
        return fail(LedgerError::NonZeroTokenBalance {
            account: *account,
            amount: holding.amount,
        });
    }
    txn.close_account(&TOKEN_PROGRAM_ID, account, destination)
}

// ---------------------------------------------------------------------------
// Committed-state reads
// ---------------------------------------------------------------------------

impl Ledger {
    /// The committed state of a mint.
    pub fn mint(&self, mint: &Pubkey) -> LedgerResult<Mint> {
        self.atomically(|txn: &LedgerTxn<'_>| load_mint(txn, mint))
    }

    /// The committed state of a holding account. A closed account reports
    /// `AccountNotFound`.
    pub fn token_account(&self, address: &Pubkey) -> LedgerResult<TokenAccount> {
        self.atomically(|txn: &LedgerTxn<'_>| load_token_account(txn, address))
    }

    /// Shorthand for `token_account(address)?.amount`.
    pub fn token_balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        Ok(self.token_account(address)?.amount)
    }
}
