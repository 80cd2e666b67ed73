//! # Ledger Transactions
//!
//! [`LedgerTxn`] is the only way to mutate accounts. It wraps a sled
//! `TransactionalTree`, so every read and write inside one
//! [`Ledger::atomically`](super::Ledger::atomically) call is serializable
//! and all-or-nothing.
//!
//! ## Error plumbing
//!
//! A transaction is typed by the caller's error `E` (anything that a
//! [`LedgerError`] converts into). A failed check *aborts* with `E`; a sled
//! conflict passes through untouched so sled can retry the closure. Callers
//! just use `?` and never see the difference.
//!
//! The closure may run more than once. Don't log, count, or send from inside
//! it. Do that after the commit.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};

pub use sled::transaction::{abort, ConflictableTransactionError};

use super::account::{Account, Rent};
use super::error::LedgerError;
use crate::config::SYSTEM_PROGRAM_ID;
use crate::crypto::keys::{Pubkey, Signer};

/// Result type for code running inside a ledger transaction.
pub type TxResult<T, E = LedgerError> = ConflictableTransactionResult<T, E>;

/// Aborts the current transaction with a ledger error.
pub fn fail<T, E: From<LedgerError>>(err: LedgerError) -> TxResult<T, E> {
    abort(E::from(err))
}

/// A view of the account tree inside one atomic transaction.
///
/// `E` is the error the surrounding transaction aborts with.
pub struct LedgerTxn<'a, E = LedgerError> {
    tree: &'a TransactionalTree,
    _abort: PhantomData<fn() -> E>,
}

impl<'a, E: From<LedgerError>> LedgerTxn<'a, E> {
    pub(crate) fn new(tree: &'a TransactionalTree) -> Self {
        Self {
            tree,
            _abort: PhantomData,
        }
    }

    // -- Raw access ---------------------------------------------------------

    /// Loads an account, or `None` if the address is empty.
    pub fn get(&self, address: &Pubkey) -> TxResult<Option<Account>, E> {
        match self.tree.get(address.as_ref())? {
            Some(bytes) => match bincode::deserialize(&bytes) {
                Ok(account) => Ok(Some(account)),
                Err(e) => fail(e.into()),
            },
            None => Ok(None),
        }
    }

    /// Loads an account that must exist.
    pub fn get_required(&self, address: &Pubkey) -> TxResult<Account, E> {
        match self.get(address)? {
            Some(account) => Ok(account),
            None => fail(LedgerError::AccountNotFound(*address)),
        }
    }

    pub fn exists(&self, address: &Pubkey) -> TxResult<bool, E> {
        Ok(self.tree.get(address.as_ref())?.is_some())
    }

    /// Writes an account back.
    pub fn put(&self, address: &Pubkey, account: &Account) -> TxResult<(), E> {
        let bytes = match bincode::serialize(account) {
            Ok(bytes) => bytes,
            Err(e) => return fail(e.into()),
        };
        self.tree.insert(address.as_ref(), bytes)?;
        Ok(())
    }

    // -- System operations ---------------------------------------------------

    /// Allocates a data account of `space` bytes owned by `owner`, funded by
    /// `payer` up to the storage deposit. Returns what the payer was charged.
    ///
    /// Both the payer and the new address must sign. For derived addresses
    /// that means the owning program presents a
    /// [`derived_signer`](crate::crypto::address::derived_signer).
    ///
    /// Anyone can send lamports to an address before it is allocated. A
    /// plain wallet found there is taken over: its balance counts toward the
    /// deposit and any excess stays in the new account. Anything else at the
    /// address is `AccountAlreadyInUse`.
    pub fn create_account(
        &self,
        payer: &Signer,
        new_account: &Signer,
        space: usize,
        owner: &Pubkey,
    ) -> TxResult<u64, E> {
        let address = new_account.pubkey();
        let prefunded = match self.get(&address)? {
            None => 0,
            Some(existing)
                if existing.is_wallet()
                    && existing.data.is_empty()
                    && payer.pubkey() != address =>
            {
                existing.lamports
            }
            Some(_) => return fail(LedgerError::AccountAlreadyInUse(address)),
        };

        let charged = Rent::minimum_balance(space).saturating_sub(prefunded);
        if charged > 0 {
            self.debit_wallet(&payer.pubkey(), charged)?;
        }
        let lamports = match prefunded.checked_add(charged) {
            Some(total) => total,
            None => return fail(LedgerError::Overflow),
        };
        self.put(&address, &Account::allocate(lamports, space, *owner))?;
        Ok(charged)
    }

    /// Moves lamports from a wallet to any address. A missing destination
    /// becomes a new wallet.
    pub fn transfer_lamports(
        &self,
        from: &Signer,
        to: &Pubkey,
        lamports: u64,
    ) -> TxResult<(), E> {
        self.debit_wallet(&from.pubkey(), lamports)?;
        self.credit(to, lamports)
    }

    /// Adds lamports to an address, creating a wallet if it's empty.
    ///
    /// Crediting never needs a signature.
    pub fn credit(&self, address: &Pubkey, lamports: u64) -> TxResult<(), E> {
        let mut account = self.get(address)?.unwrap_or_else(|| Account::wallet(0));
        account.lamports = match account.lamports.checked_add(lamports) {
            Some(total) => total,
            None => return fail(LedgerError::Overflow),
        };
        self.put(address, &account)
    }

    /// Deletes a program-owned account and sends all of its lamports to
    /// `destination`.
    ///
    /// Only the owning program may close an account; `program` is the
    /// identity of the calling program, checked against the account's owner.
    pub fn close_account(
        &self,
        program: &Pubkey,
        address: &Pubkey,
        destination: &Pubkey,
    ) -> TxResult<u64, E> {
        let account = self.get_required(address)?;
        if account.owner != *program {
            return fail(LedgerError::OwnerMismatch {
                account: *address,
                expected: *program,
                found: account.owner,
            });
        }
        self.tree.remove(address.as_ref())?;
        self.credit(destination, account.lamports)?;
        Ok(account.lamports)
    }

    // -- Typed data -----------------------------------------------------------

    /// Returns the raw data of an account owned by `program`.
    pub fn read_data(
        &self,
        program: &Pubkey,
        address: &Pubkey,
    ) -> TxResult<Vec<u8>, E> {
        Ok(self.owned_account(program, address)?.data)
    }

    /// Overwrites the data of an account owned by `program`. Shorter
    /// payloads are zero-padded; the allocation never grows.
    pub fn write_data(
        &self,
        program: &Pubkey,
        address: &Pubkey,
        payload: &[u8],
    ) -> TxResult<(), E> {
        let mut account = self.owned_account(program, address)?;
        if payload.len() > account.data.len() {
            return fail(LedgerError::Serialization(format!(
                "{} bytes do not fit a {}-byte account",
                payload.len(),
                account.data.len()
            )));
        }
        account.data[..payload.len()].copy_from_slice(payload);
        account.data[payload.len()..].fill(0);
        self.put(address, &account)
    }

    /// Decodes the bincode state of a program-owned account.
    pub fn read_state<T: DeserializeOwned>(
        &self,
        program: &Pubkey,
        address: &Pubkey,
    ) -> TxResult<T, E> {
        let data = self.read_data(program, address)?;
        match bincode::deserialize(&data) {
            Ok(state) => Ok(state),
            Err(e) => fail(e.into()),
        }
    }

    /// Encodes `state` into a program-owned account.
    pub fn write_state<T: Serialize>(
        &self,
        program: &Pubkey,
        address: &Pubkey,
        state: &T,
    ) -> TxResult<(), E> {
        let bytes = match bincode::serialize(state) {
            Ok(bytes) => bytes,
            Err(e) => return fail(e.into()),
        };
        self.write_data(program, address, &bytes)
    }

    // -- Internals ------------------------------------------------------------

    fn owned_account(
        &self,
        program: &Pubkey,
        address: &Pubkey,
    ) -> TxResult<Account, E> {
        let account = self.get_required(address)?;
        if account.owner != *program {
            return fail(LedgerError::OwnerMismatch {
                account: *address,
                expected: *program,
                found: account.owner,
            });
        }
        Ok(account)
    }

    fn debit_wallet(&self, address: &Pubkey, lamports: u64) -> TxResult<(), E> {
        let Some(mut account) = self.get(address)? else {
            return fail(LedgerError::InsufficientFunds {
                account: *address,
                needed: lamports,
                available: 0,
            });
        };
        if account.owner != SYSTEM_PROGRAM_ID {
            return fail(LedgerError::OwnerMismatch {
                account: *address,
                expected: SYSTEM_PROGRAM_ID,
                found: account.owner,
            });
        }
        if account.lamports < lamports {
            return fail(LedgerError::InsufficientFunds {
                account: *address,
                needed: lamports,
                available: account.lamports,
            });
        }
        account.lamports -= lamports;
        self.put(address, &account)
    }
}
