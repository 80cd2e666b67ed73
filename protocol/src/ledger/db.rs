//! # Ledger: Persistent Account Store
//!
//! The host ledger, built on sled's embedded key-value store. Every account
//! lives in a single tree:
//!
//! | Tree       | Key                 | Value             |
//! |------------|---------------------|-------------------|
//! | `accounts` | address (32 bytes)  | `bincode(Account)`|
//!
//! ## Atomicity
//!
//! All mutation goes through [`Ledger::atomically`], which runs a closure
//! inside a sled transaction. Either every write in the closure lands or
//! none does. Concurrent transactions touching the same address are
//! serialized; sled detects the conflict and re-runs the loser against
//! the winner's state, so "check then write" inside one closure is race-free.
//!
//! Reads outside a transaction (queries, the API) see the last committed
//! state.

use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;

use super::account::Account;
use super::error::{LedgerError, LedgerResult};
use super::txn::{LedgerTxn, TxResult};
use crate::crypto::keys::Pubkey;

/// Persistent account store.
///
/// Cheap to clone: clones share the same underlying sled handle, so a
/// `Ledger` can be handed to every request handler without an `Arc`.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Db,
    accounts: Tree,
}

impl Ledger {
    /// Open or create a ledger at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path.as_ref())?;
        let ledger = Self::from_db(db)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            accounts = ledger.account_count(),
            "ledger opened"
        );
        Ok(ledger)
    }

    /// A throwaway in-memory ledger, removed on drop. For tests and demos.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        let accounts = db.open_tree("accounts")?;
        Ok(Self { db, accounts })
    }

    // -- Transactions -------------------------------------------------------

    /// Runs `f` as one serializable, all-or-nothing ledger transaction.
    ///
    /// `f` may be called several times if it races with another writer, so
    /// it must be free of side effects outside the ledger.
    pub fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<LedgerError>,
        F: Fn(&LedgerTxn<'_, E>) -> TxResult<T, E>,
    {
        self.accounts
            .transaction(|tree| f(&LedgerTxn::new(tree)))
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => E::from(LedgerError::from(e)),
            })
    }

    /// Credits lamports to an address, creating a wallet if needed.
    ///
    /// This is how balances enter the ledger at all: genesis allocations and
    /// test fixtures. There is no signed instruction that reaches it.
    pub fn fund_account(&self, address: &Pubkey, lamports: u64) -> LedgerResult<()> {
        self.atomically(|txn: &LedgerTxn<'_>| txn.credit(address, lamports))?;
        tracing::debug!(%address, lamports, "account funded");
        Ok(())
    }

    // -- Reads ----------------------------------------------------------------

    /// Loads the committed state of an account.
    pub fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<Account>> {
        match self.accounts.get(address.as_ref())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Native balance in lamports. An empty address has zero.
    pub fn balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        Ok(self.get_account(address)?.map_or(0, |a| a.lamports))
    }

    /// Every account owned by `program`, in address order.
    ///
    /// A full scan. The ledger keeps no secondary indexes, so enumeration
    /// always reflects exactly what is stored.
    pub fn program_accounts(&self, program: &Pubkey) -> LedgerResult<Vec<(Pubkey, Account)>> {
        let mut out = Vec::new();
        for entry in self.accounts.iter() {
            let (key, value) = entry?;
            let account: Account = bincode::deserialize(&value)?;
            if account.owner != *program {
                continue;
            }
            let address = Pubkey::try_from_slice(&key)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            out.push((address, account));
        }
        Ok(out)
    }

    /// Sum of every lamport in the ledger. Deposits and withdrawals move
    /// value around; only [`fund_account`](Self::fund_account) changes this.
    pub fn total_lamports(&self) -> LedgerResult<u128> {
        let mut total = 0u128;
        for entry in self.accounts.iter() {
            let (_key, value) = entry?;
            let account: Account = bincode::deserialize(&value)?;
            total += u128::from(account.lamports);
        }
        Ok(total)
    }

    /// Return the number of live accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SYSTEM_PROGRAM_ID, VAULT_PROGRAM_ID};
    use crate::crypto::address::{derived_signer, find_program_address};
    use crate::crypto::keys::{Keypair, Signer};
    use crate::ledger::account::Rent;
    use std::sync::Arc;
    use std::thread;

    fn funded(ledger: &Ledger, lamports: u64) -> Keypair {
        let kp = Keypair::generate();
        ledger.fund_account(&kp.pubkey(), lamports).unwrap();
        kp
    }

    #[test]
    fn open_temporary_ledger_is_empty() {
        let ledger = Ledger::open_temporary().expect("should create temp ledger");
        assert_eq!(ledger.account_count(), 0);
        assert_eq!(ledger.total_lamports().unwrap(), 0);
    }

    #[test]
    fn fund_creates_wallet_and_accumulates() {
        let ledger = Ledger::open_temporary().unwrap();
        let who = Keypair::generate().pubkey();

        ledger.fund_account(&who, 500).unwrap();
        ledger.fund_account(&who, 250).unwrap();

        let account = ledger.get_account(&who).unwrap().expect("wallet exists");
        assert_eq!(account.lamports, 750);
        assert_eq!(account.owner, SYSTEM_PROGRAM_ID);
        assert_eq!(ledger.balance(&who).unwrap(), 750);
    }

    #[test]
    fn missing_account_has_zero_balance() {
        let ledger = Ledger::open_temporary().unwrap();
        let nobody = Keypair::generate().pubkey();
        assert!(ledger.get_account(&nobody).unwrap().is_none());
        assert_eq!(ledger.balance(&nobody).unwrap(), 0);
    }

    #[test]
    fn transfer_moves_lamports() {
        let ledger = Ledger::open_temporary().unwrap();
        let alice = funded(&ledger, 1_000);
        let bob = Keypair::generate().pubkey();

        ledger
            .atomically(|txn: &LedgerTxn<'_>| txn.transfer_lamports(&Signer::from(&alice), &bob, 400))
            .unwrap();

        assert_eq!(ledger.balance(&alice.pubkey()).unwrap(), 600);
        assert_eq!(ledger.balance(&bob).unwrap(), 400);
        assert_eq!(ledger.total_lamports().unwrap(), 1_000);
    }

    #[test]
    fn overdraft_is_rejected() {
        let ledger = Ledger::open_temporary().unwrap();
        let alice = funded(&ledger, 100);
        let bob = Keypair::generate().pubkey();

        let err = ledger
            .atomically(|txn: &LedgerTxn<'_>| txn.transfer_lamports(&Signer::from(&alice), &bob, 101))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: alice.pubkey(),
                needed: 101,
                available: 100
            }
        );
        assert_eq!(ledger.balance(&alice.pubkey()).unwrap(), 100);
    }

    #[test]
    fn aborted_transaction_leaves_no_trace() {
        let ledger = Ledger::open_temporary().unwrap();
        let alice = funded(&ledger, 1_000);
        let bob = Keypair::generate().pubkey();
        let carol = Keypair::generate().pubkey();

        // First transfer succeeds inside the closure, second fails: neither lands.
        let result = ledger.atomically(|txn: &LedgerTxn<'_>| {
            txn.transfer_lamports(&Signer::from(&alice), &bob, 600)?;
            txn.transfer_lamports(&Signer::from(&alice), &carol, 600)
        });
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(ledger.balance(&alice.pubkey()).unwrap(), 1_000);
        assert!(ledger.get_account(&bob).unwrap().is_none());
    }

    #[test]
    fn create_account_charges_rent_and_refuses_reuse() {
        let ledger = Ledger::open_temporary().unwrap();
        let payer = funded(&ledger, 10_000_000);
        let owner = payer.pubkey();
        let (address, bump) =
            find_program_address(&[b"vault", owner.as_ref(), b"x"], &VAULT_PROGRAM_ID).unwrap();
        let seeds: [&[u8]; 4] = [b"vault", owner.as_ref(), b"x", &[bump]];
        let new = derived_signer(&seeds, &VAULT_PROGRAM_ID).unwrap();

        let deposit = ledger
            .atomically(|txn: &LedgerTxn<'_>| {
                txn.create_account(&Signer::from(&payer), &new, 64, &VAULT_PROGRAM_ID)
            })
            .unwrap();
        assert_eq!(deposit, Rent::minimum_balance(64));

        let account = ledger.get_account(&address).unwrap().unwrap();
        assert_eq!(account.owner, VAULT_PROGRAM_ID);
        assert_eq!(account.data.len(), 64);
        assert!(account.is_rent_exempt());
        assert_eq!(ledger.balance(&payer.pubkey()).unwrap(), 10_000_000 - deposit);

        let again = ledger.atomically(|txn: &LedgerTxn<'_>| {
            txn.create_account(&Signer::from(&payer), &new, 64, &VAULT_PROGRAM_ID)
        });
        assert_eq!(again, Err(LedgerError::AccountAlreadyInUse(address)));
    }

    #[test]
    fn create_account_takes_over_prefunded_wallet() {
        let ledger = Ledger::open_temporary().unwrap();
        let payer = funded(&ledger, 10_000_000);
        let owner = payer.pubkey();
        let rent = Rent::minimum_balance(64);

        let (dusted, bump) =
            find_program_address(&[b"vault", owner.as_ref(), b"d"], &VAULT_PROGRAM_ID).unwrap();
        let seeds: [&[u8]; 4] = [b"vault", owner.as_ref(), b"d", &[bump]];
        let new = derived_signer(&seeds, &VAULT_PROGRAM_ID).unwrap();
        ledger.fund_account(&dusted, 1).unwrap();

        let charged = ledger
            .atomically(|txn: &LedgerTxn<'_>| {
                txn.create_account(&Signer::from(&payer), &new, 64, &VAULT_PROGRAM_ID)
            })
            .unwrap();
        assert_eq!(charged, rent - 1);
        let account = ledger.get_account(&dusted).unwrap().unwrap();
        assert_eq!((account.lamports, account.owner), (rent, VAULT_PROGRAM_ID));
        assert_eq!(ledger.balance(&payer.pubkey()).unwrap(), 10_000_000 - (rent - 1));

        let (rich, bump) =
            find_program_address(&[b"vault", owner.as_ref(), b"r"], &VAULT_PROGRAM_ID).unwrap();
        let seeds: [&[u8]; 4] = [b"vault", owner.as_ref(), b"r", &[bump]];
        let new = derived_signer(&seeds, &VAULT_PROGRAM_ID).unwrap();
        ledger.fund_account(&rich, rent + 50).unwrap();

        let charged = ledger
            .atomically(|txn: &LedgerTxn<'_>| {
                txn.create_account(&Signer::from(&payer), &new, 64, &VAULT_PROGRAM_ID)
            })
            .unwrap();
        assert_eq!(charged, 0);
        assert_eq!(ledger.balance(&rich).unwrap(), rent + 50);
        assert_eq!(ledger.balance(&payer.pubkey()).unwrap(), 10_000_000 - (rent - 1));
    }

    #[test]
    fn payer_cannot_allocate_over_itself() {
        let ledger = Ledger::open_temporary().unwrap();
        let payer = funded(&ledger, 10_000_000);
        let result = ledger.atomically(|txn: &LedgerTxn<'_>| {
            txn.create_account(&Signer::from(&payer), &Signer::from(&payer), 64, &VAULT_PROGRAM_ID)
        });
        assert_eq!(result, Err(LedgerError::AccountAlreadyInUse(payer.pubkey())));
        assert_eq!(ledger.balance(&payer.pubkey()).unwrap(), 10_000_000);
    }

    #[test]
    fn close_account_requires_owner_and_refunds_everything() {
        let ledger = Ledger::open_temporary().unwrap();
        let payer = funded(&ledger, 10_000_000);
        let owner = payer.pubkey();
        let (address, bump) =
            find_program_address(&[b"vault", owner.as_ref(), b"c"], &VAULT_PROGRAM_ID).unwrap();
        let seeds: [&[u8]; 4] = [b"vault", owner.as_ref(), b"c", &[bump]];
        let new = derived_signer(&seeds, &VAULT_PROGRAM_ID).unwrap();
        ledger
            .atomically(|txn: &LedgerTxn<'_>| {
                txn.create_account(&Signer::from(&payer), &new, 16, &VAULT_PROGRAM_ID)?;
                txn.transfer_lamports(&Signer::from(&payer), &address, 1_000)
            })
            .unwrap();

        let wrong = ledger.atomically(|txn: &LedgerTxn<'_>| {
            txn.close_account(&SYSTEM_PROGRAM_ID, &address, &payer.pubkey())
        });
        assert!(matches!(wrong, Err(LedgerError::OwnerMismatch { .. })));

        let refunded = ledger
            .atomically(|txn: &LedgerTxn<'_>| {
                txn.close_account(&VAULT_PROGRAM_ID, &address, &payer.pubkey())
            })
            .unwrap();
        assert_eq!(refunded, Rent::minimum_balance(16) + 1_000);
        assert!(ledger.get_account(&address).unwrap().is_none());
        assert_eq!(ledger.balance(&payer.pubkey()).unwrap(), 10_000_000);
    }

    #[test]
    fn typed_state_round_trips_through_account_data() {
        let ledger = Ledger::open_temporary().unwrap();
        let payer = funded(&ledger, 10_000_000);
        let owner = payer.pubkey();
        let (address, bump) =
            find_program_address(&[b"state", owner.as_ref()], &VAULT_PROGRAM_ID).unwrap();
        let seeds: [&[u8]; 3] = [b"state", owner.as_ref(), &[bump]];
        let new = derived_signer(&seeds, &VAULT_PROGRAM_ID).unwrap();

        ledger
            .atomically(|txn: &LedgerTxn<'_>| {
                txn.create_account(&Signer::from(&payer), &new, 32, &VAULT_PROGRAM_ID)?;
                txn.write_state(&VAULT_PROGRAM_ID, &address, &(7u64, String::from("hi")))
            })
            .unwrap();

        let (n, s): (u64, String) = ledger
            .atomically(|txn: &LedgerTxn<'_>| txn.read_state(&VAULT_PROGRAM_ID, &address))
            .unwrap();
        assert_eq!((n, s.as_str()), (7, "hi"));

        let too_big = ledger.atomically(|txn: &LedgerTxn<'_>| {
            txn.write_data(&VAULT_PROGRAM_ID, &address, &[1u8; 33])
        });
        assert!(matches!(too_big, Err(LedgerError::Serialization(_))));
    }

    #[test]
    fn program_accounts_filters_by_owner() {
        let ledger = Ledger::open_temporary().unwrap();
        let payer = funded(&ledger, 100_000_000);
        let owner = payer.pubkey();
        for id in [b"1", b"2", b"3"] {
            let (_, bump) =
                find_program_address(&[b"vault", owner.as_ref(), id], &VAULT_PROGRAM_ID).unwrap();
            let seeds: [&[u8]; 4] = [b"vault", owner.as_ref(), id, &[bump]];
            let new = derived_signer(&seeds, &VAULT_PROGRAM_ID).unwrap();
            ledger
                .atomically(|txn: &LedgerTxn<'_>| {
                    txn.create_account(&Signer::from(&payer), &new, 8, &VAULT_PROGRAM_ID)
                })
                .unwrap();
        }

        assert_eq!(ledger.program_accounts(&VAULT_PROGRAM_ID).unwrap().len(), 3);
        assert_eq!(ledger.program_accounts(&SYSTEM_PROGRAM_ID).unwrap().len(), 1);
        assert_eq!(ledger.account_count(), 4);
    }

    #[test]
    fn concurrent_spends_never_overdraw() {
        let ledger = Ledger::open_temporary().unwrap();
        let alice = Arc::new(funded(&ledger, 1_000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                let alice = Arc::clone(&alice);
                thread::spawn(move || {
                    let dest = Keypair::generate().pubkey();
                    ledger
                        .atomically(|txn: &LedgerTxn<'_>| {
                            txn.transfer_lamports(&Signer::from(alice.as_ref()), &dest, 300)
                        })
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(ledger.balance(&alice.pubkey()).unwrap(), 100);
        assert_eq!(ledger.total_lamports().unwrap(), 1_000);
    }

    #[test]
    fn flush_does_not_error() {
        let ledger = Ledger::open_temporary().unwrap();
        ledger.fund_account(&Keypair::generate().pubkey(), 1).unwrap();
        ledger.flush().expect("flush should succeed");
    }
}
