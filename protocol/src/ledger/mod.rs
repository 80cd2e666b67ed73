//! # Host Ledger
//!
//! The account store every program runs against. Small on purpose:
//!
//! ```text
//! account.rs  Account struct, storage deposit (rent)
//! db.rs       sled-backed Ledger, atomic transactions, scans
//! txn.rs      LedgerTxn: the mutation API inside a transaction
//! clock.rs    Clock trait, wall clock, pinned clock for tests
//! error.rs    LedgerError
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! signed call -> program -> Ledger::atomically(|txn| ...) -> sled tree
//!                                   |
//!                         abort => nothing written
//! ```

pub mod account;
pub mod clock;
pub mod db;
pub mod error;
pub mod txn;

pub use account::{Account, Rent};
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::Ledger;
pub use error::{LedgerError, LedgerResult};
pub use txn::{abort, fail, ConflictableTransactionError, LedgerTxn, TxResult};
