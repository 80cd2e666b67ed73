//! # Time-Locked Vault Program
//!
//! Lock value until a moment in time; only the depositor can take it back,
//! and only after that moment.
//!
//! - **Native vaults** hold lamports directly on the vault record.
//! - **Asset vaults** hold token-program units in a holding account owned
//!   by the vault's derived address.
//!
//! ## Lifecycle
//!
//! ```text
//! CreateNativeVault / CreateAssetVault      WithdrawNative / WithdrawAsset
//!            |                                          |
//!            v                                          v
//!   [record + escrow live]  --- ledger clock >= unlock_time --->  [gone]
//! ```
//!
//! A vault's address is derived from `(owner, id)`, so one owner can't open
//! two vaults with the same id while the first is live, and nobody can
//! forge or pre-compute a key for it.
//!
//! ## Design Principles
//!
//! 1. One operation, one ledger transaction. Any failed check, anywhere,
//!    leaves zero state change.
//! 2. Asset kind is a sum type, not a pair of optionals.
//! 3. Addresses handed in by callers are re-derived, never trusted.
//! 4. Withdrawal destroys the record in the same step that releases value.

pub mod address;
pub mod deposit;
pub mod error;
pub mod instruction;
pub mod program;
pub mod state;
pub mod withdraw;

pub use error::{VaultError, VaultResult};
pub use instruction::{Receipt, Transaction, VaultInstruction};
pub use program::VaultProgram;
pub use state::{AssetKind, VaultRecord};
