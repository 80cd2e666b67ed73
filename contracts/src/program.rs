//! # Vault Program
//!
//! The public face of the time-locked vault: the four operations, signed
//! transaction dispatch, and read-only queries over live vaults.
//!
//! Each operation reads the clock once, then runs as a single ledger
//! transaction. Logging happens only after the transaction commits, since
//! the ledger may replay the body on a write conflict.

use std::sync::Arc;

use timelock_protocol::config::VAULT_PROGRAM_ID;
use timelock_protocol::ledger::{Clock, LedgerTxn, SystemClock};
use timelock_protocol::{Ledger, Pubkey, Signer};
use tracing::{debug, info, warn};

use crate::address::vault_address;
use crate::deposit::{self, DepositParams};
use crate::error::{VaultError, VaultResult};
use crate::instruction::{Receipt, Transaction, VaultInstruction};
use crate::state::VaultRecord;
use crate::withdraw;

/// The vault program bound to a ledger and a clock.
#[derive(Clone)]
pub struct VaultProgram {
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for VaultProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultProgram")
            .field("ledger", &self.ledger)
            .field("now", &self.clock.unix_timestamp())
            .finish()
    }
}

impl VaultProgram {
    pub fn new(ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// A program running on wall-clock time.
    pub fn with_system_clock(ledger: Ledger) -> Self {
        Self::new(ledger, Arc::new(SystemClock))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current ledger time, Unix seconds.
    pub fn now(&self) -> i64 {
        self.clock.unix_timestamp()
    }

    // -- Operations -----------------------------------------------------------

    /// Locks `amount` lamports from `payer` until `unlock_time`. Returns the
    /// vault address.
    pub fn create_native_vault(
        &self,
        payer: &Signer,
        id: &str,
        amount: u64,
        unlock_time: i64,
    ) -> VaultResult<Pubkey> {
        let params = DepositParams {
            id,
            amount,
            unlock_time,
            now: self.now(),
        };
        let (vault, record) = self.ledger.atomically(|txn: &LedgerTxn<'_, VaultError>| {
            deposit::create_native_vault(txn, payer, &params)
        })?;

        info!(
            %vault,
            owner = %record.owner,
            id = %record.id,
            amount,
            unlock_time,
            "native vault created"
        );
        Ok(vault)
    }

    /// Locks `amount` units of `mint` from the payer's associated holding
    /// account until `unlock_time`. Returns the vault address.
    pub fn create_asset_vault(
        &self,
        payer: &Signer,
        id: &str,
        amount: u64,
        unlock_time: i64,
        mint: &Pubkey,
        holding_account: Option<&Pubkey>,
    ) -> VaultResult<Pubkey> {
        let params = DepositParams {
            id,
            amount,
            unlock_time,
            now: self.now(),
        };
        let (vault, record) = self.ledger.atomically(|txn: &LedgerTxn<'_, VaultError>| {
            deposit::create_asset_vault(txn, payer, &params, mint, holding_account)
        })?;

        info!(
            %vault,
            owner = %record.owner,
            id = %record.id,
            %mint,
            amount,
            unlock_time,
            "asset vault created"
        );
        Ok(vault)
    }

    /// Releases a native vault to its owner. Returns the lamports paid out,
    /// storage deposit included.
    pub fn withdraw_native(&self, payer: &Signer, vault: &Pubkey) -> VaultResult<u64> {
        let now = self.now();
        let (record, released) = self.ledger.atomically(|txn: &LedgerTxn<'_, VaultError>| {
            withdraw::withdraw_native(txn, payer, vault, now)
        })?;

        info!(%vault, owner = %record.owner, id = %record.id, released, "native vault withdrawn");
        Ok(released)
    }

    /// Releases an asset vault to its owner. Returns the token units paid out.
    pub fn withdraw_asset(&self, payer: &Signer, vault: &Pubkey, mint: &Pubkey) -> VaultResult<u64> {
        let now = self.now();
        let (record, released) = self.ledger.atomically(|txn: &LedgerTxn<'_, VaultError>| {
            withdraw::withdraw_asset(txn, payer, vault, mint, now)
        })?;

        info!(%vault, owner = %record.owner, id = %record.id, %mint, released, "asset vault withdrawn");
        Ok(released)
    }

    /// Verifies and executes a signed transaction.
    ///
    /// A bad signature fails with `Unauthorized` before the ledger is touched.
    pub fn execute(&self, tx: &Transaction) -> VaultResult<Receipt> {
        let payer = tx.verify()?;
        let result = match &tx.instruction {
            VaultInstruction::CreateNativeVault {
                id,
                amount,
                unlock_time,
            } => self.create_native_vault(&payer, id, *amount, *unlock_time),
            VaultInstruction::CreateAssetVault {
                id,
                amount,
                unlock_time,
                mint,
                holding_account,
            } => self.create_asset_vault(
                &payer,
                id,
                *amount,
                *unlock_time,
                mint,
                holding_account.as_ref(),
            ),
            VaultInstruction::WithdrawNative { vault } => {
                self.withdraw_native(&payer, vault).map(|_| *vault)
            }
            VaultInstruction::WithdrawAsset { vault, mint } => {
                self.withdraw_asset(&payer, vault, mint).map(|_| *vault)
            }
        };

        match result {
            Ok(vault) => Ok(Receipt {
                signature: tx.signature,
                instruction: tx.instruction.clone(),
                vault,
                slot_time: self.now(),
            }),
            Err(e) => {
                debug!(
                    instruction = tx.instruction.name(),
                    payer = %tx.payer,
                    error = %e,
                    "transaction rejected"
                );
                Err(e)
            }
        }
    }

    // -- Queries ----------------------------------------------------------------

    /// Address and bump of the vault `(owner, id)` would live at.
    pub fn derive_vault_address(&self, owner: &Pubkey, id: &str) -> VaultResult<(Pubkey, u8)> {
        vault_address(owner, id)
    }

    /// The live vault at `address`, if any.
    pub fn vault(&self, address: &Pubkey) -> VaultResult<Option<VaultRecord>> {
        let Some(account) = self.ledger.get_account(address)? else {
            return Ok(None);
        };
        if account.owner != VAULT_PROGRAM_ID || !VaultRecord::is_vault_data(&account.data) {
            return Ok(None);
        }
        VaultRecord::unpack(&account.data).map(Some)
    }

    /// Every live vault, in address order.
    ///
    /// Scans the ledger; there is no registry to drift out of sync.
    /// Undecodable records are skipped with a warning.
    pub fn all_vaults(&self) -> VaultResult<Vec<(Pubkey, VaultRecord)>> {
        let mut out = Vec::new();
        for (address, account) in self.ledger.program_accounts(&VAULT_PROGRAM_ID)? {
            if !VaultRecord::is_vault_data(&account.data) {
                continue;
            }
            match VaultRecord::unpack(&account.data) {
                Ok(record) => out.push((address, record)),
                Err(e) => warn!(%address, error = %e, "skipping undecodable vault record"),
            }
        }
        Ok(out)
    }

    /// Every live vault owned by `owner`.
    pub fn vaults_by_owner(&self, owner: &Pubkey) -> VaultResult<Vec<(Pubkey, VaultRecord)>> {
        Ok(self
            .all_vaults()?
            .into_iter()
            .filter(|(_, record)| record.owner == *owner)
            .collect())
    }

    /// One more than the largest numeric id among live vaults, or `0`.
    ///
    /// Non-numeric ids are ignored. A convenience for clients that number
    /// their vaults; nothing requires ids to be numeric.
    pub fn next_vault_id(&self) -> VaultResult<u64> {
        Ok(self
            .all_vaults()?
            .iter()
            .filter_map(|(_, record)| record.id.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max.saturating_add(1)))
    }
}
