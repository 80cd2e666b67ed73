//! # Vault Record
//!
//! The durable description of one time-locked deposit. A record lives in
//! its own ledger account, owned by the vault program, at the address
//! derived from `(owner, id)`.
//!
//! ## Layout
//!
//! ```text
//! [0..8)   discriminator = sha256("account:Vault")[..8]
//! [8..)    bincode(id, owner, mint?, decimals?, amount, unlock_time, created_at, bump)
//! ...      zero padding up to VAULT_ACCOUNT_SPACE
//! ```
//!
//! On disk the asset kind is an optional `(mint, decimals)` pair. In memory
//! it's [`AssetKind`], so "native vault with a mint" can't be expressed.
//! Records with exactly one half of the pair are rejected as corrupt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use timelock_protocol::crypto::hash::discriminator;
use timelock_protocol::Pubkey;

use crate::error::VaultError;

/// Longest allowed vault id, in bytes.
pub const MAX_ID_LEN: usize = 32;

/// Allocated size of a vault record account.
///
/// Discriminator plus the largest possible encoding: a 32-byte id with its
/// 8-byte length prefix, owner, optional mint, optional decimals, three
/// 8-byte integers and the bump.
pub const VAULT_ACCOUNT_SPACE: usize = 8 + (8 + MAX_ID_LEN) + 32 + (1 + 32) + (1 + 1) + 8 + 8 + 8 + 1;

/// Type tag at the front of every vault record.
pub fn vault_discriminator() -> [u8; 8] {
    discriminator("Vault")
}

/// What a vault holds. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetKind {
    /// The ledger's native asset, held as lamports on the record itself.
    Native,
    /// A token-program asset, held in the vault's associated holding account.
    /// `decimals` is read from the mint at creation and frozen.
    Asset { mint: Pubkey, decimals: u8 },
}

impl AssetKind {
    pub fn mint(&self) -> Option<Pubkey> {
        match self {
            Self::Native => None,
            Self::Asset { mint, .. } => Some(*mint),
        }
    }
}

/// One live vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Caller-chosen id, unique per owner.
    pub id: String,
    /// The depositor. The only identity that can withdraw.
    pub owner: Pubkey,
    pub asset_kind: AssetKind,
    /// Escrowed amount in the asset's smallest unit. Always > 0.
    pub amount: u64,
    /// Unix seconds. Withdrawal is allowed once the ledger clock reaches it.
    pub unlock_time: i64,
    /// Unix seconds, from the ledger clock at deposit.
    pub created_at: i64,
    /// Address proof: re-derives the record's address from `(owner, id)`.
    pub bump: u8,
}

/// Disk shape of [`VaultRecord`]. Field order is the durable format.
#[derive(Serialize, Deserialize)]
struct StoredVault {
    id: String,
    owner: Pubkey,
    mint: Option<Pubkey>,
    decimals: Option<u8>,
    amount: u64,
    unlock_time: i64,
    created_at: i64,
    bump: u8,
}

impl From<&VaultRecord> for StoredVault {
    fn from(record: &VaultRecord) -> Self {
        let (mint, decimals) = match record.asset_kind {
            AssetKind::Native => (None, None),
            AssetKind::Asset { mint, decimals } => (Some(mint), Some(decimals)),
        };
        Self {
            id: record.id.clone(),
            owner: record.owner,
            mint,
            decimals,
            amount: record.amount,
            unlock_time: record.unlock_time,
            created_at: record.created_at,
            bump: record.bump,
        }
    }
}

impl TryFrom<StoredVault> for VaultRecord {
    type Error = VaultError;

    fn try_from(stored: StoredVault) -> Result<Self, Self::Error> {
        let asset_kind = match (stored.mint, stored.decimals) {
            (None, None) => AssetKind::Native,
            (Some(mint), Some(decimals)) => AssetKind::Asset { mint, decimals },
            _ => {
                return Err(VaultError::CorruptRecord(
                    "mint and decimals must be both present or both absent".into(),
                ))
            }
        };
        Ok(Self {
            id: stored.id,
            owner: stored.owner,
            asset_kind,
            amount: stored.amount,
            unlock_time: stored.unlock_time,
            created_at: stored.created_at,
            bump: stored.bump,
        })
    }
}

impl VaultRecord {
    /// Encodes the record as account data (discriminator first).
    pub fn pack(&self) -> Result<Vec<u8>, VaultError> {
        let body = bincode::serialize(&StoredVault::from(self))
            .map_err(|e| VaultError::CorruptRecord(e.to_string()))?;
        let mut out = Vec::with_capacity(VAULT_ACCOUNT_SPACE);
        out.extend_from_slice(&vault_discriminator());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decodes account data. Trailing zero padding is ignored.
    pub fn unpack(data: &[u8]) -> Result<Self, VaultError> {
        if data.len() < 8 || data[..8] != vault_discriminator() {
            return Err(VaultError::CorruptRecord("missing vault discriminator".into()));
        }
        let stored: StoredVault = bincode::deserialize(&data[8..])
            .map_err(|e| VaultError::CorruptRecord(e.to_string()))?;
        Self::try_from(stored)
    }

    /// Whether data starts with the vault type tag.
    pub fn is_vault_data(data: &[u8]) -> bool {
        data.len() >= 8 && data[..8] == vault_discriminator()
    }

    pub fn is_unlocked(&self, now: i64) -> bool {
        now >= self.unlock_time
    }

    /// Unlock time as a UTC timestamp, for display.
    pub fn unlock_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.unlock_time, 0)
    }
}
