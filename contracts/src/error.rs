//! Vault program errors.

use thiserror::Error;
use timelock_protocol::crypto::address::AddressError;
use timelock_protocol::LedgerError;

/// Errors returned by the vault program.
///
/// Program-level failures carry a stable numeric code (see [`code`](Self::code))
/// that clients can match on without parsing messages. Failures from the
/// host or token ledger pass through verbatim inside [`VaultError::Ledger`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// A vault with this `(owner, id)` is already live.
    #[error("vault already exists")]
    VaultAlreadyExists,

    /// No live vault at the given address.
    #[error("vault does not exist")]
    VaultDoesNotExist,

    /// The ledger clock hasn't reached the vault's unlock time.
    #[error("vault is still locked until {unlock_time} (now {now})")]
    VaultNotUnlocked { unlock_time: i64, now: i64 },

    /// Asset withdrawal on a native vault, or with a different mint.
    #[error("vault does not hold the requested token")]
    VaultIsNotSplToken,

    /// Native withdrawal on an asset vault.
    #[error("vault does not hold the native asset")]
    VaultIsNotNative,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Ids must be 1 to 32 bytes so they fit a single derivation seed.
    #[error("vault id must be 1-32 bytes, got {0}")]
    InvalidVaultId(usize),

    /// The address doesn't re-derive from the record stored there.
    #[error("vault address does not match its seeds")]
    VaultAddressMismatch,

    /// An explicitly supplied holding account isn't the canonical one.
    #[error("holding account is not the vault's associated account")]
    HoldingAccountMismatch,

    #[error("corrupt vault record: {0}")]
    CorruptRecord(String),

    /// The signer is not the vault owner, or the signature didn't verify.
    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl VaultError {
    /// Stable error code, `None` for errors that don't originate in the
    /// vault program.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::VaultAlreadyExists => Some(6000),
            Self::VaultDoesNotExist => Some(6001),
            Self::VaultNotUnlocked { .. } => Some(6002),
            Self::VaultIsNotSplToken => Some(6003),
            Self::VaultIsNotNative => Some(6004),
            Self::ZeroAmount => Some(6005),
            Self::InvalidVaultId(_) => Some(6006),
            Self::VaultAddressMismatch => Some(6007),
            Self::HoldingAccountMismatch => Some(6008),
            Self::CorruptRecord(_) => Some(6009),
            Self::Unauthorized | Self::Ledger(_) => None,
        }
    }

    /// Short machine-readable name, e.g. `"VaultNotUnlocked"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VaultAlreadyExists => "VaultAlreadyExists",
            Self::VaultDoesNotExist => "VaultDoesNotExist",
            Self::VaultNotUnlocked { .. } => "VaultNotUnlocked",
            Self::VaultIsNotSplToken => "VaultIsNotSplToken",
            Self::VaultIsNotNative => "VaultIsNotNative",
            Self::ZeroAmount => "ZeroAmount",
            Self::InvalidVaultId(_) => "InvalidVaultId",
            Self::VaultAddressMismatch => "VaultAddressMismatch",
            Self::HoldingAccountMismatch => "HoldingAccountMismatch",
            Self::CorruptRecord(_) => "CorruptRecord",
            Self::Unauthorized => "Unauthorized",
            Self::Ledger(_) => "LedgerError",
        }
    }
}

impl From<AddressError> for VaultError {
    fn from(e: AddressError) -> Self {
        Self::Ledger(LedgerError::Address(e))
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
