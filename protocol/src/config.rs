//! # Protocol Configuration & Constants
//!
//! Every magic number in the ledger lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong.
//!
//! Program identities, rent parameters, and derivation limits are part of
//! the durable format: a vault address computed today must still be the
//! same address after an upgrade. Change them and every existing vault
//! becomes unreachable.

use crate::crypto::keys::Pubkey;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Program Identities
// ---------------------------------------------------------------------------

/// The system program owns plain wallets. All zeros, by long-standing
/// convention.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// The time-locked vault program. Vault records are owned by this identity
/// and their addresses are derived under it.
pub const VAULT_PROGRAM_ID: Pubkey = Pubkey::new_from_array(*b"TimeLockedVault11111111111111111");

/// The typed-asset (token) program. Owns mints and holding accounts.
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array(*b"TokenProgram11111111111111111111");

/// The associated-account program. Holding-account addresses are derived
/// under this identity from `(wallet, token program, mint)`.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::new_from_array(*b"AssociatedTokenProgram1111111111");

// ---------------------------------------------------------------------------
// Address Derivation
// ---------------------------------------------------------------------------

/// Maximum number of seeds in a single derivation (the bump counts as one).
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single derivation seed, in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Domain marker appended to every derived-address preimage so a derived
/// address can never collide with a hash computed for any other purpose.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// ---------------------------------------------------------------------------
// Native Asset
// ---------------------------------------------------------------------------

/// Lamports per whole native token. Nine decimals.
pub const LAMPORTS_PER_TOKEN: u64 = 1_000_000_000;

/// Decimal precision of the native asset.
pub const NATIVE_DECIMALS: u8 = 9;

// ---------------------------------------------------------------------------
// Rent (storage deposit)
// ---------------------------------------------------------------------------

/// Bytes charged for every account on top of its data, covering the
/// address, owner, and lamport fields.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Lamports charged per byte per year of storage.
pub const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;

/// An account holding this many years of rent is exempt and never charged.
pub const EXEMPTION_THRESHOLD_YEARS: u64 = 2;

// ---------------------------------------------------------------------------
// Typed-asset account sizes
// ---------------------------------------------------------------------------

/// Allocated size of a mint account.
pub const MINT_ACCOUNT_SPACE: usize = 82;

/// Allocated size of a token holding account.
pub const TOKEN_ACCOUNT_SPACE: usize = 165;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Lamports credited to the operator key when a devnet ledger is created.
pub const DEVNET_GENESIS_LAMPORTS: u64 = 1_000 * LAMPORTS_PER_TOKEN;

/// Returns a friendly name for a well-known program identity, mainly for
/// logging. Unknown identities get `None`.
pub fn program_name(id: &Pubkey) -> Option<&'static str> {
    match *id {
        SYSTEM_PROGRAM_ID => Some("system"),
        VAULT_PROGRAM_ID => Some("time-locked-vault"),
        TOKEN_PROGRAM_ID => Some("token"),
        ASSOCIATED_TOKEN_PROGRAM_ID => Some("associated-token"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_ids_are_distinct() {
        let ids = [
            SYSTEM_PROGRAM_ID,
            VAULT_PROGRAM_ID,
            TOKEN_PROGRAM_ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn program_names_resolve() {
        assert_eq!(program_name(&VAULT_PROGRAM_ID), Some("time-locked-vault"));
        assert_eq!(program_name(&SYSTEM_PROGRAM_ID), Some("system"));
        assert_eq!(program_name(&Pubkey::new_from_array([7u8; 32])), None);
    }

    #[test]
    fn derivation_limits_sanity() {
        // The vault seeds are "vault", a 32-byte owner, an id, and the bump.
        assert!(MAX_SEEDS >= 4);
        assert_eq!(MAX_SEED_LEN, 32);
    }
}
