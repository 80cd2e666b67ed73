//! Vault and holding-account addresses.
//!
//! ```text
//! vault   = derive(["vault", owner, id], vault_program)
//! holding = derive([vault, token_program, mint], associated_token_program)
//! ```
//!
//! Clients compute these themselves; the program recomputes them and never
//! trusts an address it was handed.

use timelock_protocol::config::VAULT_PROGRAM_ID;
use timelock_protocol::crypto::address::{
    associated_token_address, create_program_address, derived_signer, find_program_address,
};
use timelock_protocol::{Pubkey, Signer};

use crate::error::VaultError;
use crate::state::{VaultRecord, MAX_ID_LEN};

/// First seed of every vault address.
pub const VAULT_SEED: &[u8] = b"vault";

/// Ids are 1 to 32 bytes of UTF-8.
pub fn validate_id(id: &str) -> Result<(), VaultError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(VaultError::InvalidVaultId(id.len()));
    }
    Ok(())
}

/// Address and bump of the vault for `(owner, id)`.
pub fn vault_address(owner: &Pubkey, id: &str) -> Result<(Pubkey, u8), VaultError> {
    validate_id(id)?;
    Ok(find_program_address(
        &[VAULT_SEED, owner.as_ref(), id.as_bytes()],
        &VAULT_PROGRAM_ID,
    )?)
}

/// Checks that `address` is exactly what the record's seeds produce.
pub fn verify_vault_address(address: &Pubkey, record: &VaultRecord) -> Result<(), VaultError> {
    let derived = create_program_address(
        &[VAULT_SEED, record.owner.as_ref(), record.id.as_bytes(), &[record.bump]],
        &VAULT_PROGRAM_ID,
    )
    .map_err(|_| VaultError::VaultAddressMismatch)?;
    if derived != *address {
        return Err(VaultError::VaultAddressMismatch);
    }
    Ok(())
}

/// Signs for the vault address on the program's behalf.
pub fn vault_signer(record: &VaultRecord) -> Result<Signer, VaultError> {
    Ok(derived_signer(
        &[VAULT_SEED, record.owner.as_ref(), record.id.as_bytes(), &[record.bump]],
        &VAULT_PROGRAM_ID,
    )?)
}

/// The vault's associated holding account for `mint`.
pub fn holding_address(vault: &Pubkey, mint: &Pubkey) -> Result<Pubkey, VaultError> {
    Ok(associated_token_address(vault, mint)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AssetKind;
    use timelock_protocol::crypto::address::is_on_curve;
    use timelock_protocol::Keypair;

    fn record_for(owner: Pubkey, id: &str) -> (Pubkey, VaultRecord) {
        let (address, bump) = vault_address(&owner, id).unwrap();
        let record = VaultRecord {
            id: id.to_string(),
            owner,
            asset_kind: AssetKind::Native,
            amount: 1,
            unlock_time: 0,
            created_at: 0,
            bump,
        };
        (address, record)
    }

    #[test]
    fn id_length_limits() {
        assert_eq!(validate_id(""), Err(VaultError::InvalidVaultId(0)));
        assert!(validate_id("1").is_ok());
        assert!(validate_id(&"a".repeat(32)).is_ok());
        assert_eq!(validate_id(&"a".repeat(33)), Err(VaultError::InvalidVaultId(33)));
    }

    #[test]
    fn vault_address_is_deterministic_and_off_curve() {
        let owner = Keypair::from_seed(&[1u8; 32]).pubkey();
        let a = vault_address(&owner, "1").unwrap();
        assert_eq!(a, vault_address(&owner, "1").unwrap());
        assert!(!is_on_curve(a.0.as_bytes()));
    }

    #[test]
    fn vault_address_separates_owners_and_ids() {
        let alice = Keypair::generate().pubkey();
        let bob = Keypair::generate().pubkey();
        assert_ne!(vault_address(&alice, "1").unwrap(), vault_address(&bob, "1").unwrap());
        assert_ne!(vault_address(&alice, "1").unwrap(), vault_address(&alice, "2").unwrap());
    }

    #[test]
    fn verify_accepts_true_address_and_rejects_others() {
        let owner = Keypair::generate().pubkey();
        let (address, record) = record_for(owner, "7");
        assert!(verify_vault_address(&address, &record).is_ok());

        let (other, _) = record_for(owner, "8");
        assert_eq!(
            verify_vault_address(&other, &record),
            Err(VaultError::VaultAddressMismatch)
        );

        let mut tampered = record.clone();
        tampered.owner = Keypair::generate().pubkey();
        assert_eq!(
            verify_vault_address(&address, &tampered),
            Err(VaultError::VaultAddressMismatch)
        );
    }

    #[test]
    fn vault_signer_speaks_for_vault() {
        let owner = Keypair::generate().pubkey();
        let (address, record) = record_for(owner, "abc");
        assert_eq!(vault_signer(&record).unwrap().pubkey(), address);
    }

    #[test]
    fn holding_address_depends_on_vault_and_mint() {
        let owner = Keypair::generate().pubkey();
        let (vault, _) = record_for(owner, "1");
        let mint = Keypair::generate().pubkey();
        let holding = holding_address(&vault, &mint).unwrap();
        assert_eq!(holding, associated_token_address(&vault, &mint).unwrap());
        assert_ne!(holding, holding_address(&vault, &Keypair::generate().pubkey()).unwrap());
    }
}
