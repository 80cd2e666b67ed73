//! Signed vault transactions.
//!
//! A client picks a [`VaultInstruction`], signs it with its wallet key and
//! submits the resulting [`Transaction`]. The signature covers
//! `bincode((payer, instruction))`, so neither the payer nor any argument can
//! be swapped after signing.

use serde::{Deserialize, Serialize};
use timelock_protocol::{Keypair, Pubkey, Signature, Signer};

use crate::error::VaultError;

/// The four things you can ask the vault program to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultInstruction {
    CreateNativeVault {
        id: String,
        amount: u64,
        unlock_time: i64,
    },
    CreateAssetVault {
        id: String,
        amount: u64,
        unlock_time: i64,
        mint: Pubkey,
        /// Optional explicit holding account. If given, it must equal the
        /// derived one.
        #[serde(default)]
        holding_account: Option<Pubkey>,
    },
    WithdrawNative {
        vault: Pubkey,
    },
    WithdrawAsset {
        vault: Pubkey,
        mint: Pubkey,
    },
}

impl VaultInstruction {
    /// Snake-case name, for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateNativeVault { .. } => "create_native_vault",
            Self::CreateAssetVault { .. } => "create_asset_vault",
            Self::WithdrawNative { .. } => "withdraw_native",
            Self::WithdrawAsset { .. } => "withdraw_asset",
        }
    }

    pub fn is_deposit(&self) -> bool {
        matches!(self, Self::CreateNativeVault { .. } | Self::CreateAssetVault { .. })
    }
}

/// An instruction plus the payer's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payer: Pubkey,
    pub instruction: VaultInstruction,
    pub signature: Signature,
}

impl Transaction {
    /// The exact bytes the payer signs.
    pub fn message(payer: &Pubkey, instruction: &VaultInstruction) -> Result<Vec<u8>, VaultError> {
        bincode::serialize(&(payer, instruction)).map_err(|e| VaultError::CorruptRecord(e.to_string()))
    }

    /// Builds and signs a transaction with `keypair` as payer.
    pub fn new_signed(keypair: &Keypair, instruction: VaultInstruction) -> Result<Self, VaultError> {
        let payer = keypair.pubkey();
        let signature = keypair.sign(&Self::message(&payer, &instruction)?);
        Ok(Self {
            payer,
            instruction,
            signature,
        })
    }

    /// Checks the signature and returns the authorized payer.
    pub fn verify(&self) -> Result<Signer, VaultError> {
        let message = Self::message(&self.payer, &self.instruction)?;
        Signer::verify(&self.payer, &message, &self.signature).map_err(|_| VaultError::Unauthorized)
    }
}

/// What a committed transaction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// The payer's signature, doubling as the transaction id.
    pub signature: Signature,
    pub instruction: VaultInstruction,
    /// The vault created or retired.
    pub vault: Pubkey,
    /// Ledger clock at execution.
    pub slot_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultInstruction {
        VaultInstruction::CreateNativeVault {
            id: "1".into(),
            amount: 1_000_000_000,
            unlock_time: 1_700_000_000,
        }
    }

    #[test]
    fn signed_transaction_verifies() {
        let kp = Keypair::generate();
        let tx = Transaction::new_signed(&kp, sample()).unwrap();
        assert_eq!(tx.verify().unwrap().pubkey(), kp.pubkey());
    }

    #[test]
    fn tampered_instruction_fails() {
        let kp = Keypair::generate();
        let mut tx = Transaction::new_signed(&kp, sample()).unwrap();
        tx.instruction = VaultInstruction::CreateNativeVault {
            id: "1".into(),
            amount: 1,
            unlock_time: 1_700_000_000,
        };
        assert_eq!(tx.verify(), Err(VaultError::Unauthorized));
    }

    #[test]
    fn swapped_payer_fails() {
        let kp = Keypair::generate();
        let mut tx = Transaction::new_signed(&kp, sample()).unwrap();
        tx.payer = Keypair::generate().pubkey();
        assert_eq!(tx.verify(), Err(VaultError::Unauthorized));
    }

    #[test]
    fn json_round_trip_keeps_signature_valid() {
        let kp = Keypair::generate();
        let tx = Transaction::new_signed(
            &kp,
            VaultInstruction::CreateAssetVault {
                id: "2".into(),
                amount: 30,
                unlock_time: 5,
                mint: Keypair::generate().pubkey(),
                holding_account: None,
            },
        )
        .unwrap();

        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("create_asset_vault"));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
        assert!(back.verify().is_ok());
    }

    #[test]
    fn holding_account_defaults_to_none_in_json() {
        let mint = Keypair::generate().pubkey();
        let json = format!(
            r#"{{"create_asset_vault":{{"id":"2","amount":30,"unlock_time":5,"mint":"{mint}"}}}}"#
        );
        let ix: VaultInstruction = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            ix,
            VaultInstruction::CreateAssetVault { holding_account: None, .. }
        ));
        assert!(ix.is_deposit());
        assert_eq!(ix.name(), "create_asset_vault");
    }
}
