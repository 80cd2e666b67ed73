//! Integration tests for the host ledger and the token program.
//!
//! Each test builds its own ledger (temporary or in a scratch directory) and
//! drives it only through the public API.

use timelock_protocol::config::{SYSTEM_PROGRAM_ID, TOKEN_ACCOUNT_SPACE};
use timelock_protocol::crypto::address::associated_token_address;
use timelock_protocol::ledger::{Ledger, LedgerError, LedgerTxn, Rent};
use timelock_protocol::token;
use timelock_protocol::{Keypair, Pubkey, Signer};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn funded(ledger: &Ledger, lamports: u64) -> Keypair {
    let kp = Keypair::generate();
    ledger.fund_account(&kp.pubkey(), lamports).expect("fund");
    kp
}

/// Creates a mint with `decimals` and gives `holder` an associated account
/// holding `amount` units. Returns `(mint, holding)`.
fn mint_and_hold(ledger: &Ledger, authority: &Keypair, holder: &Pubkey, decimals: u8, amount: u64) -> (Pubkey, Pubkey) {
    let mint = Keypair::generate();
    let holding = ledger
        .atomically(|txn: &LedgerTxn<'_>| {
            let payer = Signer::from(authority);
            token::create_mint(txn, &payer, &Signer::from(&mint), &authority.pubkey(), decimals)?;
            let ata = token::create_associated_account(txn, &payer, holder, &mint.pubkey())?;
            token::mint_to(txn, &mint.pubkey(), &ata, &payer, amount)?;
            Ok(ata)
        })
        .expect("mint setup");
    (mint.pubkey(), holding)
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let who = Keypair::generate().pubkey();

    {
        let ledger = Ledger::open(dir.path()).expect("open");
        ledger.fund_account(&who, 12_345).unwrap();
        ledger.flush().unwrap();
    }

    let reopened = Ledger::open(dir.path()).expect("reopen");
    assert_eq!(reopened.balance(&who).unwrap(), 12_345);
    let account = reopened.get_account(&who).unwrap().unwrap();
    assert_eq!(account.owner, SYSTEM_PROGRAM_ID);
}

#[test]
fn token_state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let authority = Keypair::generate();
    let holder = Keypair::generate().pubkey();

    let (mint, holding) = {
        let ledger = Ledger::open(dir.path()).unwrap();
        ledger.fund_account(&authority.pubkey(), 1_000_000_000).unwrap();
        let out = mint_and_hold(&ledger, &authority, &holder, 6, 30_000_000);
        ledger.flush().unwrap();
        out
    };

    let ledger = Ledger::open(dir.path()).unwrap();
    assert_eq!(ledger.token_balance(&holding).unwrap(), 30_000_000);
    assert_eq!(ledger.mint(&mint).unwrap().decimals, 6);
}

// ---------------------------------------------------------------------------
// Token flows
// ---------------------------------------------------------------------------

#[test]
fn token_account_owned_by_derived_address_can_move_funds_with_derived_signer() {
    use timelock_protocol::config::VAULT_PROGRAM_ID;
    use timelock_protocol::crypto::address::{derived_signer, find_program_address};

    let ledger = Ledger::open_temporary().unwrap();
    let authority = funded(&ledger, 1_000_000_000);
    let alice = Keypair::generate();

    // A program-derived "wallet" with its own holding account.
    let alice_key = alice.pubkey();
    let (pda, bump) =
        find_program_address(&[b"escrow", alice_key.as_ref()], &VAULT_PROGRAM_ID).unwrap();
    let (mint, pda_holding) = mint_and_hold(&ledger, &authority, &pda, 9, 500);
    assert_eq!(pda_holding, associated_token_address(&pda, &mint).unwrap());

    ledger
        .atomically(|txn: &LedgerTxn<'_>| {
            let payer = Signer::from(&authority);
            let dest = token::get_or_create_associated_account(txn, &payer, &alice_key, &mint)?;
            let pda_signer = match derived_signer(&[b"escrow", alice_key.as_ref(), &[bump]], &VAULT_PROGRAM_ID) {
                Ok(s) => s,
                Err(e) => return timelock_protocol::ledger::fail(e.into()),
            };
            token::transfer_checked(txn, &pda_holding, &mint, &dest, &pda_signer, 500, 9)?;
            token::close_account(txn, &pda_holding, &alice_key, &pda_signer)?;
            Ok(())
        })
        .unwrap();

    let alice_ata = associated_token_address(&alice_key, &mint).unwrap();
    assert_eq!(ledger.token_balance(&alice_ata).unwrap(), 500);
    assert_eq!(
        ledger.token_account(&pda_holding),
        Err(LedgerError::AccountNotFound(pda_holding))
    );
    assert_eq!(
        ledger.balance(&alice_key).unwrap(),
        Rent::minimum_balance(TOKEN_ACCOUNT_SPACE)
    );
}

#[test]
fn failed_token_transfer_rolls_back_account_creation() {
    let ledger = Ledger::open_temporary().unwrap();
    let authority = funded(&ledger, 1_000_000_000);
    let alice = Keypair::generate();
    let (mint, from) = mint_and_hold(&ledger, &authority, &alice.pubkey(), 6, 10);
    let bob = Keypair::generate().pubkey();
    let before = ledger.balance(&authority.pubkey()).unwrap();

    let result = ledger.atomically(|txn: &LedgerTxn<'_>| {
        let dest = token::create_associated_account(txn, &Signer::from(&authority), &bob, &mint)?;
        token::transfer_checked(txn, &from, &mint, &dest, &Signer::from(&alice), 11, 6)
    });

    assert!(matches!(result, Err(LedgerError::InsufficientTokens { .. })));
    let bob_ata = associated_token_address(&bob, &mint).unwrap();
    assert!(ledger.get_account(&bob_ata).unwrap().is_none());
    assert_eq!(ledger.balance(&authority.pubkey()).unwrap(), before);
}

#[test]
fn associated_account_requires_real_mint() {
    let ledger = Ledger::open_temporary().unwrap();
    let payer = funded(&ledger, 1_000_000_000);
    let fake_mint = Keypair::generate().pubkey();

    let err = ledger
        .atomically(|txn: &LedgerTxn<'_>| {
            token::create_associated_account(txn, &Signer::from(&payer), &payer.pubkey(), &fake_mint)
        })
        .unwrap_err();
    assert_eq!(err, LedgerError::InvalidMint(fake_mint));
}

#[test]
fn lamports_are_conserved_across_token_lifecycle() {
    let ledger = Ledger::open_temporary().unwrap();
    let authority = funded(&ledger, 1_000_000_000);
    let total = ledger.total_lamports().unwrap();

    let holder = Keypair::generate();
    let (mint, holding) = mint_and_hold(&ledger, &authority, &holder.pubkey(), 6, 1);
    assert_eq!(ledger.total_lamports().unwrap(), total);

    ledger
        .atomically(|txn: &LedgerTxn<'_>| {
            let signer = Signer::from(&holder);
            let sink = token::get_or_create_associated_account(txn, &Signer::from(&authority), &authority.pubkey(), &mint)?;
            token::transfer_checked(txn, &holding, &mint, &sink, &signer, 1, 6)?;
            token::close_account(txn, &holding, &authority.pubkey(), &signer)
        })
        .unwrap();
    assert_eq!(ledger.total_lamports().unwrap(), total);
}
