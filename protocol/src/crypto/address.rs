//! # Derived Addresses
//!
//! Deterministic, collision-resistant addresses that no private key can
//! sign for.
//!
//! ## Construction
//!
//! ```text
//! candidate = SHA-256(seed_0 || ... || seed_n || bump || program_id || "ProgramDerivedAddress")
//! ```
//!
//! Starting at `bump = 255` and counting down, the first candidate that is
//! **not** a valid Ed25519 point is the address, and that `bump` is its
//! proof. Roughly half of all 32-byte strings decompress to a curve point,
//! so the search almost always ends within a couple of tries.
//!
//! Because the address is off the curve, there is no secret key for it and
//! no transaction signature can authorize it. Lamports may still be sent to
//! it by anyone; account creation absorbs such a balance.
//!
//! Program code linked into the host acts for a derived address through
//! [`derived_signer`]. The ledger does not isolate programs from each other,
//! so each program is trusted to request signers only for its own seeds.
//! What the ledger does enforce is that a derived signer is always off the
//! curve, so no program can impersonate a key holder.
//!
//! Anyone can recompute an address from its seeds, which is what lets a
//! client find a vault from `(owner, id)` without a lookup table.

use curve25519_dalek::edwards::CompressedEdwardsY;
use thiserror::Error;

use super::hash::hashv;
use super::keys::{Pubkey, Signer};
use crate::config::{
    ASSOCIATED_TOKEN_PROGRAM_ID, MAX_SEEDS, MAX_SEED_LEN, PDA_MARKER, TOKEN_PROGRAM_ID,
};

/// Errors from address derivation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A seed is longer than [`MAX_SEED_LEN`].
    #[error("seed {index} is {len} bytes; the limit is {MAX_SEED_LEN}")]
    SeedTooLong { index: usize, len: usize },

    /// More than [`MAX_SEEDS`] seeds, bump included.
    #[error("too many seeds: {0} (limit {MAX_SEEDS})")]
    TooManySeeds(usize),

    /// The candidate is a valid curve point, i.e. someone could hold its key.
    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    /// Every bump from 255 down to 0 produced an on-curve candidate.
    #[error("no viable bump seed found")]
    NoViableBump,
}

/// Returns `true` if the bytes decompress to an Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Computes the address for a complete seed list (bump included).
///
/// Fails if the seeds violate the length limits or the result is on the
/// curve. This is the verification half of derivation: given a stored bump,
/// it re-creates the exact address or refuses.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, AddressError> {
    if seeds.len() > MAX_SEEDS {
        return Err(AddressError::TooManySeeds(seeds.len()));
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(AddressError::SeedTooLong {
                index,
                len: seed.len(),
            });
        }
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_ref());
    parts.push(PDA_MARKER);

    let candidate = hashv(&parts);
    if is_on_curve(&candidate) {
        return Err(AddressError::OnCurve);
    }
    Ok(Pubkey::new_from_array(candidate))
}

/// Searches for the canonical (highest viable) bump and returns the
/// address with it.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), AddressError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(AddressError::TooManySeeds(seeds.len() + 1));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(AddressError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(AddressError::NoViableBump)
}

/// Lets a program act for one of its derived addresses.
///
/// `seeds` must include the bump. Callers pass their own program id; the
/// ledger cannot tell which linked program is calling. Seeds that hash onto
/// the curve are refused, so the result never names a wallet.
pub fn derived_signer(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Signer, AddressError> {
    create_program_address(seeds, program_id).map(Signer::derived)
}

/// The standard associated holding account of `wallet` for `mint`.
///
/// `derive([wallet, token_program, mint])` under the associated-account
/// program. `wallet` may itself be a derived address, which is how a vault
/// gets its holding account.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Result<Pubkey, AddressError> {
    find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _)| address)
}
