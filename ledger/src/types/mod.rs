//! Core domain records shared across the ledger implementation.
//!
//! This module defines the two records everything else is built from: the
//! signed [`Vote`] and the [`Block`] that confirms votes. Both carry their
//! wire shape via serde derives; the canonical forms used for hashing and
//! proof-of-work live next to the records so that every caller agrees on
//! them.

/// Block record and its canonical hash form.
pub mod block;
/// Vote record, its signing payload, and its canonical hash form.
pub mod vote;

pub use block::Block;
pub use vote::Vote;

/// Reserved `voter` literal carried by coinbase votes.
///
/// A vote whose voter is this literal rewards the miner and is never
/// signature-checked; real voters are hex-encoded public keys and can never
/// collide with it.
pub const MINING_SENDER: &str = "MINING";

/// Reward credited to the miner's public key by the coinbase vote.
pub const MINING_REWARD: u64 = 1;

/// Hex prefix a proof-of-work hash must carry to be accepted.
///
/// Two nibbles keep mining trivially cheap (~256 expected attempts), which
/// is intentional for a permissioned deployment.
pub const POW_PREFIX: &str = "00";
