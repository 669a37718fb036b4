//! Voting ledger library crate.
//!
//! This crate provides the core building blocks for a permissioned,
//! peer-replicated voting ledger in which every election is an independent
//! proof-of-work blockchain:
//!
//! - strongly-typed domain records (`types`),
//! - RSA vote signing and node key management (`ballot`),
//! - canonical block hashing (`hashing`),
//! - pure proof/chain/vote validity predicates (`verification`),
//! - the per-election ledger state machine (`ledger`),
//! - the election registry (`registry`),
//! - and the HTTP gossip client that replicates votes and blocks across
//!   peers (`gossip`).
//!
//! Higher-level binaries compose these pieces into voting nodes; the
//! `node-api` crate in this workspace is the reference HTTP adapter.

pub mod ballot;
pub mod config;
pub mod gossip;
pub mod hashing;
pub mod ledger;
pub mod registry;
pub mod types;
pub mod verification;

// Re-export key management.
pub use ballot::{Ballot, BallotError};

// Re-export node-level configuration.
pub use config::SnapshotConfig;

// Re-export the gossip client and its fan-out summaries.
pub use gossip::{BlockFanout, BlockOutcome, PeerClient, PeerError, VoteFanout, VoteOutcome};

// Re-export hashing helpers used by adapters and tests.
pub use hashing::{hash_block, hash_string_256};

// Re-export the ledger state machine.
pub use ledger::{Ledger, LedgerError};

// Re-export the election registry.
pub use registry::ElectionRegistry;

// Re-export validity predicates.
pub use verification::{valid_proof, verify_chain, verify_vote};

// Re-export domain records at the crate root for convenience.
pub use types::*;
