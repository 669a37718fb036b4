//! Block record and its canonical hash form.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::Vote;

/// One block of an election's chain: a header plus the ordered votes it
/// confirms.
///
/// The genesis block is special-cased metadata rather than mined content:
/// its `previous_hash` slot carries the election's free-form description,
/// its `proof` slot carries the election id, and its timestamp is zero.
/// Neither slot is ever verified, but both feed the genesis hash, so they
/// must stay put for chain hashes to be reproducible across nodes.
///
/// Field order here defines the wire and snapshot JSON shape.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Zero-based position in the chain.
    pub index: u64,
    /// Hash of the preceding block; the election description in genesis.
    pub previous_hash: String,
    /// Wall-clock seconds at creation. Opaque; never verified.
    pub timestamp: u64,
    /// Ordered votes; in a mined block the last entry is the coinbase.
    pub votes: Vec<Vote>,
    /// Proof-of-work solution; the election id in genesis.
    pub proof: u64,
}

impl Block {
    /// Constructs a block stamped with the current wall clock.
    pub fn new(index: u64, previous_hash: impl Into<String>, votes: Vec<Vote>, proof: u64) -> Self {
        Self::with_timestamp(index, previous_hash, votes, proof, current_unix_timestamp())
    }

    /// Constructs a block with an explicit timestamp (wire/snapshot decode).
    pub fn with_timestamp(
        index: u64,
        previous_hash: impl Into<String>,
        votes: Vec<Vote>,
        proof: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            votes,
            proof,
        }
    }

    /// Builds the genesis block for an election.
    pub fn genesis(election_id: u64, description: &str) -> Self {
        Self::with_timestamp(0, description, Vec::new(), election_id, 0)
    }

    /// Canonical JSON form hashed into `previous_hash` links.
    ///
    /// Votes are expanded to their signature-free dictionaries and all
    /// object keys serialize in sorted order, giving a byte-stable encoding
    /// on every platform.
    pub fn to_hash_value(&self) -> Value {
        let votes: Vec<Value> = self.votes.iter().map(Vote::to_hash_value).collect();
        json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
            "votes": votes,
            "proof": self.proof,
        })
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
///
/// On error (system clock before epoch) this falls back to 0.
fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_stores_election_metadata() {
        let genesis = Block::genesis(7, "general election");
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "general election");
        assert_eq!(genesis.proof, 7);
        assert_eq!(genesis.timestamp, 0);
        assert!(genesis.votes.is_empty());
    }

    #[test]
    fn hash_value_sorts_keys_and_expands_votes() {
        let votes = vec![Vote::new("v", "c", "sig", 1)];
        let block = Block::with_timestamp(1, "prev", votes, 42, 1_700_000_000);
        assert_eq!(
            block.to_hash_value().to_string(),
            r#"{"index":1,"previous_hash":"prev","proof":42,"timestamp":1700000000,"votes":[{"amount":1,"candidate":"c","voter":"v"}]}"#
        );
    }

    #[test]
    fn wire_shape_keeps_field_order() {
        let block = Block::with_timestamp(0, "desc", Vec::new(), 3, 0);
        let encoded = serde_json::to_string(&block).expect("block should serialize");
        assert_eq!(
            encoded,
            r#"{"index":0,"previous_hash":"desc","timestamp":0,"votes":[],"proof":3}"#
        );
    }

    #[test]
    fn new_blocks_are_stamped_with_the_wall_clock() {
        let block = Block::new(1, "prev", Vec::new(), 0);
        assert!(block.timestamp > 0);
    }
}
