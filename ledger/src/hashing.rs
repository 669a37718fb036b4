//! Canonical hashing.
//!
//! Chain linkage and proof-of-work both depend on every node producing the
//! same bytes for the same logical block, so all hash inputs go through the
//! sorted-key JSON forms defined on the domain records. `serde_json`'s
//! default object map is ordered, which makes `Value` serialization the
//! stable canonicalizer.

use sha2::{Digest, Sha256};

use crate::types::Block;

/// SHA-256 of `data`, rendered as lowercase hex.
pub fn hash_string_256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Content hash of a block over its canonical JSON form.
///
/// This is the value stored in the *next* block's `previous_hash` slot. It
/// is not the proof-of-work hash; that one is computed over the pending
/// votes in [`crate::verification::valid_proof`].
pub fn hash_block(block: &Block) -> String {
    hash_string_256(block.to_hash_value().to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vote;

    fn sample_block() -> Block {
        let votes = vec![Vote::new("voter-a", "candidate-b", "sig", 1)];
        Block::with_timestamp(1, "prev-hash", votes, 42, 1_700_000_000)
    }

    #[test]
    fn hash_string_256_is_lowercase_hex() {
        let digest = hash_string_256(b"hello");
        assert_eq!(digest.len(), 64);
        assert!(
            digest
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn hash_block_is_deterministic() {
        let block = sample_block();
        assert_eq!(hash_block(&block), hash_block(&block.clone()));
    }

    #[test]
    fn hash_block_ignores_signatures() {
        let mut signed = sample_block();
        let mut resigned = signed.clone();
        resigned.votes[0].signature = "different".to_string();
        assert_eq!(hash_block(&signed), hash_block(&resigned));

        // Any canonical field change must move the hash.
        signed.votes[0].amount = 2;
        assert_ne!(hash_block(&signed), hash_block(&resigned));
    }

    #[test]
    fn hash_block_covers_every_header_field() {
        let base = sample_block();

        let mut other = base.clone();
        other.index = 2;
        assert_ne!(hash_block(&base), hash_block(&other));

        let mut other = base.clone();
        other.previous_hash = "elsewhere".to_string();
        assert_ne!(hash_block(&base), hash_block(&other));

        let mut other = base.clone();
        other.timestamp += 1;
        assert_ne!(hash_block(&base), hash_block(&other));

        let mut other = base.clone();
        other.proof += 1;
        assert_ne!(hash_block(&base), hash_block(&other));
    }
}
