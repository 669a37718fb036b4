//! Pure validity predicates.
//!
//! Everything here is deterministic and side-effect free: proof-of-work
//! acceptance, whole-chain validity, and single-vote validity. The ledger
//! calls these on every mutation; peers' chains go through [`verify_chain`]
//! before they can replace local state.

use serde_json::Value;

use crate::ballot::Ballot;
use crate::hashing::{hash_block, hash_string_256};
use crate::types::{Block, POW_PREFIX, Vote};

/// Returns `true` if `proof` solves the puzzle for the given pending votes
/// and predecessor hash.
///
/// The guess string is the canonical JSON array of signature-free vote
/// dictionaries (in the order passed), followed by the predecessor hash and
/// the decimal proof. Only a hash starting with [`POW_PREFIX`] is accepted.
/// This is not the hash stored in `previous_hash` links; it exists only for
/// the proof-of-work puzzle.
pub fn valid_proof(votes: &[Vote], last_hash: &str, proof: u64) -> bool {
    let dicts: Vec<Value> = votes.iter().map(Vote::to_hash_value).collect();
    let guess = format!("{}{}{}", Value::Array(dicts), last_hash, proof);
    hash_string_256(guess.as_bytes()).starts_with(POW_PREFIX)
}

/// Returns `true` if `chain` is a valid hash chain with valid proofs.
///
/// The genesis block is metadata and never checked. For every later block
/// the `previous_hash` link must match the predecessor's content hash, and
/// the proof must hold over the block's votes minus the trailing coinbase
/// (the miner appends the coinbase after solving, so it is not proof
/// input).
pub fn verify_chain(chain: &[Block]) -> bool {
    for (index, block) in chain.iter().enumerate() {
        if index == 0 {
            continue;
        }
        if block.previous_hash != hash_block(&chain[index - 1]) {
            return false;
        }
        let mined = &block.votes[..block.votes.len().saturating_sub(1)];
        if !valid_proof(mined, &block.previous_hash, block.proof) {
            return false;
        }
    }
    true
}

/// Returns `true` if `vote` carries a valid signature and, when
/// `check_funds` is set, the voter's balance covers the amount.
pub fn verify_vote<F>(vote: &Vote, get_balance: F, check_funds: bool) -> bool
where
    F: Fn(&str) -> i64,
{
    if check_funds {
        get_balance(&vote.voter) >= vote.amount as i64 && Ballot::verify_vote(vote)
    } else {
        Ballot::verify_vote(vote)
    }
}

/// Searches for the smallest proof accepted by [`valid_proof`].
///
/// Bounded in practice by the two-nibble target (~256 expected attempts).
pub fn proof_of_work(votes: &[Vote], last_hash: &str) -> u64 {
    let mut proof = 0;
    while !valid_proof(votes, last_hash, proof) {
        proof += 1;
    }
    proof
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::test_keypair;

    fn signed_vote(candidate: &str) -> Vote {
        let (private_key, public_key) = test_keypair();
        let signature =
            Ballot::sign_vote(public_key, private_key, candidate, 1).expect("signing should work");
        Vote::new(public_key.clone(), candidate, signature, 1)
    }

    /// Mines one block on top of `chain` the way the ledger does.
    fn mine_on(chain: &mut Vec<Block>, votes: Vec<Vote>) {
        let last_hash = hash_block(chain.last().expect("chain is genesis-rooted"));
        let proof = proof_of_work(&votes, &last_hash);
        let mut confirmed = votes;
        confirmed.push(Vote::coinbase("miner-pk"));
        chain.push(Block::new(chain.len() as u64, last_hash, confirmed, proof));
    }

    #[test]
    fn proof_of_work_solutions_are_accepted() {
        let votes = vec![Vote::new("v", "c", "sig", 1)];
        let proof = proof_of_work(&votes, "last-hash");
        assert!(valid_proof(&votes, "last-hash", proof));
    }

    #[test]
    fn valid_proof_ignores_signatures() {
        let votes = vec![Vote::new("v", "c", "sig", 1)];
        let proof = proof_of_work(&votes, "last-hash");
        let resigned = vec![Vote::new("v", "c", "another-sig", 1)];
        assert!(valid_proof(&resigned, "last-hash", proof));
    }

    #[test]
    fn genesis_only_chain_is_valid() {
        let chain = vec![Block::genesis(1, "first election")];
        assert!(verify_chain(&chain));
    }

    #[test]
    fn mined_chain_is_valid() {
        let mut chain = vec![Block::genesis(1, "first election")];
        mine_on(&mut chain, Vec::new());
        mine_on(&mut chain, vec![signed_vote("candidate")]);
        assert!(verify_chain(&chain));
    }

    #[test]
    fn broken_linkage_is_rejected() {
        let mut chain = vec![Block::genesis(1, "first election")];
        mine_on(&mut chain, Vec::new());
        chain[1].previous_hash = "forged".to_string();
        assert!(!verify_chain(&chain));
    }

    #[test]
    fn tampered_history_is_rejected() {
        let mut chain = vec![Block::genesis(1, "first election")];
        mine_on(&mut chain, vec![signed_vote("candidate")]);
        mine_on(&mut chain, Vec::new());
        // Redirecting a confirmed vote changes that block's content hash,
        // so the successor's previous_hash link no longer matches.
        chain[1].votes[0].candidate = "usurper".to_string();
        assert!(!verify_chain(&chain));
    }

    #[test]
    fn verify_vote_checks_signature_and_optionally_funds() {
        let vote = signed_vote("candidate");

        assert!(verify_vote(&vote, |_| 0, false));
        assert!(verify_vote(&vote, |_| 1, true));
        assert!(!verify_vote(&vote, |_| 0, true));

        let mut forged = vote.clone();
        forged.candidate = "someone-else".to_string();
        assert!(!verify_vote(&forged, |_| 1, false));
    }
}
