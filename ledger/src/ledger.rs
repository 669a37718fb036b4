//! Per-election ledger state machine.
//!
//! A [`Ledger`] owns one election's chain, mempool, and peer set, and
//! persists a snapshot after every state mutation. All methods are local:
//! peer fan-out happens in the adapter after the ledger lock is released,
//! against the peer snapshot returned by [`Ledger::peer_nodes`]. Callers
//! must serialize access per ledger; the adapter wraps each ledger in a
//! mutex.
//!
//! Snapshot format is three newline-terminated JSON arrays: the chain with
//! fully-expanded votes, the mempool, and the peer URLs. Loading is
//! best-effort and all-or-nothing: a missing or malformed file leaves the
//! genesis-rooted defaults.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::ballot::Ballot;
use crate::config::SnapshotConfig;
use crate::hashing::hash_block;
use crate::types::{Block, Vote};
use crate::verification::{proof_of_work, valid_proof, verify_chain, verify_vote};

/// Errors from ledger mutations.
#[derive(Debug)]
pub enum LedgerError {
    /// The voter has already cast a vote in this election.
    AlreadyVoted,
    /// A vote's signature does not verify against its stated voter.
    InvalidSignature,
    /// Mining requires the node's public key and none is configured.
    MissingMinerKey,
    /// An incoming block failed proof or linkage checks.
    InvalidBlock(&'static str),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::AlreadyVoted => write!(f, "voter has already voted"),
            LedgerError::InvalidSignature => write!(f, "vote signature does not verify"),
            LedgerError::MissingMinerKey => write!(f, "no miner public key configured"),
            LedgerError::InvalidBlock(msg) => write!(f, "invalid block: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// One election's replicated state.
pub struct Ledger {
    chain: Vec<Block>,
    mempool: Vec<Vote>,
    peers: BTreeSet<String>,
    /// Miner's public key; coinbase rewards of this node accrue to it.
    pub public_key: Option<String>,
    node_id: u16,
    election_id: u64,
    needs_resolve: bool,
    snapshot: SnapshotConfig,
}

impl Ledger {
    /// Opens the ledger for an election.
    ///
    /// Starts from a fresh genesis block carrying `(election_id,
    /// description)`, then re-syncs chain, mempool, and peers from the
    /// snapshot file if a readable one exists.
    pub fn open(
        public_key: Option<String>,
        node_id: u16,
        election_id: u64,
        description: &str,
        snapshot: SnapshotConfig,
    ) -> Self {
        let mut ledger = Self {
            chain: vec![Block::genesis(election_id, description)],
            mempool: Vec::new(),
            peers: BTreeSet::new(),
            public_key,
            node_id,
            election_id,
            needs_resolve: false,
            snapshot,
        };
        ledger.load();
        ledger
    }

    /// The election this ledger belongs to.
    pub fn election_id(&self) -> u64 {
        self.election_id
    }

    /// The confirmed chain, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Admitted but unmined votes, in admission order.
    pub fn mempool(&self) -> &[Vote] {
        &self.mempool
    }

    /// The chain tip.
    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain is genesis-rooted")
    }

    /// Snapshot of the peer URL set.
    pub fn peer_nodes(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    /// Whether a peer advertised a longer or conflicting chain.
    ///
    /// While set, mining is refused; [`Ledger::apply_resolve`] clears it.
    pub fn needs_resolve(&self) -> bool {
        self.needs_resolve
    }

    /// Raises or clears the conflict flag.
    pub fn set_needs_resolve(&mut self, needs_resolve: bool) {
        self.needs_resolve = needs_resolve;
    }

    /// Admits a vote into the mempool.
    ///
    /// Enforces one vote per voter across chain and mempool, then checks
    /// the signature (funds are deliberately not checked at admission).
    /// Persists on success. Broadcasting to peers is the caller's job.
    pub fn add_vote(
        &mut self,
        candidate: &str,
        voter: &str,
        signature: &str,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if self.has_voted(voter) {
            return Err(LedgerError::AlreadyVoted);
        }
        let vote = Vote::new(voter, candidate, signature, amount);
        if !verify_vote(&vote, |participant| self.get_balance(participant), false) {
            return Err(LedgerError::InvalidSignature);
        }
        self.mempool.push(vote);
        self.save();
        Ok(())
    }

    /// Mines the mempool into a new block and appends it to the chain.
    ///
    /// The proof is searched over the mempool as-is; the coinbase vote is
    /// appended afterwards and is therefore not proof input. Every pending
    /// vote's signature is re-checked right before inclusion; any failure
    /// aborts the mine with the mempool untouched. On success the mempool
    /// is cleared, the snapshot written, and the block returned for
    /// broadcast.
    pub fn mine_block(&mut self) -> Result<Block, LedgerError> {
        let miner = self
            .public_key
            .clone()
            .ok_or(LedgerError::MissingMinerKey)?;
        let last_hash = hash_block(self.last_block());
        let proof = proof_of_work(&self.mempool, &last_hash);

        let mut votes = self.mempool.clone();
        if votes.iter().any(|vt| !Ballot::verify_vote(vt)) {
            return Err(LedgerError::InvalidSignature);
        }
        votes.push(Vote::coinbase(&miner));

        let block = Block::new(self.chain.len() as u64, last_hash, votes, proof);
        self.chain.push(block.clone());
        self.mempool.clear();
        self.save();
        tracing::info!(
            election = self.election_id,
            index = block.index,
            votes = block.votes.len(),
            "mined block"
        );
        Ok(block)
    }

    /// Appends a peer-mined block to the chain.
    ///
    /// The proof must hold over the block's votes minus the trailing
    /// coinbase, and the block must link onto the local tip. Confirmed
    /// votes are pruned from the mempool by full four-tuple match; votes a
    /// racing removal already took out are tolerated.
    pub fn add_block(&mut self, block: Block) -> Result<(), LedgerError> {
        let mined = &block.votes[..block.votes.len().saturating_sub(1)];
        if !valid_proof(mined, &block.previous_hash, block.proof) {
            return Err(LedgerError::InvalidBlock("proof of work does not hold"));
        }
        if hash_block(self.last_block()) != block.previous_hash {
            return Err(LedgerError::InvalidBlock(
                "previous hash does not match local tip",
            ));
        }
        self.mempool
            .retain(|pending| !block.votes.contains(pending));
        self.chain.push(block);
        self.save();
        Ok(())
    }

    /// Resolves divergent histories against chains fetched from peers.
    ///
    /// The local chain is the provisional winner; any strictly longer chain
    /// that passes [`verify_chain`] replaces it (ties keep local). Clears
    /// the conflict flag either way, clears the mempool on replacement, and
    /// persists. Returns whether a replacement occurred.
    pub fn apply_resolve(&mut self, peer_chains: Vec<Vec<Block>>) -> bool {
        let mut replaced = false;
        for candidate in peer_chains {
            if candidate.len() > self.chain.len() && verify_chain(&candidate) {
                self.chain = candidate;
                replaced = true;
            }
        }
        self.needs_resolve = false;
        if replaced {
            self.mempool.clear();
            tracing::info!(
                election = self.election_id,
                length = self.chain.len(),
                "adopted longer peer chain"
            );
        }
        self.save();
        replaced
    }

    /// Net balance: votes received in confirmed blocks minus votes sent
    /// across chain and mempool.
    ///
    /// Pending votes count against the sender immediately (no double
    /// spending) but never credit the recipient (unconfirmed income is not
    /// income). Can go negative for a voter who spends before receiving.
    pub fn get_balance(&self, participant: &str) -> i64 {
        let confirmed = self.chain.iter().flat_map(|block| &block.votes);
        let sent: u64 = confirmed
            .clone()
            .chain(self.mempool.iter())
            .filter(|vt| vt.voter == participant)
            .map(|vt| vt.amount)
            .sum();
        let received: u64 = confirmed
            .filter(|vt| vt.candidate == participant)
            .map(|vt| vt.amount)
            .sum();
        received as i64 - sent as i64
    }

    /// Total mining rewards confirmed for `participant`.
    pub fn get_totalmines(&self, participant: &str) -> u64 {
        self.chain
            .iter()
            .flat_map(|block| &block.votes)
            .filter(|vt| vt.candidate == participant && vt.is_coinbase())
            .map(|vt| vt.amount)
            .sum()
    }

    /// Confirmed, non-coinbase vote weight for `candidate`.
    pub fn get_results(&self, candidate: &str) -> u64 {
        self.chain
            .iter()
            .flat_map(|block| &block.votes)
            .filter(|vt| vt.candidate == candidate && !vt.is_coinbase())
            .map(|vt| vt.amount)
            .sum()
    }

    /// Voters behind the confirmed, non-coinbase votes for `candidate`.
    pub fn get_results_voters(&self, candidate: &str) -> Vec<String> {
        self.chain
            .iter()
            .flat_map(|block| &block.votes)
            .filter(|vt| vt.candidate == candidate && !vt.is_coinbase())
            .map(|vt| vt.voter.clone())
            .collect()
    }

    /// Whether `voter` has a vote anywhere in chain or mempool.
    pub fn has_voted(&self, voter: &str) -> bool {
        let sent: u64 = self
            .chain
            .iter()
            .flat_map(|block| &block.votes)
            .chain(self.mempool.iter())
            .filter(|vt| vt.voter == voter)
            .map(|vt| vt.amount)
            .sum();
        sent >= 1
    }

    /// Adds a peer base URL and persists.
    pub fn add_peer_node(&mut self, node: &str) {
        self.peers.insert(node.to_string());
        self.save();
    }

    /// Removes a peer base URL and persists. Unknown peers are a no-op.
    pub fn remove_peer_node(&mut self, node: &str) {
        self.peers.remove(node);
        self.save();
    }

    fn snapshot_path(&self) -> PathBuf {
        self.snapshot
            .dir
            .join(format!("ledger-{}-{}.txt", self.node_id, self.election_id))
    }

    /// Writes the snapshot; failures are logged and swallowed.
    pub fn save(&self) {
        if let Err(err) = self.try_save() {
            tracing::warn!(
                election = self.election_id,
                error = %err,
                "failed to write ledger snapshot"
            );
        }
    }

    fn try_save(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.snapshot.dir)?;
        let chain = serde_json::to_string(&self.chain).map_err(std::io::Error::other)?;
        let mempool = serde_json::to_string(&self.mempool).map_err(std::io::Error::other)?;
        let peers = serde_json::to_string(&self.peer_nodes()).map_err(std::io::Error::other)?;
        fs::write(self.snapshot_path(), format!("{chain}\n{mempool}\n{peers}\n"))
    }

    /// Best-effort snapshot load; leaves defaults unless all three lines
    /// parse and the chain is non-empty.
    fn load(&mut self) {
        let Ok(raw) = fs::read_to_string(self.snapshot_path()) else {
            return;
        };
        let mut lines = raw.lines();
        let (Some(chain_line), Some(mempool_line), Some(peers_line)) =
            (lines.next(), lines.next(), lines.next())
        else {
            return;
        };
        let Ok(chain) = serde_json::from_str::<Vec<Block>>(chain_line) else {
            return;
        };
        let Ok(mempool) = serde_json::from_str::<Vec<Vote>>(mempool_line) else {
            return;
        };
        let Ok(peers) = serde_json::from_str::<Vec<String>>(peers_line) else {
            return;
        };
        if chain.is_empty() {
            return;
        }
        self.chain = chain;
        self.mempool = mempool;
        self.peers = peers.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::test_keypair;
    use crate::types::{MINING_REWARD, MINING_SENDER};

    fn open_ledger(dir: &std::path::Path, node_id: u16, miner: Option<String>) -> Ledger {
        Ledger::open(miner, node_id, 1, "general election", SnapshotConfig::at(dir))
    }

    fn miner_key() -> String {
        test_keypair().1.clone()
    }

    fn sign(candidate: &str) -> (String, String) {
        let (private_key, public_key) = test_keypair();
        let signature = Ballot::sign_vote(public_key, private_key, candidate, 1)
            .expect("signing should succeed");
        (public_key.clone(), signature)
    }

    #[test]
    fn mining_extends_the_chain_and_rewards_the_miner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));

        let block = ledger.mine_block().expect("mining should succeed");

        assert!(valid_proof(
            &block.votes[..block.votes.len() - 1],
            &block.previous_hash,
            block.proof
        ));
        assert_eq!(ledger.chain().len(), 2);
        assert!(ledger.mempool().is_empty());
        assert_eq!(ledger.get_balance(&miner_key()), MINING_REWARD as i64);
        assert_eq!(ledger.get_totalmines(&miner_key()), MINING_REWARD);
        assert!(verify_chain(ledger.chain()));
    }

    #[test]
    fn mining_without_a_key_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, None);
        assert!(matches!(
            ledger.mine_block(),
            Err(LedgerError::MissingMinerKey)
        ));
    }

    #[test]
    fn one_vote_per_voter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));
        let (voter, signature) = sign("candidate-b");

        ledger
            .add_vote("candidate-b", &voter, &signature, 1)
            .expect("first vote is admitted");
        assert!(ledger.has_voted(&voter));

        // A second vote is refused even for a different candidate, and the
        // mempool does not grow.
        let second = Ballot::sign_vote(&voter, &test_keypair().0, "candidate-x", 1)
            .expect("signing should succeed");
        assert!(matches!(
            ledger.add_vote("candidate-x", &voter, &second, 1),
            Err(LedgerError::AlreadyVoted)
        ));
        assert_eq!(ledger.mempool().len(), 1);
    }

    #[test]
    fn still_ineligible_after_the_vote_is_mined() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));
        let (voter, signature) = sign("candidate-b");

        ledger
            .add_vote("candidate-b", &voter, &signature, 1)
            .expect("vote is admitted");
        ledger.mine_block().expect("mining should succeed");

        assert!(ledger.has_voted(&voter));
        assert!(matches!(
            ledger.add_vote("candidate-x", &voter, &signature, 1),
            Err(LedgerError::AlreadyVoted)
        ));
    }

    #[test]
    fn forged_signatures_are_rejected_at_admission() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));
        let (voter, signature) = sign("candidate-b");

        // Signature does not cover this candidate.
        assert!(matches!(
            ledger.add_vote("candidate-x", &voter, &signature, 1),
            Err(LedgerError::InvalidSignature)
        ));
        assert!(ledger.mempool().is_empty());
    }

    #[test]
    fn a_smuggled_vote_aborts_mining() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));

        // Bypass admission to simulate a corrupted mempool entry.
        ledger
            .mempool
            .push(Vote::new("not-a-key", "candidate", "not-a-sig", 1));

        assert!(matches!(
            ledger.mine_block(),
            Err(LedgerError::InvalidSignature)
        ));
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.mempool().len(), 1);
    }

    #[test]
    fn balances_with_a_pending_vote() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The voter mines first so they have one confirmed vote to spend.
        let (voter, signature) = sign("candidate-b");
        let mut ledger = open_ledger(dir.path(), 8900, Some(voter.clone()));
        ledger.mine_block().expect("mining should succeed");
        assert_eq!(ledger.get_balance(&voter), 1);

        ledger
            .add_vote("candidate-b", &voter, &signature, 1)
            .expect("vote is admitted");

        // Pending: the sender is debited, the candidate not yet credited.
        assert_eq!(ledger.get_balance(&voter), 0);
        assert_eq!(ledger.get_balance("candidate-b"), 0);
        assert_eq!(ledger.get_results("candidate-b"), 0);

        ledger.mine_block().expect("mining should succeed");

        assert_eq!(ledger.get_balance("candidate-b"), 1);
        assert_eq!(ledger.get_results("candidate-b"), 1);
        assert_eq!(ledger.get_results_voters("candidate-b"), vec![voter.clone()]);
        // The second coinbase replenishes the voter-miner.
        assert_eq!(ledger.get_balance(&voter), 1);
    }

    #[test]
    fn coinbase_votes_do_not_count_as_ballots() {
        let dir = tempfile::tempdir().expect("tempdir");
        let miner = miner_key();
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner.clone()));
        ledger.mine_block().expect("mining should succeed");

        assert_eq!(ledger.get_results(&miner), 0);
        assert!(ledger.get_results_voters(&miner).is_empty());
        assert!(!ledger.has_voted(MINING_SENDER));
    }

    #[test]
    fn foreign_blocks_must_link_onto_the_tip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));

        let forged = Block::new(1, "not-the-tip-hash", Vec::new(), 0);
        assert!(ledger.add_block(forged).is_err());
        assert_eq!(ledger.chain().len(), 1);
    }

    #[test]
    fn accepted_foreign_blocks_prune_the_mempool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let miner_dir = tempfile::tempdir().expect("tempdir");

        // Two nodes share genesis; B mines a block containing A's pending vote.
        let (voter, signature) = sign("candidate-b");
        let mut node_a = open_ledger(dir.path(), 8900, Some(miner_key()));
        let mut node_b = open_ledger(miner_dir.path(), 8901, Some(miner_key()));

        node_a
            .add_vote("candidate-b", &voter, &signature, 1)
            .expect("vote admitted on A");
        node_b
            .add_vote("candidate-b", &voter, &signature, 1)
            .expect("vote admitted on B");

        let block = node_b.mine_block().expect("B mines the vote");
        node_a.add_block(block).expect("A accepts B's block");

        assert_eq!(node_a.chain().len(), 2);
        assert!(node_a.mempool().is_empty());
        assert!(verify_chain(node_a.chain()));
    }

    #[test]
    fn resolve_adopts_a_strictly_longer_valid_chain() {
        let dir_a = tempfile::tempdir().expect("tempdir");
        let dir_b = tempfile::tempdir().expect("tempdir");

        let mut node_a = open_ledger(dir_a.path(), 8900, Some(miner_key()));
        let mut node_b = open_ledger(dir_b.path(), 8901, Some(miner_key()));

        node_b.mine_block().expect("B mines");
        node_b.mine_block().expect("B mines again");

        // A has a pending vote that is wiped by the replacement.
        let (voter, signature) = sign("candidate-b");
        node_a
            .add_vote("candidate-b", &voter, &signature, 1)
            .expect("vote admitted on A");
        node_a.set_needs_resolve(true);

        let replaced = node_a.apply_resolve(vec![node_b.chain().to_vec()]);

        assert!(replaced);
        assert_eq!(node_a.chain().len(), 3);
        assert!(node_a.mempool().is_empty());
        assert!(!node_a.needs_resolve());
    }

    #[test]
    fn resolve_keeps_local_on_ties_and_invalid_chains() {
        let dir_a = tempfile::tempdir().expect("tempdir");
        let dir_b = tempfile::tempdir().expect("tempdir");

        let mut node_a = open_ledger(dir_a.path(), 8900, Some(miner_key()));
        let mut node_b = open_ledger(dir_b.path(), 8901, Some(miner_key()));

        node_a.mine_block().expect("A mines");
        node_b.mine_block().expect("B mines");

        // Equal length: local wins.
        assert!(!node_a.apply_resolve(vec![node_b.chain().to_vec()]));
        assert_eq!(node_a.chain().len(), 2);

        // Longer but corrupted: ignored.
        node_b.mine_block().expect("B mines again");
        let mut forged = node_b.chain().to_vec();
        forged[1].votes[0].candidate = "usurper".to_string();
        assert!(!node_a.apply_resolve(vec![forged]));
        assert_eq!(node_a.chain().len(), 2);
    }

    #[test]
    fn snapshots_reload_the_full_ledger_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (voter, signature) = sign("candidate-b");

        let (chain, mempool, peers) = {
            let mut ledger = open_ledger(dir.path(), 8900, Some(miner_key()));
            ledger.mine_block().expect("mining should succeed");
            ledger
                .add_vote("candidate-b", &voter, &signature, 1)
                .expect("vote admitted");
            ledger.add_peer_node("http://127.0.0.1:8901");
            (
                ledger.chain().to_vec(),
                ledger.mempool().to_vec(),
                ledger.peer_nodes(),
            )
        };

        let reloaded = open_ledger(dir.path(), 8900, Some(miner_key()));
        assert_eq!(reloaded.chain(), &chain[..]);
        assert_eq!(reloaded.mempool(), &mempool[..]);
        assert_eq!(reloaded.peer_nodes(), peers);
    }

    #[test]
    fn a_corrupt_snapshot_leaves_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("ledger-8900-1.txt"), "not json\n[]\n[]\n")
            .expect("write snapshot");

        let ledger = open_ledger(dir.path(), 8900, None);
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.last_block().previous_hash, "general election");
        assert!(ledger.mempool().is_empty());
        assert!(ledger.peer_nodes().is_empty());
    }

    #[test]
    fn peer_set_is_deduplicated_and_persistent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ledger = open_ledger(dir.path(), 8900, None);

        ledger.add_peer_node("http://127.0.0.1:8901");
        ledger.add_peer_node("http://127.0.0.1:8901");
        ledger.add_peer_node("http://127.0.0.1:8902");
        assert_eq!(ledger.peer_nodes().len(), 2);

        ledger.remove_peer_node("http://127.0.0.1:8901");
        ledger.remove_peer_node("http://127.0.0.1:9999");
        assert_eq!(ledger.peer_nodes(), vec!["http://127.0.0.1:8902".to_string()]);
    }
}
