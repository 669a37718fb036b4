//! HTTP gossip client.
//!
//! Replicates votes and blocks to the configured peer set and fetches peer
//! chains for conflict resolution. Every per-peer call is independent: a
//! transport error skips that peer (logged, never retried — the next mine
//! or resolve cycle reconciles), while an HTTP-level rejection is reported
//! to the caller as an outcome.
//!
//! All calls here block on the network, so the adapter must invoke them
//! after the ledger lock is released, against snapshots of the peer set
//! and the payload.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::types::{Block, Vote};

/// Errors from talking to a single peer.
#[derive(Debug)]
pub enum PeerError {
    /// Connection, DNS, or timeout failure; the peer was never reached.
    Transport(String),
    /// The peer answered with a body this node could not interpret.
    Protocol(String),
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerError::Transport(msg) => write!(f, "peer transport error: {msg}"),
            PeerError::Protocol(msg) => write!(f, "peer protocol error: {msg}"),
        }
    }
}

impl std::error::Error for PeerError {}

/// How a single peer answered a vote broadcast.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteOutcome {
    /// The peer admitted the vote.
    Accepted,
    /// The peer rejected it (4xx/5xx); the histories need resolving.
    Declined,
}

/// How a single peer answered a block broadcast.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockOutcome {
    /// The peer appended the block (or merely flagged itself to resolve).
    Accepted,
    /// The peer holds a conflicting chain (409); resolve before mining on.
    Conflict,
    /// The peer rejected the block outright (other 4xx/5xx).
    Declined,
}

/// Aggregate result of fanning a vote out to the peer set.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoteFanout {
    /// A reachable peer declined the vote.
    pub declined: bool,
}

/// Aggregate result of fanning a block out to the peer set.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockFanout {
    /// A reachable peer reported a conflicting chain.
    pub conflict: bool,
}

#[derive(Debug, Serialize)]
struct BroadcastVoteRequest<'a> {
    election: u64,
    voter: &'a str,
    candidate: &'a str,
    amount: u64,
    signature: &'a str,
}

#[derive(Debug, Serialize)]
struct BroadcastBlockRequest<'a> {
    election: u64,
    block: &'a Block,
}

/// Fire-and-forget JSON client for the peer replication endpoints.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    /// Builds a client whose requests all carry `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn endpoint(base: &str, path: &str) -> String {
        // Avoid accidental double slashes.
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POSTs a vote to one peer's `/broadcast-vote`.
    pub async fn broadcast_vote(
        &self,
        peer: &str,
        election: u64,
        vote: &Vote,
    ) -> Result<VoteOutcome, PeerError> {
        let url = Self::endpoint(peer, "/broadcast-vote");
        let body = BroadcastVoteRequest {
            election,
            voter: &vote.voter,
            candidate: &vote.candidate,
            amount: vote.amount,
            signature: &vote.signature,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PeerError::Transport(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            Ok(VoteOutcome::Declined)
        } else {
            Ok(VoteOutcome::Accepted)
        }
    }

    /// POSTs a freshly mined block to one peer's `/broadcast-block`.
    pub async fn broadcast_block(
        &self,
        peer: &str,
        election: u64,
        block: &Block,
    ) -> Result<BlockOutcome, PeerError> {
        let url = Self::endpoint(peer, "/broadcast-block");
        let body = BroadcastBlockRequest { election, block };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PeerError::Transport(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            Ok(BlockOutcome::Conflict)
        } else if status.is_client_error() || status.is_server_error() {
            Ok(BlockOutcome::Declined)
        } else {
            Ok(BlockOutcome::Accepted)
        }
    }

    /// GETs one peer's full chain for an election.
    pub async fn fetch_chain(&self, peer: &str, election: u64) -> Result<Vec<Block>, PeerError> {
        let url = Self::endpoint(peer, "/chain");
        let response = self
            .client
            .get(&url)
            .query(&[("election", election)])
            .send()
            .await
            .map_err(|e| PeerError::Transport(format!("GET {url} failed: {e}")))?;

        response
            .json::<Vec<Block>>()
            .await
            .map_err(|e| PeerError::Protocol(format!("failed to parse chain from {url}: {e}")))
    }

    /// Fans a freshly admitted vote out to every peer.
    ///
    /// Unreachable peers are skipped. The first peer that declines stops
    /// the fan-out and is reported to the caller; the vote stays admitted
    /// locally either way.
    pub async fn fan_out_vote(&self, peers: &[String], election: u64, vote: &Vote) -> VoteFanout {
        for peer in peers {
            match self.broadcast_vote(peer, election, vote).await {
                Ok(VoteOutcome::Accepted) => {}
                Ok(VoteOutcome::Declined) => {
                    tracing::warn!(%peer, election, "vote declined by peer, needs resolving");
                    return VoteFanout { declined: true };
                }
                Err(err) => {
                    tracing::warn!(%peer, election, error = %err, "skipping unreachable peer");
                }
            }
        }
        VoteFanout::default()
    }

    /// Fans a freshly mined block out to every peer.
    ///
    /// Unreachable peers are skipped; declines are logged; any 409 marks
    /// the fan-out as conflicted so the caller can raise the resolve flag.
    pub async fn fan_out_block(
        &self,
        peers: &[String],
        election: u64,
        block: &Block,
    ) -> BlockFanout {
        let mut fanout = BlockFanout::default();
        for peer in peers {
            match self.broadcast_block(peer, election, block).await {
                Ok(BlockOutcome::Accepted) => {}
                Ok(BlockOutcome::Conflict) => {
                    tracing::warn!(%peer, election, "peer chain conflicts, needs resolving");
                    fanout.conflict = true;
                }
                Ok(BlockOutcome::Declined) => {
                    tracing::warn!(%peer, election, "block declined by peer");
                }
                Err(err) => {
                    tracing::warn!(%peer, election, error = %err, "skipping unreachable peer");
                }
            }
        }
        fanout
    }

    /// Fetches every reachable peer's chain; unreachable or garbled peers
    /// are skipped.
    pub async fn fetch_chains(&self, peers: &[String], election: u64) -> Vec<Vec<Block>> {
        let mut chains = Vec::with_capacity(peers.len());
        for peer in peers {
            match self.fetch_chain(peer, election).await {
                Ok(chain) => chains.push(chain),
                Err(err) => {
                    tracing::warn!(%peer, election, error = %err, "skipping unreachable peer");
                }
            }
        }
        chains
    }
}
