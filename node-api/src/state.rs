//! Shared application state for the HTTP adapter.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use ledger::{Ballot, ElectionRegistry, PeerClient};

/// State held by every request handler.
///
/// The registry map has its own lock, distinct from the per-ledger mutexes
/// it hands out: handlers take the registry lock only long enough to fetch
/// a ledger handle, then operate under that ledger's mutex. Peer fan-out
/// always runs after the ledger lock is dropped.
pub struct AppState {
    /// Election id → ledger map.
    pub registry: RwLock<ElectionRegistry>,
    /// The node's own keypair: miner rewards and server-side signing.
    pub ballot: Mutex<Ballot>,
    /// Gossip client shared by all fan-out paths.
    pub peers: PeerClient,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
