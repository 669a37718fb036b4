//! Election registry: one ledger per election id.
//!
//! The registry is process-wide mutable state and sits behind its own lock
//! in the adapter, distinct from the per-ledger mutexes it hands out.
//! Elections are created (or re-synced from their snapshot) by
//! [`ElectionRegistry::open`] and thereafter only looked up; there is no
//! deletion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::SnapshotConfig;
use crate::ledger::Ledger;

/// Maps election ids to their shared, individually-locked ledgers.
pub struct ElectionRegistry {
    elections: HashMap<u64, Arc<Mutex<Ledger>>>,
    node_id: u16,
    snapshot: SnapshotConfig,
}

impl ElectionRegistry {
    /// An empty registry for this node.
    pub fn new(node_id: u16, snapshot: SnapshotConfig) -> Self {
        Self {
            elections: HashMap::new(),
            node_id,
            snapshot,
        }
    }

    /// Creates the ledger for `election_id`, or re-syncs it from its
    /// snapshot file, and registers it. The snapshot is written immediately
    /// so a freshly created election survives a restart.
    pub fn open(
        &mut self,
        election_id: u64,
        description: &str,
        miner_key: Option<String>,
    ) -> Arc<Mutex<Ledger>> {
        let ledger = Ledger::open(
            miner_key,
            self.node_id,
            election_id,
            description,
            self.snapshot.clone(),
        );
        ledger.save();
        let handle = Arc::new(Mutex::new(ledger));
        self.elections.insert(election_id, handle.clone());
        handle
    }

    /// The ledger handle for `election_id`, if the election exists.
    pub fn get(&self, election_id: u64) -> Option<Arc<Mutex<Ledger>>> {
        self.elections.get(&election_id).cloned()
    }

    /// Whether `election_id` is registered on this node.
    pub fn contains(&self, election_id: u64) -> bool {
        self.elections.contains_key(&election_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_registers_and_get_returns_the_same_ledger() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut registry = ElectionRegistry::new(8900, SnapshotConfig::at(dir.path()));

        assert!(!registry.contains(1));
        let opened = registry.open(1, "general election", None);
        assert!(registry.contains(1));

        let fetched = registry.get(1).expect("election should be registered");
        assert!(Arc::ptr_eq(&opened, &fetched));
        assert!(registry.get(2).is_none());
    }

    #[tokio::test]
    async fn reopening_resyncs_from_the_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");

        {
            let mut registry = ElectionRegistry::new(8900, SnapshotConfig::at(dir.path()));
            let handle = registry.open(1, "general election", None);
            handle.lock().await.add_peer_node("http://127.0.0.1:8901");
        }

        let mut registry = ElectionRegistry::new(8900, SnapshotConfig::at(dir.path()));
        let handle = registry.open(1, "general election", None);
        let peers = handle.lock().await.peer_nodes();
        assert_eq!(peers, vec!["http://127.0.0.1:8901".to_string()]);
    }
}
