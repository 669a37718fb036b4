//! Node-level storage configuration.
//!
//! Every ledger writes a line-oriented snapshot after each state mutation,
//! and the node's own keypair lives next to those snapshots. This module
//! pins down where on disk both go.

use std::path::PathBuf;

/// Where ledger snapshots and the node ballot file live.
///
/// The directory holds one `ledger-<node>-<election>.txt` snapshot per
/// election plus the node's `ballot-<node>.txt` keypair. It is created on
/// first write; no other process may write to it.
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    /// Directory for snapshot and ballot files.
    pub dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

impl SnapshotConfig {
    /// Configuration rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}
