//! Bookkeeping for proxies the upstream has rejected.

use std::collections::HashSet;

use log::info;
use parking_lot::RwLock;

/// Set of proxy endpoints that received HTTP 401 from the upstream.
///
/// Append-only for the life of the process: entries never expire and are
/// never removed. Blacklisted endpoints are skipped at selection time and
/// dropped from freshly fetched pools.
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: RwLock<HashSet<String>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejected endpoint. Inserting an already-known endpoint is a
    /// no-op.
    pub fn add(&self, endpoint: &str) {
        let mut entries = self.entries.write();
        if entries.insert(endpoint.to_string()) {
            info!("Blacklisted proxy {} ({} total)", endpoint, entries.len());
        }
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.entries.read().contains(endpoint)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
