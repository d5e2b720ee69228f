//! Snapshot store
//!
//! Holds the committed merged set and the price projection derived from it.
//! Both are swapped together under one short write lock, so readers always
//! see a pair from the same cycle and never wait on an in-flight fetch.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use meme_core::{identity_key, TokenRecord};

/// identity -> price for one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceProjection {
    prices: HashMap<String, f64>,
}

impl PriceProjection {
    pub fn from_records(records: &[TokenRecord]) -> Self {
        Self {
            prices: records.iter().map(|r| (r.identity(), r.price_usd)).collect(),
        }
    }

    pub fn price_of(&self, address: &str) -> Option<f64> {
        self.prices.get(&identity_key(address)).copied()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.prices.contains_key(&identity_key(address))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Identities present here but absent from `current`, sorted
    pub fn departed(&self, current: &[TokenRecord]) -> Vec<String> {
        let present: std::collections::HashSet<String> = current.iter().map(|r| r.identity()).collect();
        let mut gone: Vec<String> = self
            .prices
            .keys()
            .filter(|k| !present.contains(*k))
            .cloned()
            .collect();
        gone.sort();
        gone
    }
}

/// Immutable committed view of all merged records
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<TokenRecord>,
    /// Number of commits that preceded and include this one; 0 before the first
    pub cycle: u64,
    pub committed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&TokenRecord> {
        let key = identity_key(address);
        self.records.iter().find(|r| r.identity() == key)
    }
}

#[derive(Debug, Default)]
struct Committed {
    snapshot: Arc<Snapshot>,
    projection: Arc<PriceProjection>,
}

/// Process-lifetime holder of the current snapshot
#[derive(Debug)]
pub struct SnapshotStore {
    committed: RwLock<Committed>,
    commit_count: AtomicU64,
    last_commit: RwLock<Option<Instant>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(Committed::default()),
            commit_count: AtomicU64::new(0),
            last_commit: RwLock::new(None),
        }
    }

    /// Current committed snapshot; empty before the first commit
    pub fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.committed.read().snapshot)
    }

    /// Projection of the current snapshot, used for the next diff
    pub fn projection(&self) -> Arc<PriceProjection> {
        Arc::clone(&self.committed.read().projection)
    }

    /// Replace the snapshot and its projection in one swap
    pub fn commit(&self, records: Vec<TokenRecord>) -> Arc<Snapshot> {
        let cycle = self.commit_count.fetch_add(1, Ordering::SeqCst) + 1;
        let projection = Arc::new(PriceProjection::from_records(&records));
        let snapshot = Arc::new(Snapshot {
            records,
            cycle,
            committed_at: Some(Utc::now()),
        });

        {
            let mut committed = self.committed.write();
            committed.snapshot = Arc::clone(&snapshot);
            committed.projection = projection;
        }
        *self.last_commit.write() = Some(Instant::now());

        snapshot
    }

    pub fn stats(&self) -> SnapshotStats {
        let snapshot = self.read();
        SnapshotStats {
            token_count: snapshot.len(),
            commit_count: self.commit_count.load(Ordering::Relaxed),
            committed_at: snapshot.committed_at,
            last_commit_age: self.last_commit.read().map(|t| t.elapsed()),
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the snapshot store
#[derive(Debug, Clone)]
pub struct SnapshotStats {
    pub token_count: usize,
    pub commit_count: u64,
    pub committed_at: Option<DateTime<Utc>>,
    pub last_commit_age: Option<Duration>,
}
