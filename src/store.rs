//! Token-keyed storage for uploaded datasets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::data::Dataset;
use crate::error::{EngineError, Result};

struct Entry {
    dataset: Arc<Dataset>,
    last_access: Instant,
}

/// Bounded map from upload token to dataset.
///
/// Entries idle for longer than `ttl` expire; when full, the least recently
/// used entry is evicted to make room.
pub struct DatasetStore {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl DatasetStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store a dataset under a fresh token.
    pub fn insert(&self, dataset: Dataset) -> String {
        self.insert_at(dataset, Instant::now())
    }

    fn insert_at(&self, dataset: Dataset, now: Instant) -> String {
        let mut entries = self.lock();
        self.purge_locked(&mut entries, now);

        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(token, _)| token.clone());
            match oldest {
                Some(token) => {
                    warn!(%token, capacity = self.capacity, "evicting least recently used dataset");
                    entries.remove(&token);
                }
                None => break,
            }
        }

        let token = Uuid::new_v4().to_string();
        entries.insert(
            token.clone(),
            Entry {
                dataset: Arc::new(dataset),
                last_access: now,
            },
        );
        debug!(%token, stored = entries.len(), "stored dataset");
        token
    }

    /// Look up a dataset and mark it as recently used.
    pub fn get(&self, token: &str) -> Result<Arc<Dataset>> {
        self.get_at(token, Instant::now())
    }

    fn get_at(&self, token: &str, now: Instant) -> Result<Arc<Dataset>> {
        let mut entries = self.lock();
        match entries.get_mut(token) {
            None => return Err(EngineError::TokenNotFound),
            Some(entry) if now.duration_since(entry.last_access) <= self.ttl => {
                entry.last_access = now;
                return Ok(Arc::clone(&entry.dataset));
            }
            Some(_) => {}
        }
        debug!(%token, "dataset expired");
        entries.remove(token);
        Err(EngineError::TokenNotFound)
    }

    pub fn remove(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        self.purge_locked(&mut entries, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn purge_locked(&self, entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.last_access) <= self.ttl);
        before - entries.len()
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
