//! Shared tile repository with LRU eviction and coordinated loading.
//!
//! A [`TileStore`] owns its records through a recency list (most recently
//! used at the front) capped at `max_entries`. The key index holds only weak
//! references; it is a lookup aid and never keeps a record alive.
//!
//! ## Thread Safety
//!
//! The store supports concurrent access from multiple threads:
//! - Index and recency mutations are serialized by one mutex that is never
//!   held while loading
//! - Each record is loaded at most once: the first caller to move it from
//!   `Empty` to `InProgress` performs the load
//! - Callers that lose that race do not wait; they see a record that is not
//!   ready yet and fall back to coarser data
//! - A record evicted while still in use stays alive until its last holder
//!   drops it, and a later lookup revives it instead of loading it again

use crate::config::PoolConfig;
use crate::envelope::ElevationEnvelope;
use crate::heightfield::Interpolation;
use crate::key::TileKey;
use crate::loader::TileLoader;
use crate::lru::{Handle, RecencyList};
use crate::profile::{Profile, Srs};
use crate::record::{LoadClaim, TileRecord, TileStatus};
use crate::Result;
use elevpool_metrics::{metric_defs, StoreLabels};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Snapshot of store activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Lookups answered by a live record.
    pub hits: u64,
    /// Lookups that created a new record.
    pub misses: u64,
    /// Loads that produced a heightfield.
    pub loads: u64,
    /// Loads that failed.
    pub failures: u64,
    /// Records dropped off the tail of the recency list.
    pub evictions: u64,
    /// Records currently owned by the recency list.
    pub entries: usize,
    /// Current ceiling on owned records.
    pub max_entries: usize,
}

#[derive(Debug)]
struct IndexEntry {
    record: Weak<TileRecord>,
    /// Recency slot, absent once the list has let go of the record.
    slot: Option<Handle>,
}

#[derive(Debug)]
struct StoreInner {
    index: HashMap<TileKey, IndexEntry>,
    mru: RecencyList<Arc<TileRecord>>,
    max_entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

/// The shared elevation tile cache for one backing dataset.
///
/// Every [`ElevationEnvelope`] created against the same dataset should share
/// one store.
pub struct TileStore {
    name: String,
    labels: Vec<(&'static str, String)>,
    store_labels: StoreLabels,
    profile: Profile,
    loader: Arc<dyn TileLoader>,
    interpolation: Interpolation,
    max_lod: u8,
    inner: Mutex<StoreInner>,
    entry_count: AtomicUsize,
    counters: Counters,
}

impl fmt::Debug for TileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileStore")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("interpolation", &self.interpolation)
            .field("entries", &self.entry_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl TileStore {
    /// Create a store with the default configuration.
    pub fn new(profile: Profile, loader: impl TileLoader + 'static) -> Arc<Self> {
        Self::build(profile, Arc::new(loader), PoolConfig::default())
    }

    /// Create a store from a validated configuration.
    pub fn with_config(
        profile: Profile,
        loader: impl TileLoader + 'static,
        config: PoolConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Self::build(profile, Arc::new(loader), config))
    }

    fn build(profile: Profile, loader: Arc<dyn TileLoader>, config: PoolConfig) -> Arc<Self> {
        let store_labels = StoreLabels::new(config.name.clone());
        Arc::new(Self {
            labels: store_labels.to_labels(),
            store_labels,
            name: config.name,
            profile,
            loader,
            interpolation: config.interpolation,
            max_lod: config.max_lod,
            inner: Mutex::new(StoreInner {
                index: HashMap::new(),
                mru: RecencyList::new(),
                max_entries: config.max_entries.max(1),
            }),
            entry_count: AtomicUsize::new(0),
            counters: Counters::default(),
        })
    }

    /// Store name used in logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tiling profile of the backing dataset.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Sampling mode envelopes use on this store's heightfields.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Finest LOD an envelope may target.
    pub fn max_lod(&self) -> u8 {
        self.max_lod
    }

    /// Create a query envelope for points in `srs`, targeting `lod`.
    pub fn create_envelope(self: &Arc<Self>, srs: Srs, lod: u8) -> ElevationEnvelope {
        ElevationEnvelope::new(self, srs, lod)
    }

    /// Set the eviction ceiling.
    ///
    /// Takes effect on the next insertion. A ceiling of zero is raised to one.
    pub fn set_max_entries(&self, max_entries: usize) {
        let max_entries = if max_entries == 0 {
            warn!("TileStore[{}]: max_entries 0 raised to 1", self.name);
            1
        } else {
            max_entries
        };
        self.inner.lock().max_entries = max_entries;
        debug!("TileStore[{}]: max_entries set to {}", self.name, max_entries);
    }

    /// Current eviction ceiling.
    pub fn max_entries(&self) -> usize {
        self.inner.lock().max_entries
    }

    /// Look up or create the record for `key`, marking it most recently used.
    ///
    /// Never loads. Returns `None` only for keys outside the profile.
    pub fn get_tile(&self, key: &TileKey) -> Option<Arc<TileRecord>> {
        if !self.profile.is_valid_key(key) {
            return None;
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(entry) = inner.index.get_mut(key) {
            if let Some(handle) = entry.slot {
                if let Some(record) = inner.mru.get(handle).cloned() {
                    inner.mru.touch(handle);
                    drop(guard);
                    self.record_hit(key);
                    return Some(record);
                }
            }
            if let Some(record) = entry.record.upgrade() {
                // Evicted from the list but still held elsewhere: revive it.
                entry.slot = Some(inner.mru.push_front(Arc::clone(&record)));
                self.pop_lru(inner);
                drop(guard);
                trace!("TileStore[{}]: revived {}", self.name, key);
                self.record_hit(key);
                return Some(record);
            }
            inner.index.remove(key);
        }

        let record = Arc::new(TileRecord::new(*key, self.profile.tile_extent(key)));
        let slot = inner.mru.push_front(Arc::clone(&record));
        inner.index.insert(
            *key,
            IndexEntry {
                record: Arc::downgrade(&record),
                slot: Some(slot),
            },
        );
        self.pop_lru(inner);
        if inner.index.len() > 2 * inner.max_entries + 16 {
            inner
                .index
                .retain(|_, entry| entry.slot.is_some() || entry.record.strong_count() > 0);
        }
        drop(guard);

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(metric_defs::STORE_MISSES.name, &self.labels).increment(1);
        debug!("TileStore[{}]: created record {}", self.name, key);
        Some(record)
    }

    /// Look up `key` and load it if nobody has claimed the load yet.
    ///
    /// Returns the record and whether it is ready to sample. A record another
    /// caller is still loading comes back not ready; this call never waits on
    /// someone else's load. Returns `None` only for keys outside the profile.
    pub fn try_tile(&self, key: &TileKey) -> Option<(Arc<TileRecord>, bool)> {
        let record = self.get_tile(key)?;
        if record.status() == TileStatus::Empty {
            if let Some(claim) = record.try_claim() {
                self.fetch_tile_from_map(claim);
            }
        }
        let ready = record.is_available();
        Some((record, ready))
    }

    /// Run the loader for a claimed record and publish the result.
    ///
    /// Must be called with no store lock held.
    pub fn fetch_tile_from_map(&self, claim: LoadClaim<'_>) {
        let key = claim.record().key();
        let bounds = claim.record().bounds();
        let lod_labels = self.store_labels.with(&[("lod", key.lod.to_string())]);

        let start = Instant::now();
        let result = self.loader.load(&key, &bounds);
        let elapsed_us = start.elapsed().as_micros() as f64;
        metrics::histogram!(metric_defs::STORE_LOAD_TIME.name, &self.labels).record(elapsed_us);

        match result {
            Ok(heightfield) => {
                debug!(
                    "TileStore[{}]: loaded {} ({}x{}) in {:.0}us",
                    self.name,
                    key,
                    heightfield.dimensions().0,
                    heightfield.dimensions().1,
                    elapsed_us
                );
                claim.complete(heightfield);
                self.counters.loads.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(metric_defs::STORE_LOADS.name, &lod_labels).increment(1);
            }
            Err(e) => {
                warn!("TileStore[{}]: failed to load {}: {}", self.name, key, e);
                claim.fail();
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(metric_defs::STORE_LOAD_FAILURES.name, &lod_labels).increment(1);
            }
        }
    }

    /// Evict from the tail of the recency list until within the ceiling.
    ///
    /// Called with the structural lock held. A record whose only owner was
    /// the list is destroyed and its index entry removed; one still held
    /// elsewhere keeps a weak index entry so it can be revived.
    fn pop_lru(&self, inner: &mut StoreInner) {
        while inner.mru.len() > inner.max_entries {
            let Some(record) = inner.mru.pop_back() else {
                break;
            };
            let key = record.key();
            if Arc::strong_count(&record) == 1 {
                inner.index.remove(&key);
            } else if let Some(entry) = inner.index.get_mut(&key) {
                entry.slot = None;
            }
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(metric_defs::STORE_EVICTIONS.name, &self.labels).increment(1);
            debug!(
                "TileStore[{}]: evicted {} ({:?})",
                self.name,
                key,
                record.status()
            );
        }
        self.entry_count.store(inner.mru.len(), Ordering::Relaxed);
        metrics::gauge!(metric_defs::STORE_ENTRIES.name, &self.labels).set(inner.mru.len() as f64);
    }

    fn record_hit(&self, key: &TileKey) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(metric_defs::STORE_HITS.name, &self.labels).increment(1);
        trace!("TileStore[{}]: hit {}", self.name, key);
    }

    /// Whether the recency list currently owns a record for `key`.
    pub fn is_cached(&self, key: &TileKey) -> bool {
        self.inner
            .lock()
            .index
            .get(key)
            .is_some_and(|entry| entry.slot.is_some())
    }

    /// Number of records owned by the recency list.
    pub fn resident_count(&self) -> usize {
        self.inner.lock().mru.len()
    }

    /// Keys owned by the recency list, most recently used first.
    pub fn resident_keys(&self) -> Vec<TileKey> {
        self.inner.lock().mru.iter().map(|record| record.key()).collect()
    }

    /// Drop every owned record.
    ///
    /// Records still held by envelopes or in-flight loads keep their weak
    /// index entry, so a later lookup revives them instead of loading the
    /// key a second time.
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.mru.clear();
        inner.index.retain(|_, entry| {
            entry.slot = None;
            entry.record.strong_count() > 0
        });
        self.entry_count.store(0, Ordering::Relaxed);
        metrics::gauge!(metric_defs::STORE_ENTRIES.name, &self.labels).set(0.0);
        debug!("TileStore[{}]: cleared", self.name);
    }

    /// Activity counters since the store was created.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            entries: self.entry_count.load(Ordering::Relaxed),
            max_entries: self.max_entries(),
        }
    }

    pub(crate) fn labels(&self) -> &Vec<(&'static str, String)> {
        &self.labels
    }
}
