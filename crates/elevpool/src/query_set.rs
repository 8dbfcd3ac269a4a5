//! Per-envelope working set of tiles.

use crate::key::TileKey;
use crate::record::TileRecord;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tiles an envelope has pulled from the store, finest LOD first.
///
/// Holding a record here keeps it alive even after the store evicts it, so
/// an envelope never observes a tile disappearing mid-query.
#[derive(Debug, Default)]
pub struct QuerySet {
    tiles: BTreeMap<TileKey, Arc<TileRecord>>,
}

impl QuerySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tiles are tracked.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tracked record for `key`.
    pub fn get(&self, key: &TileKey) -> Option<&Arc<TileRecord>> {
        self.tiles.get(key)
    }

    /// Whether `key` is tracked.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    /// Track a record. An already tracked key keeps its existing record.
    pub fn insert(&mut self, record: Arc<TileRecord>) -> &Arc<TileRecord> {
        self.tiles.entry(record.key()).or_insert(record)
    }

    /// Tracked records from highest to lowest resolution.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TileRecord>> + '_ {
        self.tiles.values()
    }

    /// Release every tracked record.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::GeoExtent;

    fn record(lod: u8, x: u32, y: u32, extent: GeoExtent) -> Arc<TileRecord> {
        Arc::new(TileRecord::new(TileKey::new(lod, x, y), extent))
    }

    #[test]
    fn test_iterates_finest_first() {
        let mut set = QuerySet::new();
        let whole = GeoExtent::new(0.0, 0.0, 4.0, 4.0);
        set.insert(record(0, 0, 0, whole));
        set.insert(record(2, 1, 1, whole));
        set.insert(record(1, 0, 0, whole));

        let lods: Vec<_> = set.iter().map(|r| r.key().lod).collect();
        assert_eq!(lods, vec![2, 1, 0]);
    }

    #[test]
    fn test_insert_keeps_existing_record() {
        let mut set = QuerySet::new();
        let extent = GeoExtent::new(0.0, 0.0, 1.0, 1.0);
        let first = record(1, 0, 0, extent);
        set.insert(Arc::clone(&first));
        let kept = set.insert(record(1, 0, 0, extent));

        assert!(Arc::ptr_eq(kept, &first));
        assert_eq!(set.len(), 1);
    }
}
