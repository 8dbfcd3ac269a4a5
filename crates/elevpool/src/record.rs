//! Cached tiles and their load state machine.
//!
//! ```text
//! Empty ──CAS──> InProgress ──> Available
//!                           └─> Failed
//! ```
//!
//! Only the `Empty -> InProgress` edge is contended. The thread that wins that
//! compare-and-swap is the only writer of the record's payload and final
//! status, so the remaining transitions are plain release stores.

use crate::heightfield::HeightField;
use crate::key::TileKey;
use crate::profile::GeoExtent;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::SystemTime;

/// Load status of a tile record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TileStatus {
    /// Created, nobody has claimed the load yet.
    Empty = 0,
    /// A loader has claimed the record and is fetching it.
    InProgress = 1,
    /// The heightfield is present.
    Available = 2,
    /// The backing dataset could not produce the tile.
    Failed = 3,
}

impl TileStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TileStatus::Empty,
            1 => TileStatus::InProgress,
            2 => TileStatus::Available,
            _ => TileStatus::Failed,
        }
    }

    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, TileStatus::Available | TileStatus::Failed)
    }
}

/// Atomic holder of a [`TileStatus`].
#[derive(Debug)]
pub struct TileState(AtomicU8);

impl TileState {
    fn new() -> Self {
        Self(AtomicU8::new(TileStatus::Empty as u8))
    }

    /// Current status.
    pub fn get(&self) -> TileStatus {
        TileStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `Empty -> InProgress`. Exactly one caller ever gets `true`.
    fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(
                TileStatus::Empty as u8,
                TileStatus::InProgress as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn finish(&self, status: TileStatus) {
        debug_assert!(status.is_terminal());
        debug_assert_eq!(self.get(), TileStatus::InProgress);
        self.0.store(status as u8, Ordering::Release);
    }
}

/// One cached tile: its key, extent, payload and load status.
///
/// The key and extent never change. The payload is written at most once, by
/// the thread holding the [`LoadClaim`], before the status is published as
/// `Available`.
#[derive(Debug)]
pub struct TileRecord {
    key: TileKey,
    bounds: GeoExtent,
    state: TileState,
    heightfield: OnceLock<HeightField>,
    loaded_at: OnceLock<SystemTime>,
}

impl TileRecord {
    /// Create an `Empty` record.
    pub fn new(key: TileKey, bounds: GeoExtent) -> Self {
        Self {
            key,
            bounds,
            state: TileState::new(),
            heightfield: OnceLock::new(),
            loaded_at: OnceLock::new(),
        }
    }

    /// Tile key.
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Native extent of the tile.
    pub fn bounds(&self) -> GeoExtent {
        self.bounds
    }

    /// Current load status.
    pub fn status(&self) -> TileStatus {
        self.state.get()
    }

    /// Whether the heightfield is ready to sample.
    pub fn is_available(&self) -> bool {
        self.status() == TileStatus::Available
    }

    /// The heightfield, once the record is `Available`.
    pub fn heightfield(&self) -> Option<&HeightField> {
        if self.is_available() {
            self.heightfield.get()
        } else {
            None
        }
    }

    /// When the load completed successfully.
    pub fn load_timestamp(&self) -> Option<SystemTime> {
        self.loaded_at.get().copied()
    }

    /// Claim the right to load this record.
    ///
    /// Returns `None` if another caller already claimed it or the record has
    /// reached a terminal status.
    pub fn try_claim(&self) -> Option<LoadClaim<'_>> {
        self.state.try_claim().then_some(LoadClaim {
            record: self,
            finished: false,
        })
    }
}

/// Exclusive right to complete a record's load.
///
/// Dropping a claim without calling [`LoadClaim::complete`] or
/// [`LoadClaim::fail`] marks the record `Failed`, so a panicking loader never
/// leaves a record stuck in `InProgress`.
#[derive(Debug)]
pub struct LoadClaim<'a> {
    record: &'a TileRecord,
    finished: bool,
}

impl LoadClaim<'_> {
    /// The record being loaded.
    pub fn record(&self) -> &TileRecord {
        self.record
    }

    /// Publish the heightfield and mark the record `Available`.
    pub fn complete(mut self, heightfield: HeightField) {
        // The claim is the only writer, so both cells are still empty.
        let stored = self.record.heightfield.set(heightfield);
        debug_assert!(stored.is_ok());
        let stamped = self.record.loaded_at.set(SystemTime::now());
        debug_assert!(stamped.is_ok());
        self.record.state.finish(TileStatus::Available);
        self.finished = true;
    }

    /// Mark the record `Failed`.
    pub fn fail(mut self) {
        self.record.state.finish(TileStatus::Failed);
        self.finished = true;
    }
}

impl Drop for LoadClaim<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.record.state.finish(TileStatus::Failed);
        }
    }
}
