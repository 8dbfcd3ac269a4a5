//! Metrics infrastructure for the elevpool tile cache.
//!
//! This crate declares every metric the tile store and its envelopes emit as
//! structured [`Metric`] constants, and re-exports the `metrics` crate so
//! callers do not need a separate dependency to install a recorder.
//!
//! # Example
//!
//! ```rust,ignore
//! use elevpool_metrics::{describe_metrics, metric_defs, StoreLabels};
//!
//! // Initialize metrics descriptions at startup
//! describe_metrics();
//!
//! let labels = StoreLabels::new("terrain");
//! metrics::counter!(metric_defs::STORE_HITS.name, &labels.to_labels()).increment(1);
//! ```
//!
//! # Metric Type
//!
//! ```rust
//! use elevpool_metrics::{Metric, MetricKind};
//! use metrics::Unit;
//!
//! const MY_COUNTER: Metric = Metric::counter("my.counter")
//!     .with_description("A counter metric")
//!     .with_unit(Unit::Count)
//!     .with_labels(&["store"]);
//!
//! assert_eq!(MY_COUNTER.kind, MetricKind::Counter);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// Use the const constructors to declare metrics at compile time.
///
/// ```rust
/// use elevpool_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const LOADS: Metric = Metric::counter("elevpool.store.loads")
///     .with_description("Tile loads")
///     .with_unit(Unit::Count);
///
/// assert_eq!(LOADS.name, "elevpool.store.loads");
/// assert_eq!(LOADS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "elevpool.store.hits").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    ///
    /// Call once at startup, after the recorder is installed.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the tile store and its envelopes.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every store-scoped metric.
    pub const STORE_LABELS: &[&str] = &["store"];

    // ========================================================================
    // Tile Store Metrics
    // ========================================================================

    /// Lookups answered by a record already resident in the store.
    pub const STORE_HITS: Metric = Metric::counter("elevpool.store.hits")
        .with_description("Tile lookups answered by a resident record")
        .with_unit(Unit::Count)
        .with_labels(STORE_LABELS);

    /// Lookups that had to create a new record.
    pub const STORE_MISSES: Metric = Metric::counter("elevpool.store.misses")
        .with_description("Tile lookups that created a new record")
        .with_unit(Unit::Count)
        .with_labels(STORE_LABELS);

    /// Loads performed against the backing dataset.
    ///
    /// Labels: store, lod
    pub const STORE_LOADS: Metric = Metric::counter("elevpool.store.loads")
        .with_description("Tile loads performed against the backing dataset")
        .with_unit(Unit::Count)
        .with_labels(&["store", "lod"]);

    /// Loads that ended in the `Failed` status.
    ///
    /// Labels: store, lod
    pub const STORE_LOAD_FAILURES: Metric = Metric::counter("elevpool.store.load_failures")
        .with_description("Tile loads that failed")
        .with_unit(Unit::Count)
        .with_labels(&["store", "lod"]);

    /// Owning references dropped off the tail of the recency list.
    pub const STORE_EVICTIONS: Metric = Metric::counter("elevpool.store.evictions")
        .with_description("Records evicted from the recency list")
        .with_unit(Unit::Count)
        .with_labels(STORE_LABELS);

    /// Records currently owned by the recency list.
    pub const STORE_ENTRIES: Metric = Metric::gauge("elevpool.store.entries")
        .with_description("Records currently owned by the recency list")
        .with_unit(Unit::Count)
        .with_labels(STORE_LABELS);

    /// Wall time spent in the tile loader.
    pub const STORE_LOAD_TIME: Metric = Metric::histogram("elevpool.store.load_time_us")
        .with_description("Time spent loading one tile in microseconds")
        .with_unit(Unit::Microseconds)
        .with_labels(STORE_LABELS);

    // ========================================================================
    // Envelope Metrics
    // ========================================================================

    /// Samples answered by an ancestor instead of the target-LOD tile.
    pub const ENVELOPE_FALLBACKS: Metric = Metric::counter("elevpool.envelope.fallbacks")
        .with_description("Samples answered by a coarser ancestor tile")
        .with_unit(Unit::Count)
        .with_labels(STORE_LABELS);

    /// Samples that exhausted the ancestor chain.
    pub const ENVELOPE_NO_DATA: Metric = Metric::counter("elevpool.envelope.no_data")
        .with_description("Samples that found no data in the ancestor chain")
        .with_unit(Unit::Count)
        .with_labels(STORE_LABELS);

    /// All metric definitions, for iteration.
    pub const ALL: &[&Metric] = &[
        &STORE_HITS,
        &STORE_MISSES,
        &STORE_LOADS,
        &STORE_LOAD_FAILURES,
        &STORE_EVICTIONS,
        &STORE_ENTRIES,
        &STORE_LOAD_TIME,
        &ENVELOPE_FALLBACKS,
        &ENVELOPE_NO_DATA,
    ];
}

/// Labels identifying which store a metric belongs to.
///
/// ```rust
/// use elevpool_metrics::StoreLabels;
///
/// let labels = StoreLabels::new("terrain");
/// let extended = labels.with(&[("lod", "12".to_string())]);
/// assert_eq!(extended.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct StoreLabels {
    /// Store name, usually the backing dataset's name.
    pub store: String,
}

impl StoreLabels {
    /// Creates labels for the named store.
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("store", self.store.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics emitted by the tile cache.
///
/// Call once at startup after installing a recorder so exporters can show
/// units and descriptions.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
