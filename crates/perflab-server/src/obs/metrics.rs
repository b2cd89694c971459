//! Process-wide metrics registry.
//!
//! Families are keyed by metric name; each family keys its children by a
//! sorted label set, so `(name, labels)` always resolves to the same
//! collector. Children are created lazily and never removed.
//!
//! Counters are plain atomics. A histogram keeps its buckets, sum and count
//! behind one short `parking_lot::Mutex`, so an observation is applied as a
//! unit and a snapshot never sees a bucket ahead of its count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Label pairs sorted by key.
pub type LabelSet = Vec<(String, String)>;

/// Latency buckets in seconds.
pub const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn label_set(labels: &[(&str, &str)]) -> LabelSet {
    let mut key: LabelSet = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

#[derive(Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.add(1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, v: u64) {
        self.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Point-in-time histogram values. `cumulative[i]` counts observations
/// `<=` the i-th bucket bound; the implicit `+Inf` bucket equals `count`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    pub cumulative: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

struct HistogramState {
    cumulative: Vec<u64>,
    sum: f64,
    count: u64,
}

pub struct Histogram {
    bounds: Arc<[f64]>,
    state: Mutex<HistogramState>,
}

impl Histogram {
    fn new(bounds: Arc<[f64]>) -> Self {
        let state = HistogramState {
            cumulative: vec![0; bounds.len()],
            sum: 0.0,
            count: 0,
        };
        Self {
            bounds,
            state: Mutex::new(state),
        }
    }

    /// Record one observation. Negative and NaN values are recorded as 0.
    pub fn observe(&self, value: f64) {
        let value = value.max(0.0);
        let mut st = self.state.lock();
        for (slot, &le) in st.cumulative.iter_mut().zip(self.bounds.iter()) {
            if value <= le {
                *slot += 1;
            }
        }
        st.sum += value;
        st.count += 1;
    }

    pub fn sample(&self) -> HistogramSample {
        let st = self.state.lock();
        HistogramSample {
            cumulative: st.cumulative.clone(),
            sum: st.sum,
            count: st.count,
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }
}

pub struct CounterVec {
    help: String,
    map: DashMap<LabelSet, Arc<Counter>>,
}

impl CounterVec {
    fn new(help: &str) -> Self {
        Self {
            help: help.to_string(),
            map: DashMap::new(),
        }
    }

    /// Child for the given labels, created on first use.
    pub fn with_labels(&self, labels: &[(&str, &str)]) -> Arc<Counter> {
        let key = label_set(labels);
        if let Some(c) = self.map.get(&key) {
            return Arc::clone(c.value());
        }
        Arc::clone(self.map.entry(key).or_default().value())
    }

    fn collect(&self) -> Vec<(LabelSet, u64)> {
        let mut out: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().get()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

pub struct HistogramVec {
    help: String,
    bounds: Arc<[f64]>,
    map: DashMap<LabelSet, Arc<Histogram>>,
}

impl HistogramVec {
    fn new(help: &str, buckets: &[f64]) -> Self {
        Self {
            help: help.to_string(),
            bounds: normalize_buckets(buckets),
            map: DashMap::new(),
        }
    }

    /// Child for the given labels, created on first use.
    pub fn with_labels(&self, labels: &[(&str, &str)]) -> Arc<Histogram> {
        let key = label_set(labels);
        if let Some(h) = self.map.get(&key) {
            return Arc::clone(h.value());
        }
        let bounds = Arc::clone(&self.bounds);
        Arc::clone(
            self.map
                .entry(key)
                .or_insert_with(|| Arc::new(Histogram::new(bounds)))
                .value(),
        )
    }

    fn collect(&self) -> Vec<(LabelSet, HistogramSample)> {
        // Clone the handles first so no shard lock is held while sampling.
        let children: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        let mut out: Vec<_> = children
            .into_iter()
            .map(|(k, h)| (k, h.sample()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// Finite, strictly ascending bounds. `+Inf` is implicit.
fn normalize_buckets(buckets: &[f64]) -> Arc<[f64]> {
    let mut b: Vec<f64> = buckets.iter().copied().filter(|v| v.is_finite()).collect();
    b.sort_by(f64::total_cmp);
    b.dedup();
    if b.len() != buckets.len() {
        tracing::warn!(
            given = buckets.len(),
            kept = b.len(),
            "histogram buckets normalized (non-finite or duplicate bounds dropped)"
        );
    }
    b.into()
}

#[derive(Clone)]
enum Family {
    Counter(Arc<CounterVec>),
    Histogram(Arc<HistogramVec>),
}

/// Named counter and histogram families.
///
/// Lookups never fail. Asking for a name with the wrong kind (a counter
/// under a histogram's name, say) logs a warning and hands back a detached
/// collector that is never exported.
#[derive(Default)]
pub struct MetricsRegistry {
    families: DashMap<String, Family>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or fetch) a counter family.
    pub fn register_counter(&self, name: &str, help: &str) -> Arc<CounterVec> {
        let family = self
            .families
            .entry(name.to_string())
            .or_insert_with(|| Family::Counter(Arc::new(CounterVec::new(help))))
            .clone();
        match family {
            Family::Counter(v) => v,
            Family::Histogram(_) => {
                tracing::warn!(metric = %name, "counter requested under a histogram name");
                Arc::new(CounterVec::new(help))
            }
        }
    }

    /// Register (or fetch) a histogram family. Buckets are fixed by the
    /// first registration.
    pub fn register_histogram(&self, name: &str, help: &str, buckets: &[f64]) -> Arc<HistogramVec> {
        let family = self
            .families
            .entry(name.to_string())
            .or_insert_with(|| Family::Histogram(Arc::new(HistogramVec::new(help, buckets))))
            .clone();
        match family {
            Family::Histogram(v) => v,
            Family::Counter(_) => {
                tracing::warn!(metric = %name, "histogram requested under a counter name");
                Arc::new(HistogramVec::new(help, buckets))
            }
        }
    }

    /// Counter for `(name, labels)`; unregistered names get an empty help text.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Counter> {
        self.register_counter(name, "").with_labels(labels)
    }

    /// Histogram for `(name, labels)`; unregistered names use [`LATENCY_BUCKETS`].
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Histogram> {
        self.register_histogram(name, "", &LATENCY_BUCKETS)
            .with_labels(labels)
    }

    /// Read-only view of every family, sorted by name then labels.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let families: Vec<(String, Family)> = self
            .families
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let mut out: Vec<FamilySnapshot> = families
            .into_iter()
            .map(|(name, family)| match family {
                Family::Counter(v) => FamilySnapshot {
                    name,
                    help: v.help.clone(),
                    samples: FamilySamples::Counter(v.collect()),
                },
                Family::Histogram(v) => FamilySnapshot {
                    name,
                    help: v.help.clone(),
                    samples: FamilySamples::Histogram {
                        bounds: Arc::clone(&v.bounds),
                        series: v.collect(),
                    },
                },
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        RegistrySnapshot { families: out }
    }
}

#[derive(Debug, Clone)]
pub enum FamilySamples {
    Counter(Vec<(LabelSet, u64)>),
    Histogram {
        bounds: Arc<[f64]>,
        series: Vec<(LabelSet, HistogramSample)>,
    },
}

#[derive(Debug, Clone)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub samples: FamilySamples,
}

/// Point-in-time registry contents, ready for rendering.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub families: Vec<FamilySnapshot>,
}

impl RegistrySnapshot {
    fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.name == name)
    }

    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let key = label_set(labels);
        match &self.family(name)?.samples {
            FamilySamples::Counter(series) => {
                series.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
            }
            FamilySamples::Histogram { .. } => None,
        }
    }

    pub fn histogram_sample(&self, name: &str, labels: &[(&str, &str)]) -> Option<&HistogramSample> {
        let key = label_set(labels);
        match &self.family(name)?.samples {
            FamilySamples::Histogram { series, .. } => {
                series.iter().find(|(k, _)| *k == key).map(|(_, s)| s)
            }
            FamilySamples::Counter(_) => None,
        }
    }
}
