use crate::measurement::LatencyDigest;
use arc_swap::ArcSwap;
use metrics_util::AtomicBucket;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use swarm_core::RequestStatistics;

/// Shared sink for everything the simulated users of one swarm record.
///
/// Recording only touches atomics. Latencies land in lock-free buckets and are folded into the
/// per-entry histogram whenever [`flush`](Self::flush) or [`snapshot`](Self::snapshot) runs.
#[derive(Default)]
pub(crate) struct StatsCollector {
    entries: ArcSwap<HashMap<EntryKey, Arc<EntryAtomics>>>,
    tasks: ArcSwap<HashMap<String, Arc<AtomicU64>>>,
    requests: AtomicU64,
    failures: AtomicU64,
}

// Field order gives the report its sort order: by name, then method.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct EntryKey {
    name: String,
    method: String,
}

struct EntryAtomics {
    success: AtomicU64,
    failure: AtomicU64,
    latency_sum: AtomicU64,
    latency_min: AtomicU64,
    latency_max: AtomicU64,
    latency: AtomicBucket<Duration>,
    digest: Mutex<LatencyDigest>,
}

impl Default for EntryAtomics {
    fn default() -> Self {
        Self {
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            latency_sum: AtomicU64::new(0),
            latency_min: AtomicU64::new(u64::MAX),
            latency_max: AtomicU64::new(0),
            latency: AtomicBucket::new(),
            digest: Mutex::new(LatencyDigest::new()),
        }
    }
}

impl EntryAtomics {
    fn flush(&self) {
        let mut digest = self.digest.lock().unwrap_or_else(PoisonError::into_inner);
        self.latency.clear_with(|dur| digest.populate(dur));
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, method: &str, name: &str, elapsed: Duration, success: bool) {
        let key = EntryKey {
            name: name.to_string(),
            method: method.to_string(),
        };
        let entry = get_or_insert(&self.entries, &key);

        self.requests.fetch_add(1, Ordering::Relaxed);
        if success {
            entry.success.fetch_add(1, Ordering::Relaxed);
        } else {
            entry.failure.fetch_add(1, Ordering::Relaxed);
            self.failures.fetch_add(1, Ordering::Relaxed);
        }

        let nanos = elapsed.as_nanos() as u64;
        entry.latency_sum.fetch_add(nanos, Ordering::Relaxed);
        entry.latency_min.fetch_min(nanos, Ordering::Relaxed);
        entry.latency_max.fetch_max(nanos, Ordering::Relaxed);
        entry.latency.push(elapsed);
    }

    pub fn record_task(&self, name: &str) {
        get_or_insert(&self.tasks, &name.to_string()).fetch_add(1, Ordering::Relaxed);
    }

    /// `(requests, failures)` recorded so far.
    pub fn totals(&self) -> (u64, u64) {
        (
            self.requests.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
        )
    }

    /// Fold pending latencies into the digests so the buckets stay small on long runs.
    pub fn flush(&self) {
        for entry in self.entries.load().values() {
            entry.flush();
        }
    }

    pub fn snapshot(&self) -> Vec<RequestStatistics> {
        let entries = self.entries.load();
        let mut keys: Vec<_> = entries.keys().collect();
        keys.sort();

        keys.into_iter()
            .map(|key| {
                let entry = &entries[key];
                entry.flush();

                let success = entry.success.load(Ordering::Relaxed);
                let failure = entry.failure.load(Ordering::Relaxed);
                let num_requests = success + failure;
                let sum = entry.latency_sum.load(Ordering::Relaxed);
                let min = entry.latency_min.load(Ordering::Relaxed);
                let max = entry.latency_max.load(Ordering::Relaxed);
                let digest = entry.digest.lock().unwrap_or_else(PoisonError::into_inner);

                RequestStatistics {
                    method: key.method.clone(),
                    name: key.name.clone(),
                    num_requests,
                    num_failures: failure,
                    avg_latency: Duration::from_nanos(sum.checked_div(num_requests).unwrap_or(0)),
                    min_latency: Duration::from_nanos(if num_requests == 0 { 0 } else { min }),
                    max_latency: Duration::from_nanos(max),
                    latency_p50: digest.latency(0.5),
                    latency_p90: digest.latency(0.9),
                    latency_p99: digest.latency(0.99),
                }
            })
            .collect()
    }

    pub fn task_counts(&self) -> BTreeMap<String, u64> {
        self.tasks
            .load()
            .iter()
            .map(|(name, count)| (name.clone(), count.load(Ordering::Relaxed)))
            .collect()
    }
}

fn get_or_insert<K, V>(map: &ArcSwap<HashMap<K, Arc<V>>>, key: &K) -> Arc<V>
where
    K: Hash + Eq + Clone,
    V: Default,
{
    if let Some(value) = map.load().get(key) {
        return value.clone();
    }

    let mut inserted = None;
    map.rcu(|current| {
        let mut next = HashMap::clone(current);
        inserted = Some(next.entry(key.clone()).or_default().clone());
        next
    });
    // rcu runs the closure at least once
    inserted.unwrap_or_default()
}
