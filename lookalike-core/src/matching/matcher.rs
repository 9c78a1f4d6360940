//! Whole-image matching with bounded parallelism.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{classify, similarity, MatchOutcome, MatchResult, Tier};
use crate::catalog::CatalogEntry;
use crate::config::MatchConfig;
use crate::error::Result;
use crate::fingerprint::{hamming_distance, ImageHash};

/// Counts comparison tasks while they execute.
///
/// `peak` is the highest number of tasks observed running at the same time.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst);
        GaugeGuard(Arc::clone(self))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Total comparison tasks that began executing.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

struct GaugeGuard(Arc<ConcurrencyGauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared between the dispatcher and its comparison tasks.
struct Shared {
    query: ImageHash,
    snapshot: Arc<[CatalogEntry]>,
    threshold: f64,
    /// First exact match observed; later ones are ignored
    exact: OnceLock<MatchResult>,
    similar: Mutex<Vec<MatchResult>>,
}

/// Compares a query hash against a catalog snapshot.
///
/// At most `concurrency_limit` comparisons run at once. As soon as an exact
/// match is recorded no further comparisons are dispatched and the call
/// returns; comparisons already running finish in the background without
/// affecting the result.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    threshold: f64,
    concurrency_limit: usize,
}

impl Matcher {
    pub fn new(config: &MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            threshold: config.similar_threshold,
            concurrency_limit: config.concurrency_limit,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub async fn find_matches(
        &self,
        query: &ImageHash,
        snapshot: Arc<[CatalogEntry]>,
    ) -> MatchOutcome {
        let gauge = Arc::new(ConcurrencyGauge::new());
        let outcome = self.find_matches_instrumented(query, snapshot, &gauge).await;
        debug!(
            started = gauge.started(),
            peak_concurrency = gauge.peak(),
            tier = %outcome.tier(),
            "Whole-image matching finished"
        );
        outcome
    }

    /// Same as [`Matcher::find_matches`], recording task activity in `gauge`.
    pub async fn find_matches_instrumented(
        &self,
        query: &ImageHash,
        snapshot: Arc<[CatalogEntry]>,
        gauge: &Arc<ConcurrencyGauge>,
    ) -> MatchOutcome {
        if snapshot.is_empty() {
            return MatchOutcome::None;
        }

        let total = snapshot.len();
        let shared = Arc::new(Shared {
            query: query.clone(),
            snapshot,
            threshold: self.threshold,
            exact: OnceLock::new(),
            similar: Mutex::new(Vec::new()),
        });
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();

        for index in 0..total {
            if shared.exact.get().is_some() {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            // A running task may have found the exact match while we waited
            if shared.exact.get().is_some() {
                break;
            }

            let shared = Arc::clone(&shared);
            let gauge = Arc::clone(gauge);
            tasks.spawn(async move {
                let _permit = permit;
                let _running = gauge.enter();
                compare_entry(&shared, index).await;
            });
        }

        loop {
            if let Some(result) = shared.exact.get() {
                tasks.detach_all();
                return MatchOutcome::Exact(result.clone());
            }
            match tasks.join_next().await {
                Some(Ok(())) => {}
                Some(Err(e)) => warn!(error = %e, "Comparison task failed"),
                None => break,
            }
        }

        let mut similar = std::mem::take(&mut *shared.similar.lock().await);
        if similar.is_empty() {
            return MatchOutcome::None;
        }
        similar.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.locator.cmp(&b.locator))
        });
        MatchOutcome::Similar(similar)
    }
}

async fn compare_entry(shared: &Shared, index: usize) {
    let entry = &shared.snapshot[index];

    let distance = match hamming_distance(&shared.query, &entry.hash) {
        Ok(distance) => distance,
        Err(e) => {
            warn!(
                entry_id = %entry.id,
                locator = %entry.locator,
                error = %e,
                "Skipping catalog entry with incompatible hash"
            );
            return;
        }
    };

    let len = shared.query.len();
    match classify(distance, len, shared.threshold) {
        Tier::Exact => {
            if shared.exact.set(MatchResult::exact(&entry.locator)).is_ok() {
                debug!(locator = %entry.locator, "Exact match found");
            }
        }
        Tier::Similar => {
            let result = MatchResult::similar(&entry.locator, similarity(distance, len));
            shared.similar.lock().await.push(result);
        }
        Tier::Partial | Tier::None => {}
    }
}
