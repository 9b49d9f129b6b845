//! Metrics engine: records daily counters and answers point and range queries.
//!
//! Every operation round-trips to the store; there is no in-process cache,
//! lock or queue. Store calls are blocking, so they run on tokio's blocking
//! pool and the calling task suspends until they finish or the configured
//! deadline elapses.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use tally_core::MetricVocabulary;
use tally_state::{ContentStore, Metadata, MetricRecord, MetricStore, StateResult};

use crate::error::{EngineError, EngineResult};

/// Tunables fixed at engine construction.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Names the recorder accepts.
    pub vocabulary: MetricVocabulary,
    /// Deadline for each store call. `None` waits indefinitely.
    pub store_timeout: Option<Duration>,
}

/// One element of a batch recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackItem {
    pub name: String,
    pub delta: i64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TrackItem {
    pub fn new(name: &str, delta: i64) -> Self {
        Self {
            name: name.to_string(),
            delta,
            metadata: Metadata::new(),
        }
    }
}

/// Result of one item in a batch, in input order.
#[derive(Debug)]
pub struct ItemOutcome {
    pub name: String,
    pub result: EngineResult<MetricRecord>,
}

/// Per-item results of [`MetricsEngine::track_metrics`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub items: Vec<ItemOutcome>,
}

impl BatchOutcome {
    /// True only when every item was recorded. An empty batch succeeds.
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|item| item.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|item| item.result.is_err())
    }
}

/// One bucket of a range query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: u64,
    pub metadata: Metadata,
}

impl From<MetricRecord> for MetricPoint {
    fn from(record: MetricRecord) -> Self {
        Self {
            date: record.metric_date,
            value: record.metric_value,
            metadata: record.metadata,
        }
    }
}

/// Recorder, reader and aggregator over a metric store and a content store.
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct MetricsEngine<S, C> {
    pub(crate) store: S,
    pub(crate) content: C,
    options: Arc<EngineOptions>,
}

impl<S: MetricStore, C: ContentStore> MetricsEngine<S, C> {
    pub fn new(store: S, content: C, options: EngineOptions) -> Self {
        Self {
            store,
            content,
            options: Arc::new(options),
        }
    }

    /// The current UTC calendar day: the bucket every recording lands in.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Run a blocking store call under the configured deadline.
    ///
    /// Join failures and elapsed deadlines surface as `StoreUnavailable`,
    /// the same as store errors. A call that times out may still complete
    /// in the background.
    pub(crate) async fn blocking<T, F>(&self, op: &'static str, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> StateResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        let joined = match self.options.store_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                EngineError::StoreUnavailable(format!("{op} timed out after {limit:?}"))
            })?,
            None => task.await,
        };
        let result = joined
            .map_err(|e| EngineError::StoreUnavailable(format!("{op} task failed: {e}")))?;
        Ok(result?)
    }

    // ── Recorder ───────────────────────────────────────────────────

    /// Add `delta` to today's bucket for `name`, returning the updated bucket.
    pub async fn record(
        &self,
        name: &str,
        delta: i64,
        metadata: Metadata,
    ) -> EngineResult<MetricRecord> {
        if !self.options.vocabulary.contains(name) {
            return Err(EngineError::UnknownMetric(name.to_string()));
        }
        let delta = u64::try_from(delta).map_err(|_| EngineError::NegativeDelta(delta))?;
        let date = Self::today();

        let store = self.store.clone();
        let owned = name.to_string();
        self.blocking("increment", move || {
            store.increment(&owned, date, delta, &metadata)
        })
        .await
    }

    /// Best-effort recording: never fails the caller, reports `false` and
    /// logs when the event was dropped.
    pub async fn track_metric(&self, name: &str, delta: i64, metadata: Option<Metadata>) -> bool {
        match self.record(name, delta, metadata.unwrap_or_default()).await {
            Ok(record) => {
                debug!(metric = %name, delta, value = record.metric_value, "metric tracked");
                true
            }
            Err(e) => {
                log_dropped(name, &e);
                false
            }
        }
    }

    /// Record every item concurrently. Items are independent: one failure
    /// does not stop the others.
    pub async fn track_metrics(&self, items: Vec<TrackItem>) -> BatchOutcome {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let engine = self.clone();
                let name = item.name.clone();
                let handle = tokio::spawn(async move {
                    engine.record(&item.name, item.delta, item.metadata).await
                });
                (name, handle)
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        for (name, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| {
                Err(EngineError::StoreUnavailable(format!("record task failed: {e}")))
            });
            if let Err(ref e) = result {
                log_dropped(&name, e);
            }
            outcome.items.push(ItemOutcome { name, result });
        }
        debug!(
            items = outcome.items.len(),
            failed = outcome.failed().count(),
            "metric batch tracked"
        );
        outcome
    }

    // ── Reader ─────────────────────────────────────────────────────

    /// The bucket for `name` on `date` (today when `None`), if one exists.
    pub async fn try_get_metric(
        &self,
        name: &str,
        date: Option<NaiveDate>,
    ) -> EngineResult<Option<MetricRecord>> {
        let date = date.unwrap_or_else(Self::today);
        let store = self.store.clone();
        let owned = name.to_string();
        self.blocking("get", move || store.get(&owned, date)).await
    }

    /// Stored value, or `None` when the bucket is absent or the store failed.
    /// A bucket incremented only by zero reads as `Some(0)`.
    pub async fn get_metric(&self, name: &str, date: Option<NaiveDate>) -> Option<u64> {
        match self.try_get_metric(name, date).await {
            Ok(record) => record.map(|r| r.metric_value),
            Err(e) => {
                error!(metric = %name, error = %e, "metric read failed");
                None
            }
        }
    }

    /// Buckets of `name` with `start <= date <= end`, ascending, without
    /// zero-filling missing days.
    pub async fn try_get_metric_range(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<MetricPoint>> {
        let store = self.store.clone();
        let owned = name.to_string();
        let records = self
            .blocking("range", move || store.range(&owned, start, end))
            .await?;
        Ok(records.into_iter().map(MetricPoint::from).collect())
    }

    /// Like [`try_get_metric_range`](Self::try_get_metric_range), with store
    /// failures reported as an empty series.
    pub async fn get_metric_range(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<MetricPoint> {
        match self.try_get_metric_range(name, start, end).await {
            Ok(points) => points,
            Err(e) => {
                error!(metric = %name, %start, %end, error = %e, "metric range read failed");
                Vec::new()
            }
        }
    }
}

fn log_dropped(name: &str, e: &EngineError) {
    if e.is_validation() {
        warn!(metric = %name, error = %e, "metric rejected");
    } else {
        error!(metric = %name, error = %e, "metric dropped");
    }
}
