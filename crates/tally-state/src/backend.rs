//! Storage traits the metrics engine is written against.
//!
//! Both traits are synchronous, matching redb. Callers on an async runtime
//! are expected to move calls onto a blocking thread.

use chrono::NaiveDate;

use crate::error::StateResult;
use crate::types::{ArticleStatus, Metadata, MetricRecord};

/// Persisted metric buckets keyed by (metric name, date).
pub trait MetricStore: Clone + Send + Sync + 'static {
    /// Atomically add `delta` to the bucket, creating it with
    /// `metric_value = delta` when absent, and shallow-merge `metadata`.
    ///
    /// Implementations must apply the whole read-modify-write as one
    /// store-side operation: concurrent increments of one bucket must
    /// never lose a contribution.
    fn increment(
        &self,
        name: &str,
        date: NaiveDate,
        delta: u64,
        metadata: &Metadata,
    ) -> StateResult<MetricRecord>;

    fn get(&self, name: &str, date: NaiveDate) -> StateResult<Option<MetricRecord>>;

    /// Buckets of `name` with `start <= date <= end`, ascending by date.
    fn range(&self, name: &str, start: NaiveDate, end: NaiveDate)
    -> StateResult<Vec<MetricRecord>>;

    /// Every bucket recorded for `date`, ordered by metric name.
    fn list_for_date(&self, date: NaiveDate) -> StateResult<Vec<MetricRecord>>;
}

/// Point-in-time counts from the content and identity store.
pub trait ContentStore: Clone + Send + Sync + 'static {
    fn count_articles_with_status(&self, status: ArticleStatus) -> StateResult<u64>;

    /// Articles in `status` whose moderation timestamp falls on a UTC day in
    /// `[start, end]`.
    fn count_moderated_between(
        &self,
        status: ArticleStatus,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StateResult<u64>;

    fn count_users(&self) -> StateResult<u64>;
}
