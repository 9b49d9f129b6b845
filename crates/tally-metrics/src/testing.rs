//! Store doubles for engine tests.

use std::time::Duration;

use chrono::NaiveDate;
use tally_state::*;

/// Wraps an in-memory `StateStore` and injects failures or latency.
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: StateStore,
    /// Increments of this metric fail.
    pub fail_metric: Option<&'static str>,
    /// Every call fails.
    pub offline: bool,
    /// Every call sleeps this long first.
    pub latency: Option<Duration>,
}

impl FlakyStore {
    pub fn healthy() -> Self {
        Self {
            inner: StateStore::open_in_memory().unwrap(),
            fail_metric: None,
            offline: false,
            latency: None,
        }
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::healthy()
        }
    }

    pub fn failing_metric(name: &'static str) -> Self {
        Self {
            fail_metric: Some(name),
            ..Self::healthy()
        }
    }

    pub fn slow(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::healthy()
        }
    }

    fn check(&self) -> StateResult<()> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if self.offline {
            return Err(StateError::Transaction("store offline".to_string()));
        }
        Ok(())
    }
}

impl MetricStore for FlakyStore {
    fn increment(
        &self,
        name: &str,
        date: NaiveDate,
        delta: u64,
        metadata: &Metadata,
    ) -> StateResult<MetricRecord> {
        self.check()?;
        if self.fail_metric == Some(name) {
            return Err(StateError::Write(format!("injected failure for {name}")));
        }
        self.inner.increment(name, date, delta, metadata)
    }

    fn get(&self, name: &str, date: NaiveDate) -> StateResult<Option<MetricRecord>> {
        self.check()?;
        self.inner.get(name, date)
    }

    fn range(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StateResult<Vec<MetricRecord>> {
        self.check()?;
        self.inner.range(name, start, end)
    }

    fn list_for_date(&self, date: NaiveDate) -> StateResult<Vec<MetricRecord>> {
        self.check()?;
        self.inner.list_for_date(date)
    }
}

impl ContentStore for FlakyStore {
    fn count_articles_with_status(&self, status: ArticleStatus) -> StateResult<u64> {
        self.check()?;
        self.inner.count_articles_with_status(status)
    }

    fn count_moderated_between(
        &self,
        status: ArticleStatus,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StateResult<u64> {
        self.check()?;
        self.inner.count_moderated_between(status, start, end)
    }

    fn count_users(&self) -> StateResult<u64> {
        self.check()?;
        self.inner.count_users()
    }
}
