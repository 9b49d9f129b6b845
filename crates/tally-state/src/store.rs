//! StateStore: redb-backed persistence for Tally.
//!
//! Holds the metric buckets plus the article and user tables the engine
//! counts. All values are JSON-serialized into redb's `&[u8]` value
//! columns. The store supports both on-disk and in-memory backends (the
//! latter for testing).
//!
//! redb admits a single write transaction at a time, so a metric increment
//! that reads, adds and writes inside one write transaction is atomic with
//! respect to every other increment.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::debug;

use crate::backend::{ContentStore, MetricStore};
use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(METRICS).map_err(map_err!(Table))?;
        txn.open_table(METRICS_BY_DATE).map_err(map_err!(Table))?;
        txn.open_table(ARTICLES).map_err(map_err!(Table))?;
        txn.open_table(ARTICLES_BY_STATUS).map_err(map_err!(Table))?;
        txn.open_table(ARTICLES_BY_MODERATION).map_err(map_err!(Table))?;
        txn.open_table(USERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Articles ───────────────────────────────────────────────────

    /// Insert or update an article, keeping the status and moderation
    /// indexes in step within the same write transaction.
    pub fn put_article(&self, article: &ArticleRecord) -> StateResult<()> {
        let value = serde_json::to_vec(article).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ARTICLES).map_err(map_err!(Table))?;
            let mut by_status = txn.open_table(ARTICLES_BY_STATUS).map_err(map_err!(Table))?;
            let mut by_moderation = txn
                .open_table(ARTICLES_BY_MODERATION)
                .map_err(map_err!(Table))?;

            let previous = table
                .insert(article.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            if let Some(guard) = previous {
                let old: ArticleRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                by_status
                    .remove(old.status_index_key().as_str())
                    .map_err(map_err!(Write))?;
                if let Some(key) = old.moderation_index_key() {
                    by_moderation.remove(key.as_str()).map_err(map_err!(Write))?;
                }
            }

            by_status
                .insert(article.status_index_key().as_str(), ())
                .map_err(map_err!(Write))?;
            if let Some(key) = article.moderation_index_key() {
                by_moderation
                    .insert(key.as_str(), ())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %article.id, status = ?article.status, "article stored");
        Ok(())
    }

    /// Count index entries in `[lo, hi)` without touching the article rows.
    fn count_index_range(
        &self,
        definition: TableDefinition<'static, &'static str, ()>,
        lo: &str,
        hi: &str,
    ) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let index = txn.open_table(definition).map_err(map_err!(Table))?;
        let mut count = 0;
        for entry in index.range(lo..hi).map_err(map_err!(Read))? {
            entry.map_err(map_err!(Read))?;
            count += 1;
        }
        Ok(count)
    }

    // ── Users ──────────────────────────────────────────────────────

    /// Insert or update a user.
    pub fn put_user(&self, user: &UserRecord) -> StateResult<()> {
        let value = serde_json::to_vec(user).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(USERS).map_err(map_err!(Table))?;
            table
                .insert(user.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

// ── Metrics ────────────────────────────────────────────────────────

impl MetricStore for StateStore {
    fn increment(
        &self,
        name: &str,
        date: NaiveDate,
        delta: u64,
        metadata: &Metadata,
    ) -> StateResult<MetricRecord> {
        let key = metric_key(name, date);
        // Blocks until every earlier write transaction has committed.
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let record;
        {
            let mut table = txn.open_table(METRICS).map_err(map_err!(Table))?;
            let existing: Option<MetricRecord> = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };

            let created = existing.is_none();
            record = match existing {
                Some(mut current) => {
                    let before = current.metric_value;
                    current.metric_value = before.checked_add(delta).ok_or_else(|| {
                        StateError::Overflow {
                            key: key.clone(),
                            current: before,
                            delta,
                        }
                    })?;
                    current.merge_metadata(metadata);
                    current
                }
                None => MetricRecord::new(name, date, delta, metadata.clone()),
            };

            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            if created {
                let mut index = txn.open_table(METRICS_BY_DATE).map_err(map_err!(Table))?;
                index
                    .insert(date_index_key(date, name).as_str(), ())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, value = record.metric_value, delta, "metric incremented");
        Ok(record)
    }

    fn get(&self, name: &str, date: NaiveDate) -> StateResult<Option<MetricRecord>> {
        let key = metric_key(name, date);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(METRICS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: MetricRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn range(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StateResult<Vec<MetricRecord>> {
        if start > end {
            return Ok(Vec::new());
        }
        let lo = metric_key(name, start);
        let hi = metric_key(name, end);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(METRICS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.range(lo.as_str()..=hi.as_str()).map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: MetricRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    fn list_for_date(&self, date: NaiveDate) -> StateResult<Vec<MetricRecord>> {
        // '0' is the byte after '/', so this covers exactly the `{day}/` prefix.
        let day = date_key(date);
        let lo = format!("{day}/");
        let hi = format!("{day}0");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let index = txn.open_table(METRICS_BY_DATE).map_err(map_err!(Table))?;
        let table = txn.open_table(METRICS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in index.range(lo.as_str()..hi.as_str()).map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            let Some((_, name)) = key.value().split_once('/') else {
                continue;
            };
            if let Some(guard) = table.get(metric_key(name, date).as_str()).map_err(map_err!(Read))? {
                let record: MetricRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }
}

// ── Content ────────────────────────────────────────────────────────

impl ContentStore for StateStore {
    fn count_articles_with_status(&self, status: ArticleStatus) -> StateResult<u64> {
        let status = status.as_str();
        self.count_index_range(ARTICLES_BY_STATUS, &format!("{status}/"), &format!("{status}0"))
    }

    fn count_moderated_between(
        &self,
        status: ArticleStatus,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StateResult<u64> {
        if start > end {
            return Ok(0);
        }
        let status = status.as_str();
        let lo = format!("{status}/{}/", date_key(start));
        let hi = format!("{status}/{}0", date_key(end));
        self.count_index_range(ARTICLES_BY_MODERATION, &lo, &hi)
    }

    fn count_users(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(USERS).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }
}
