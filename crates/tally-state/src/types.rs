//! Domain types for the Tally state store.
//!
//! `MetricRecord` is the only entity the engine writes. Articles and users
//! belong to the surrounding application; the store keeps just the fields
//! the engine counts.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Free-form auxiliary context attached to a metric bucket.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Shift applied to `num_days_from_ce` so every representable date maps to
/// a non-negative day number.
const DAY_KEY_OFFSET: i64 = 100_000_000;

/// Fixed-width, order-preserving key text for a calendar day.
///
/// `NaiveDate`'s `Display` form gains a sign outside years 0000..=9999, which
/// breaks lexical order, so keys carry an offset day number instead.
pub fn date_key(date: NaiveDate) -> String {
    format!("{:09}", i64::from(date.num_days_from_ce()) + DAY_KEY_OFFSET)
}

/// Composite key of a metric bucket in the `metrics` table.
pub fn metric_key(name: &str, date: NaiveDate) -> String {
    format!("{name}/{}", date_key(date))
}

/// Composite key of a metric bucket in the `metrics_by_date` index.
pub fn date_index_key(date: NaiveDate, name: &str) -> String {
    format!("{}/{name}", date_key(date))
}

// ── Metrics ────────────────────────────────────────────────────────

/// One metric bucket: the cumulative value of `metric_name` on `metric_date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    pub metric_name: String,
    /// UTC calendar day the bucket aggregates.
    pub metric_date: NaiveDate,
    pub metric_value: u64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl MetricRecord {
    pub fn new(name: &str, date: NaiveDate, value: u64, metadata: Metadata) -> Self {
        Self {
            metric_name: name.to_string(),
            metric_date: date,
            metric_value: value,
            metadata,
        }
    }

    /// Shallow merge: keys in `incoming` replace keys of the same name.
    pub fn merge_metadata(&mut self, incoming: &Metadata) {
        for (key, value) in incoming {
            self.metadata.insert(key.clone(), value.clone());
        }
    }
}

// ── Content ────────────────────────────────────────────────────────

/// Moderation state of an article.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Pending,
    Approved,
    Rejected,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleRecord {
    pub id: String,
    pub status: ArticleStatus,
    /// When the article last transitioned to approved or rejected.
    pub moderated_at: Option<DateTime<Utc>>,
}

impl ArticleRecord {
    /// Key in the `articles_by_status` index.
    pub fn status_index_key(&self) -> String {
        format!("{}/{}", self.status.as_str(), self.id)
    }

    /// Key in the `articles_by_moderation` index, if the article was moderated.
    pub fn moderation_index_key(&self) -> Option<String> {
        self.moderated_at.map(|at| {
            format!("{}/{}/{}", self.status.as_str(), date_key(at.date_naive()), self.id)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
}
