//! redb table definitions for the Tally state store.
//!
//! Values are JSON-serialized domain types. Metric keys are
//! `{metric_name}/{day}` where `{day}` is the fixed-width text from
//! [`date_key`](crate::types::date_key), so within one metric name the key
//! order is ascending date order and a date range is a single key-range scan.

use redb::TableDefinition;

/// Metric buckets keyed by `{metric_name}/{day}`.
pub const METRICS: TableDefinition<&str, &[u8]> = TableDefinition::new("metrics");

/// Secondary index keyed by `{day}/{metric_name}`, written in the same
/// transaction as the bucket it points at.
pub const METRICS_BY_DATE: TableDefinition<&str, ()> = TableDefinition::new("metrics_by_date");

/// Articles keyed by `{id}`. Owned by the content workflow; counted here.
pub const ARTICLES: TableDefinition<&str, &[u8]> = TableDefinition::new("articles");

/// Status index keyed by `{status}/{article_id}`. Maintained by `put_article`.
pub const ARTICLES_BY_STATUS: TableDefinition<&str, ()> =
    TableDefinition::new("articles_by_status");

/// Moderation index keyed by `{status}/{day}/{article_id}` for articles with
/// a moderation timestamp.
pub const ARTICLES_BY_MODERATION: TableDefinition<&str, ()> =
    TableDefinition::new("articles_by_moderation");

/// Registered users keyed by `{id}`.
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
