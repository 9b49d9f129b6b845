//! tally-metrics: the metrics aggregation engine.
//!
//! Records daily usage counters, answers point and range queries over them,
//! and derives dashboard summaries and approval rates from counters plus
//! live entity counts.
//!
//! # Architecture
//!
//! ```text
//! MetricsEngine<S: MetricStore, C: ContentStore>
//!   ├── track_metric() / track_metrics() ← called from request handlers
//!   ├── get_metric() / get_metric_range() → bucket reads
//!   ├── dashboard_summary() → today's buckets + live totals
//!   └── approval_rate() → moderation counts over a date range
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```
//!
//! Recording is best-effort: failures are logged and reported as `false`,
//! never raised into the caller's workflow.

pub mod dashboard;
pub mod engine;
pub mod error;
pub mod prometheus;

#[cfg(test)]
mod testing;

pub use dashboard::{DashboardSummary, DashboardTotals, SummaryView, approval_percentage};
pub use engine::{BatchOutcome, EngineOptions, ItemOutcome, MetricPoint, MetricsEngine, TrackItem};
pub use error::{EngineError, EngineResult};
pub use prometheus::render_prometheus;
