//! tally-state: embedded metric store for Tally.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for metric buckets and the article/user tables the engine counts.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Metric buckets use `{metric_name}/{day}` keys, with `{day}` a fixed-width
//! day number, so a date range is one key-range scan; a `{day}/{metric_name}`
//! index lists one day's buckets. Articles carry status and moderation-day
//! indexes so the engine's counts never decode article rows.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks. The engine talks to it through the
//! [`MetricStore`] and [`ContentStore`] traits.

pub mod backend;
pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use backend::{ContentStore, MetricStore};
pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
