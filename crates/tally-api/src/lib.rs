//! tally-api: REST API for Tally.
//!
//! Provides axum route handlers over the metrics engine for instrumentation
//! call sites, dashboards, and admin reporting.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/metrics/track` | Record one increment |
//! | POST | `/api/v1/metrics/batch` | Record several increments |
//! | GET | `/api/v1/metrics/:name?date=` | Value of one bucket |
//! | GET | `/api/v1/metrics/:name/range?start=&end=` | Buckets in a date range |
//! | GET | `/api/v1/dashboard/summary` | Today's counters and live totals |
//! | GET | `/api/v1/reports/approval-rate?start=&end=` | Approval percentage |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/healthz` | Liveness |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use tally_metrics::MetricsEngine;
use tally_state::StateStore;

/// Engine over a single redb store holding metrics and content tables.
pub type Engine = MetricsEngine<StateStore, StateStore>;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Engine,
}

/// Build the complete API router (REST + metrics).
pub fn build_router(engine: Engine) -> Router {
    let api_state = ApiState { engine };

    let api_routes = Router::new()
        .route("/metrics/track", post(handlers::track_metric))
        .route("/metrics/batch", post(handlers::track_metrics))
        .route("/metrics/{name}", get(handlers::get_metric))
        .route("/metrics/{name}/range", get(handlers::get_metric_range))
        .route("/dashboard/summary", get(handlers::dashboard_summary))
        .route("/reports/approval-rate", get(handlers::approval_rate))
        .with_state(api_state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(api_state))
        .route("/healthz", get(handlers::healthz))
}
