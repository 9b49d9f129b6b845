//! REST API handlers.
//!
//! Handlers call the engine's fallible `try_*` operations so they can tell
//! callers apart: 400 for rejected input, 404 for an absent bucket, 503 when
//! the store could not be reached.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use tally_metrics::{EngineError, SummaryView, TrackItem};

use crate::ApiState;

const METRICS_UNAVAILABLE: &str = "metrics unavailable";

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn engine_error_response(e: &EngineError) -> axum::response::Response {
    if e.is_validation() {
        warn!(error = %e, "request rejected");
        error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response()
    } else {
        error!(error = %e, "store unavailable");
        error_response(METRICS_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE).into_response()
    }
}

/// Query string for single-bucket reads.
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

/// Inclusive date window.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RangeQuery {
    fn check(&self) -> Result<(), axum::response::Response> {
        if self.start > self.end {
            return Err(error_response(
                &format!("start {} is after end {}", self.start, self.end),
                StatusCode::BAD_REQUEST,
            )
            .into_response());
        }
        Ok(())
    }
}

// ── Recording ──────────────────────────────────────────────────

/// POST /api/v1/metrics/track
pub async fn track_metric(
    State(state): State<ApiState>,
    Json(item): Json<TrackItem>,
) -> impl IntoResponse {
    match state.engine.record(&item.name, item.delta, item.metadata).await {
        Ok(record) => ApiResponse::ok(record).into_response(),
        Err(e) => engine_error_response(&e),
    }
}

/// Per-item line of a batch response.
#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub all_succeeded: bool,
    pub results: Vec<BatchItemResult>,
}

/// POST /api/v1/metrics/batch
pub async fn track_metrics(
    State(state): State<ApiState>,
    Json(items): Json<Vec<TrackItem>>,
) -> impl IntoResponse {
    let outcome = state.engine.track_metrics(items).await;
    let all_succeeded = outcome.all_succeeded();
    let results = outcome
        .items
        .into_iter()
        .map(|item| match item.result {
            Ok(record) => BatchItemResult {
                name: item.name,
                ok: true,
                value: Some(record.metric_value),
                error: None,
            },
            Err(e) => BatchItemResult {
                name: item.name,
                ok: false,
                value: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    ApiResponse::ok(BatchResponse {
        all_succeeded,
        results,
    })
    .into_response()
}

// ── Reading ────────────────────────────────────────────────────

/// GET /api/v1/metrics/:name
pub async fn get_metric(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<DateQuery>,
) -> impl IntoResponse {
    match state.engine.try_get_metric(&name, query.date).await {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("no events recorded", StatusCode::NOT_FOUND).into_response(),
        Err(e) => engine_error_response(&e),
    }
}

/// GET /api/v1/metrics/:name/range
pub async fn get_metric_range(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<RangeQuery>,
) -> impl IntoResponse {
    if let Err(resp) = query.check() {
        return resp;
    }
    match state
        .engine
        .try_get_metric_range(&name, query.start, query.end)
        .await
    {
        Ok(points) => ApiResponse::ok(points).into_response(),
        Err(e) => engine_error_response(&e),
    }
}

// ── Reports ────────────────────────────────────────────────────

/// GET /api/v1/dashboard/summary
pub async fn dashboard_summary(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.dashboard_summary().await {
        SummaryView::Available(summary) => ApiResponse::ok(summary).into_response(),
        SummaryView::Unavailable => {
            error_response(METRICS_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApprovalRateResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rate: f64,
}

/// GET /api/v1/reports/approval-rate
pub async fn approval_rate(
    State(state): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> impl IntoResponse {
    if let Err(resp) = query.check() {
        return resp;
    }
    match state.engine.approval_rate(query.start, query.end).await {
        Some(rate) => ApiResponse::ok(ApprovalRateResponse {
            start: query.start,
            end: query.end,
            rate,
        })
        .into_response(),
        None => error_response(METRICS_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE).into_response(),
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.try_dashboard_summary().await {
        Ok(summary) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            tally_metrics::render_prometheus(&summary),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "prometheus scrape failed");
            (StatusCode::SERVICE_UNAVAILABLE, METRICS_UNAVAILABLE).into_response()
        }
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::{TimeZone, Utc};
    use tally_metrics::{EngineOptions, MetricsEngine};
    use tally_state::{ArticleRecord, ArticleStatus, Metadata, MetricStore, StateStore};

    fn test_state() -> (ApiState, StateStore) {
        let store = StateStore::open_in_memory().unwrap();
        let engine = MetricsEngine::new(store.clone(), store.clone(), EngineOptions::default());
        (ApiState { engine }, store)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn track_then_get() {
        let (state, _) = test_state();

        for delta in [1, 4] {
            let resp = track_metric(State(state.clone()), Json(TrackItem::new("article_views", delta)))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = get_metric(
            State(state),
            Path("article_views".to_string()),
            Query(DateQuery { date: None }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["metric_value"], 5);
    }

    #[tokio::test]
    async fn track_unknown_metric_is_bad_request() {
        let (state, _) = test_state();
        let resp = track_metric(State(state), Json(TrackItem::new("nonsense", 1)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn track_negative_delta_is_bad_request() {
        let (state, _) = test_state();
        let resp = track_metric(State(state), Json(TrackItem::new("api_calls", -3)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_absent_metric_is_not_found() {
        let (state, _) = test_state();
        let resp = get_metric(
            State(state),
            Path("article_views".to_string()),
            Query(DateQuery { date: Some(day(1)) }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn batch_reports_per_item() {
        let (state, _) = test_state();
        let items = vec![
            TrackItem::new("api_calls", 1),
            TrackItem::new("api_calls", 2),
            TrackItem::new("bogus_metric", 1),
        ];
        let resp = track_metrics(State(state), Json(items)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["data"]["all_succeeded"], false);
        let results = body["data"]["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["ok"], true);
        assert_eq!(results[2]["ok"], false);
        assert_eq!(results[2]["name"], "bogus_metric");
    }

    #[tokio::test]
    async fn range_returns_sparse_series() {
        let (state, store) = test_state();
        store.increment("article_views", day(1), 2, &Metadata::new()).unwrap();
        store.increment("article_views", day(3), 6, &Metadata::new()).unwrap();
        store.increment("article_views", day(9), 1, &Metadata::new()).unwrap();

        let resp = get_metric_range(
            State(state),
            Path("article_views".to_string()),
            Query(RangeQuery {
                start: day(1),
                end: day(3),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        let points = body["data"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0]["date"], "2024-06-01");
        assert_eq!(points[1]["value"], 6);
    }

    #[tokio::test]
    async fn inverted_range_is_bad_request() {
        let (state, _) = test_state();
        let resp = approval_rate(
            State(state),
            Query(RangeQuery {
                start: day(5),
                end: day(1),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn approval_rate_report() {
        let (state, store) = test_state();
        for (id, status) in [
            ("a1", ArticleStatus::Approved),
            ("a2", ArticleStatus::Approved),
            ("a3", ArticleStatus::Approved),
            ("r1", ArticleStatus::Rejected),
        ] {
            store
                .put_article(&ArticleRecord {
                    id: id.to_string(),
                    status,
                    moderated_at: Some(Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap()),
                })
                .unwrap();
        }

        let resp = approval_rate(
            State(state),
            Query(RangeQuery {
                start: day(1),
                end: day(30),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["rate"], 75.0);
    }

    #[tokio::test]
    async fn dashboard_summary_ok() {
        let (state, _) = test_state();
        state.engine.track_metric("cache_hits", 3, None).await;

        let resp = dashboard_summary(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["today"]["cache_hits"], 3);
        assert_eq!(body["data"]["totals"]["pendingModeration"], 0);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let (state, _) = test_state();
        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
