//! Derived figures: the dashboard summary and the approval rate.
//!
//! Both combine reads that are not taken from one snapshot. A summary can
//! reflect an event in one count and not in another; callers must not treat
//! it as transactionally consistent.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error};

use tally_state::{ArticleStatus, ContentStore, MetricStore};

use crate::engine::MetricsEngine;
use crate::error::EngineResult;

/// Live entity counts read from the content and identity stores.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    /// Approved articles.
    pub articles: u64,
    pub pending_moderation: u64,
    pub users: u64,
}

/// Today's counters plus live totals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub today: BTreeMap<String, u64>,
    pub totals: DashboardTotals,
}

/// Outcome of [`MetricsEngine::dashboard_summary`].
///
/// `Unavailable` is shown as "metrics unavailable", never as zeros.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryView {
    Available(DashboardSummary),
    Unavailable,
}

impl SummaryView {
    pub fn summary(&self) -> Option<&DashboardSummary> {
        match self {
            SummaryView::Available(summary) => Some(summary),
            SummaryView::Unavailable => None,
        }
    }
}

/// `approved / (approved + rejected) * 100`, or `0.0` with no moderation activity.
pub fn approval_percentage(approved: u64, rejected: u64) -> f64 {
    let total = approved + rejected;
    if total == 0 {
        return 0.0;
    }
    approved as f64 / total as f64 * 100.0
}

impl<S: MetricStore, C: ContentStore> MetricsEngine<S, C> {
    /// Build the summary, failing as a whole if any sub-read fails.
    pub async fn try_dashboard_summary(&self) -> EngineResult<DashboardSummary> {
        let date = Self::today();

        let store = self.store.clone();
        let approved = self.content.clone();
        let pending = self.content.clone();
        let users = self.content.clone();

        let (records, articles, pending_moderation, users) = tokio::try_join!(
            self.blocking("list_for_date", move || store.list_for_date(date)),
            self.blocking("count_approved", move || {
                approved.count_articles_with_status(ArticleStatus::Approved)
            }),
            self.blocking("count_pending", move || {
                pending.count_articles_with_status(ArticleStatus::Pending)
            }),
            self.blocking("count_users", move || users.count_users()),
        )?;

        let today = records
            .into_iter()
            .map(|r| (r.metric_name, r.metric_value))
            .collect();

        Ok(DashboardSummary {
            date,
            today,
            totals: DashboardTotals {
                articles,
                pending_moderation,
                users,
            },
        })
    }

    pub async fn dashboard_summary(&self) -> SummaryView {
        match self.try_dashboard_summary().await {
            Ok(summary) => {
                debug!(metrics = summary.today.len(), "dashboard summary built");
                SummaryView::Available(summary)
            }
            Err(e) => {
                error!(error = %e, "dashboard summary unavailable");
                SummaryView::Unavailable
            }
        }
    }

    /// Share of moderation decisions in `[start, end]` that were approvals.
    /// Not rounded.
    pub async fn try_approval_rate(&self, start: NaiveDate, end: NaiveDate) -> EngineResult<f64> {
        let approved = self.content.clone();
        let rejected = self.content.clone();

        let (approved, rejected) = tokio::try_join!(
            self.blocking("count_approved_between", move || {
                approved.count_moderated_between(ArticleStatus::Approved, start, end)
            }),
            self.blocking("count_rejected_between", move || {
                rejected.count_moderated_between(ArticleStatus::Rejected, start, end)
            }),
        )?;

        debug!(%start, %end, approved, rejected, "approval counts read");
        Ok(approval_percentage(approved, rejected))
    }

    /// Approval rate, or `None` when the content store could not be read.
    pub async fn approval_rate(&self, start: NaiveDate, end: NaiveDate) -> Option<f64> {
        match self.try_approval_rate(start, end).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                error!(%start, %end, error = %e, "approval rate unavailable");
                None
            }
        }
    }
}
