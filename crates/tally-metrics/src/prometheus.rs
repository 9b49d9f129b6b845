//! Prometheus text exposition format.
//!
//! Renders a dashboard summary (today's buckets plus live totals) for
//! scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::dashboard::DashboardSummary;

/// Render a dashboard summary into Prometheus text format.
///
/// Buckets become one `tally_metric_value` series per metric name, labelled
/// with the bucket date. Totals become unlabelled gauges.
pub fn render_prometheus(summary: &DashboardSummary) -> String {
    let mut out = String::new();

    out.push_str("# HELP tally_metric_value Cumulative value of a metric for the current UTC day.\n");
    out.push_str("# TYPE tally_metric_value gauge\n");
    for (name, value) in &summary.today {
        let _ = writeln!(
            out,
            "tally_metric_value{{metric=\"{}\",date=\"{}\"}} {}",
            name, summary.date, value
        );
    }

    let totals = [
        ("tally_articles_approved", "Approved articles.", summary.totals.articles),
        (
            "tally_articles_pending_moderation",
            "Articles awaiting moderation.",
            summary.totals.pending_moderation,
        ),
        ("tally_users", "Registered users.", summary.totals.users),
    ];
    for (metric, help, value) in totals {
        let _ = writeln!(out, "# HELP {metric} {help}");
        let _ = writeln!(out, "# TYPE {metric} gauge");
        let _ = writeln!(out, "{metric} {value}");
    }

    out
}
