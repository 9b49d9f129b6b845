//! Recognized metric names.
//!
//! Every bucket the engine creates is keyed by a name from this allow-list.
//! Unrecognized names are rejected at the recorder boundary so that callers
//! cannot grow the metric table without bound.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of a metric name in bytes.
pub const MAX_METRIC_NAME_LEN: usize = 64;

/// Metric names every deployment recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinMetric {
    DailySubmissions,
    DailyApprovals,
    DailyRejections,
    SearchQueries,
    ArticleViews,
    VotesCast,
    ApiCalls,
    LlmTokensUsed,
    CacheHits,
    FormattingFailures,
    ArticleEdits,
}

impl BuiltinMetric {
    pub const ALL: [BuiltinMetric; 11] = [
        BuiltinMetric::DailySubmissions,
        BuiltinMetric::DailyApprovals,
        BuiltinMetric::DailyRejections,
        BuiltinMetric::SearchQueries,
        BuiltinMetric::ArticleViews,
        BuiltinMetric::VotesCast,
        BuiltinMetric::ApiCalls,
        BuiltinMetric::LlmTokensUsed,
        BuiltinMetric::CacheHits,
        BuiltinMetric::FormattingFailures,
        BuiltinMetric::ArticleEdits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinMetric::DailySubmissions => "daily_submissions",
            BuiltinMetric::DailyApprovals => "daily_approvals",
            BuiltinMetric::DailyRejections => "daily_rejections",
            BuiltinMetric::SearchQueries => "search_queries",
            BuiltinMetric::ArticleViews => "article_views",
            BuiltinMetric::VotesCast => "votes_cast",
            BuiltinMetric::ApiCalls => "api_calls",
            BuiltinMetric::LlmTokensUsed => "llm_tokens_used",
            BuiltinMetric::CacheHits => "cache_hits",
            BuiltinMetric::FormattingFailures => "formatting_failures",
            BuiltinMetric::ArticleEdits => "article_edits",
        }
    }
}

impl fmt::Display for BuiltinMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check the lexical shape of a metric name: `[a-z][a-z0-9_]*`, at most
/// [`MAX_METRIC_NAME_LEN`] bytes.
///
/// Names are embedded in composite store keys, so `/` must never appear.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.len() <= MAX_METRIC_NAME_LEN
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// The set of metric names a recorder accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricVocabulary {
    names: BTreeSet<String>,
}

impl MetricVocabulary {
    /// The built-in names only.
    pub fn builtin() -> Self {
        Self {
            names: BuiltinMetric::ALL
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }

    /// Built-in names plus `extra`. Returns the first malformed name as the error.
    pub fn with_extra<I, S>(extra: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::builtin();
        for name in extra {
            let name = name.into();
            if !is_valid_metric_name(&name) {
                return Err(name);
            }
            vocab.names.insert(name);
        }
        Ok(vocab)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for MetricVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
