pub mod config;
pub mod vocabulary;

pub use config::{ConfigError, TallyConfig};
pub use vocabulary::{BuiltinMetric, MetricVocabulary, is_valid_metric_name};
