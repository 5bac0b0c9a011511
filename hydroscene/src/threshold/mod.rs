//! Threshold rules and the alert monitor.

mod monitor;
mod ring;
mod rule;

pub use monitor::{
    Evaluation, MetricFeed, ThresholdConfig, ThresholdMonitor, DEFAULT_BATCH_DEADLINE,
    DEFAULT_COOLDOWN, DEFAULT_FEED_CAPACITY,
};
pub use ring::{AlertRing, DEFAULT_ALERT_CAPACITY};
pub use rule::{
    Comparator, MetricBatch, MetricSample, Severity, ThresholdAlert, ThresholdRule,
};
