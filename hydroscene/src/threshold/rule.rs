//! Threshold rules, metric samples and alerts.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Comparison applied as `observed <op> limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    /// Exact equality; intended for discrete metrics such as gate positions.
    Eq,
}

impl Comparator {
    /// Returns true if `observed <op> limit` holds. NaN never matches.
    pub fn holds(&self, observed: f64, limit: f64) -> bool {
        match self {
            Comparator::Gt => observed > limit,
            Comparator::Ge => observed >= limit,
            Comparator::Lt => observed < limit,
            Comparator::Le => observed <= limit,
            Comparator::Eq => observed == limit,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Eq => "==",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Comparator::Gt),
            ">=" => Ok(Comparator::Ge),
            "<" => Ok(Comparator::Lt),
            "<=" => Ok(Comparator::Le),
            "==" => Ok(Comparator::Eq),
            other => Err(ControlError::validation(format!(
                "unknown comparator '{other}' (expected >, >=, <, <= or ==)"
            ))),
        }
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Danger,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Danger => "danger",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warning" => Ok(Severity::Warning),
            "danger" => Ok(Severity::Danger),
            "critical" => Ok(Severity::Critical),
            other => Err(ControlError::validation(format!(
                "unknown severity '{other}' (expected warning, danger or critical)"
            ))),
        }
    }
}

/// A configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Key for the per-rule cool-down.
    pub id: String,
    pub metric: String,
    pub comparator: Comparator,
    pub limit: f64,
    pub severity: Severity,
}

impl ThresholdRule {
    pub fn new(
        id: impl Into<String>,
        metric: impl Into<String>,
        comparator: Comparator,
        limit: f64,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            metric: metric.into(),
            comparator,
            limit,
            severity,
        }
    }

    /// Parse the config form `"<metric> <op> <limit> <severity>"`.
    pub fn parse(id: impl Into<String>, definition: &str) -> Result<Self, ControlError> {
        let id = id.into();
        let parts: Vec<&str> = definition.split_whitespace().collect();
        let [metric, op, limit, severity] = parts.as_slice() else {
            return Err(ControlError::validation(format!(
                "rule '{id}': expected '<metric> <op> <limit> <severity>', got '{definition}'"
            )));
        };

        let limit: f64 = limit.parse().map_err(|_| {
            ControlError::validation(format!("rule '{id}': limit '{limit}' is not a number"))
        })?;
        if !limit.is_finite() {
            return Err(ControlError::validation(format!(
                "rule '{id}': limit must be finite"
            )));
        }

        Ok(Self {
            metric: metric.to_string(),
            comparator: op.parse()?,
            limit,
            severity: severity.parse()?,
            id,
        })
    }

    /// Returns true if the sample trips this rule.
    pub fn matches(&self, sample: &MetricSample) -> bool {
        sample.metric == self.metric && self.comparator.holds(sample.value, self.limit)
    }

    /// The config form of this rule.
    pub fn definition(&self) -> String {
        format!(
            "{} {} {} {}",
            self.metric, self.comparator, self.limit, self.severity
        )
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.definition())
    }
}

/// One metric reading from the telemetry pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(metric: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric: metric.into(),
            value,
            timestamp,
        }
    }
}

/// Samples evaluated together; stamped when they entered the core.
#[derive(Debug, Clone)]
pub struct MetricBatch {
    pub samples: Vec<MetricSample>,
    pub received_at: Instant,
}

impl MetricBatch {
    pub fn new(samples: Vec<MetricSample>, received_at: Instant) -> Self {
        Self {
            samples,
            received_at,
        }
    }
}

/// A fired rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdAlert {
    pub metric: String,
    pub observed_value: f64,
    pub rule: ThresholdRule,
    pub timestamp: DateTime<Utc>,
}

impl ThresholdAlert {
    pub fn severity(&self) -> Severity {
        self.rule.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparators() {
        assert!(Comparator::Gt.holds(181.0, 175.0));
        assert!(!Comparator::Gt.holds(175.0, 175.0));
        assert!(Comparator::Ge.holds(175.0, 175.0));
        assert!(Comparator::Lt.holds(1.0, 2.0));
        assert!(Comparator::Le.holds(2.0, 2.0));
        assert!(Comparator::Eq.holds(3.0, 3.0));
        assert!(!Comparator::Gt.holds(f64::NAN, 0.0));
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Warning < Severity::Danger);
        assert!(Severity::Danger < Severity::Critical);
    }

    #[test]
    fn test_parse_rule() {
        let rule = ThresholdRule::parse("reservoir_high", "water_level > 175 critical").unwrap();
        assert_eq!(rule.metric, "water_level");
        assert_eq!(rule.comparator, Comparator::Gt);
        assert_eq!(rule.limit, 175.0);
        assert_eq!(rule.severity, Severity::Critical);
        assert_eq!(rule.definition(), "water_level > 175 critical");
    }

    #[test]
    fn test_parse_rule_errors() {
        assert!(ThresholdRule::parse("r", "water_level > 175").is_err());
        assert!(ThresholdRule::parse("r", "water_level => 175 critical").is_err());
        assert!(ThresholdRule::parse("r", "water_level > high critical").is_err());
        assert!(ThresholdRule::parse("r", "water_level > 175 severe").is_err());
        assert!(ThresholdRule::parse("r", "water_level > inf critical").is_err());
    }

    #[test]
    fn test_rule_matches_only_its_metric() {
        let rule = ThresholdRule::new("r", "flow_rate", Comparator::Ge, 9000.0, Severity::Danger);
        assert!(rule.matches(&MetricSample::new("flow_rate", 9500.0, Utc::now())));
        assert!(!rule.matches(&MetricSample::new("water_level", 9500.0, Utc::now())));
    }
}
