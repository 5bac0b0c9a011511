//! Fixed-capacity alert buffer.

use std::collections::VecDeque;

use super::rule::ThresholdAlert;

/// Default number of alerts kept.
pub const DEFAULT_ALERT_CAPACITY: usize = 10;

/// Ring buffer of recent alerts; the oldest is evicted when full.
#[derive(Debug, Clone)]
pub struct AlertRing {
    capacity: usize,
    alerts: VecDeque<ThresholdAlert>,
}

impl Default for AlertRing {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}

impl AlertRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            alerts: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an alert, returning the evicted one if the ring was full.
    pub fn push(&mut self, alert: ThresholdAlert) -> Option<ThresholdAlert> {
        let evicted = if self.alerts.len() == self.capacity {
            self.alerts.pop_front()
        } else {
            None
        };
        self.alerts.push_back(alert);
        evicted
    }

    /// Alerts, oldest first.
    pub fn to_vec(&self) -> Vec<ThresholdAlert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&ThresholdAlert> {
        self.alerts.back()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::{Comparator, Severity, ThresholdRule};
    use chrono::Utc;

    fn alert(value: f64) -> ThresholdAlert {
        ThresholdAlert {
            metric: "water_level".to_string(),
            observed_value: value,
            rule: ThresholdRule::new("r", "water_level", Comparator::Gt, 0.0, Severity::Warning),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let mut ring = AlertRing::default();
        for n in 0..10 {
            assert!(ring.push(alert(n as f64)).is_none());
        }
        let evicted = ring.push(alert(10.0)).unwrap();

        assert_eq!(evicted.observed_value, 0.0);
        assert_eq!(ring.len(), 10);
        assert_eq!(ring.to_vec()[0].observed_value, 1.0);
        assert_eq!(ring.latest().unwrap().observed_value, 10.0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut ring = AlertRing::new(0);
        ring.push(alert(1.0));
        ring.push(alert(2.0));
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.latest().unwrap().observed_value, 2.0);
    }
}
