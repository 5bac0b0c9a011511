//! Threshold monitor.
//!
//! Evaluates metric batches against the configured rules, keeps recent
//! alerts in an [`AlertRing`], and asks for the emergency scene when a
//! critical alert fires.
//!
//! # Flow
//!
//! ```text
//! telemetry ──► MetricFeed::push ──► bounded mpsc ──► ThresholdMonitor::run
//!                 (drop if full)                          │
//!                                             drop batch if older than deadline
//!                                                         │
//!                                                   evaluate(batch)
//!                                                         │
//!                             critical && auto switch && scene != emergency
//!                                                         │
//!                                        SceneHandle::submit(emergency, threshold)
//! ```
//!
//! Each rule has its own cool-down: a rule that fired is silent until the
//! cool-down has elapsed, which keeps noisy sensors from queuing a storm of
//! emergency transitions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ring::{AlertRing, DEFAULT_ALERT_CAPACITY};
use super::rule::{MetricBatch, MetricSample, Severity, ThresholdAlert, ThresholdRule};
use crate::clock::SharedClock;
use crate::notify::{ControlNotice, NoticeBus};
use crate::preferences::SharedPreferences;
use crate::runtime::SharedControlHealth;
use crate::scene::{SceneHandle, SceneId, TransitionContext, TransitionOrigin, TransitionResult};

/// Default per-rule cool-down.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Default age after which a queued batch is dropped.
pub const DEFAULT_BATCH_DEADLINE: Duration = Duration::from_millis(1000);

/// Default capacity of the metric feed.
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Threshold monitor settings.
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    pub rules: Vec<ThresholdRule>,
    /// Minimum time between two alerts from the same rule.
    pub cooldown: Duration,
    /// Batches older than this when dequeued are dropped unevaluated.
    pub batch_deadline: Duration,
    pub alert_capacity: usize,
    pub feed_capacity: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            cooldown: DEFAULT_COOLDOWN,
            batch_deadline: DEFAULT_BATCH_DEADLINE,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

/// Result of evaluating one batch.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Alerts recorded for this batch.
    pub alerts: Vec<ThresholdAlert>,
    /// True if a transition to the emergency scene was requested.
    pub emergency_requested: bool,
    /// Reply channel for the requested transition.
    pub transition: Option<oneshot::Receiver<TransitionResult>>,
}

impl Evaluation {
    /// Highest severity among the alerts.
    pub fn max_severity(&self) -> Option<Severity> {
        self.alerts.iter().map(ThresholdAlert::severity).max()
    }
}

/// Evaluates metric batches against threshold rules.
pub struct ThresholdMonitor {
    config: ThresholdConfig,
    scenes: SceneHandle,
    preferences: SharedPreferences,
    clock: SharedClock,
    notices: NoticeBus,
    health: Option<SharedControlHealth>,
    alerts: RwLock<AlertRing>,
    last_fired: Mutex<HashMap<String, std::time::Instant>>,
}

impl ThresholdMonitor {
    pub fn new(
        config: ThresholdConfig,
        scenes: SceneHandle,
        preferences: SharedPreferences,
        clock: SharedClock,
        notices: NoticeBus,
    ) -> Self {
        let alerts = RwLock::new(AlertRing::new(config.alert_capacity));
        Self {
            config,
            scenes,
            preferences,
            clock,
            notices,
            health: None,
            alerts,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Record alert and drop counters into the shared health monitor.
    pub fn with_health(mut self, health: SharedControlHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.config.rules
    }

    /// Create a feed for pushing batches into [`ThresholdMonitor::run`].
    pub fn feed(&self) -> (MetricFeed, mpsc::Receiver<MetricBatch>) {
        let (tx, rx) = mpsc::channel(self.config.feed_capacity.max(1));
        let feed = MetricFeed {
            tx,
            clock: Arc::clone(&self.clock),
            health: self.health.clone(),
        };
        (feed, rx)
    }

    /// Evaluate one batch.
    pub async fn evaluate(&self, batch: &MetricBatch) -> Evaluation {
        if !self.preferences.threshold_alerts() {
            debug!(samples = batch.samples.len(), "Threshold alerts disabled, batch ignored");
            return Evaluation::default();
        }

        let alerts = self.fire_rules(&batch.samples);
        let mut evaluation = Evaluation {
            alerts,
            ..Evaluation::default()
        };

        let Some(critical) = evaluation
            .alerts
            .iter()
            .find(|a| a.severity() == Severity::Critical)
        else {
            return evaluation;
        };

        if !self.preferences.auto_switch_scenes() {
            info!(rule = %critical.rule.id, "Critical alert, automatic scene switching disabled");
            return evaluation;
        }
        if self.scenes.current_scene() == SceneId::Emergency {
            debug!(rule = %critical.rule.id, "Critical alert while already in emergency");
            return evaluation;
        }

        let context = TransitionContext::because(format!(
            "critical alert {}: {} = {}",
            critical.rule.id, critical.metric, critical.observed_value
        ));
        match self
            .scenes
            .try_submit(SceneId::Emergency, TransitionOrigin::Threshold, context)
        {
            Ok(rx) => {
                info!(rule = %critical.rule.id, "Emergency transition requested");
                evaluation.emergency_requested = true;
                evaluation.transition = Some(rx);
            }
            Err(e) => warn!(error = %e, "Could not request emergency transition"),
        }
        evaluation
    }

    /// Match samples against rules, honoring per-rule cool-downs.
    fn fire_rules(&self, samples: &[MetricSample]) -> Vec<ThresholdAlert> {
        let now = self.clock.now();
        let wall = self.clock.wall();
        let mut fired = Vec::new();

        let Ok(mut last_fired) = self.last_fired.lock() else {
            return fired;
        };

        for sample in samples {
            for rule in self.config.rules.iter().filter(|r| r.matches(sample)) {
                if let Some(last) = last_fired.get(&rule.id) {
                    if now.saturating_duration_since(*last) < self.config.cooldown {
                        debug!(rule = %rule.id, value = sample.value, "Rule in cool-down, alert suppressed");
                        continue;
                    }
                }
                last_fired.insert(rule.id.clone(), now);

                let alert = ThresholdAlert {
                    metric: sample.metric.clone(),
                    observed_value: sample.value,
                    rule: rule.clone(),
                    timestamp: wall,
                };
                warn!(
                    rule = %rule.id,
                    metric = %sample.metric,
                    value = sample.value,
                    limit = rule.limit,
                    severity = %rule.severity,
                    "Threshold alert"
                );
                fired.push(alert);
            }
        }
        drop(last_fired);

        if !fired.is_empty() {
            if let Ok(mut ring) = self.alerts.write() {
                for alert in &fired {
                    ring.push(alert.clone());
                }
            }
            if let Some(health) = &self.health {
                health.alerts_fired(fired.len());
            }
            for alert in &fired {
                self.notices.publish(ControlNotice::AlertFired(alert.clone()));
            }
        }
        fired
    }

    /// Recent alerts, oldest first.
    pub fn alerts(&self) -> Vec<ThresholdAlert> {
        self.alerts.read().map(|r| r.to_vec()).unwrap_or_default()
    }

    /// Evaluate batches until shutdown or until every feed is dropped.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<MetricBatch>, shutdown: CancellationToken) {
        info!(
            rules = self.config.rules.len(),
            cooldown_secs = self.config.cooldown.as_secs(),
            deadline_ms = self.config.batch_deadline.as_millis() as u64,
            "Threshold monitor starting"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Threshold monitor shutting down");
                    break;
                }

                batch = rx.recv() => {
                    let Some(batch) = batch else {
                        debug!("Threshold monitor stopped (feed closed)");
                        break;
                    };

                    let age = self.clock.now().saturating_duration_since(batch.received_at);
                    if age > self.config.batch_deadline {
                        warn!(age_ms = age.as_millis() as u64, samples = batch.samples.len(), "Dropping late metric batch");
                        if let Some(health) = &self.health {
                            health.batch_dropped();
                        }
                        continue;
                    }

                    let evaluation = self.evaluate(&batch).await;
                    if let Some(reply) = evaluation.transition {
                        track_emergency(reply);
                    }
                }
            }
        }
    }
}

/// Log the outcome of a threshold-driven transition without blocking the monitor.
///
/// Failures are not retried; the next critical alert after the cool-down
/// asks again.
fn track_emergency(reply: oneshot::Receiver<TransitionResult>) {
    tokio::spawn(async move {
        match reply.await {
            Ok(Ok(outcome)) => {
                debug!(committed = outcome.is_committed(), "Threshold transition handled");
            }
            Ok(Err(e)) => warn!(error = %e, "Threshold-driven emergency transition failed"),
            Err(_) => debug!("Scene coordinator stopped before answering"),
        }
    });
}

/// Sender side of the metric feed.
#[derive(Clone)]
pub struct MetricFeed {
    tx: mpsc::Sender<MetricBatch>,
    clock: SharedClock,
    health: Option<SharedControlHealth>,
}

impl MetricFeed {
    /// Queue a batch. Returns false if it was dropped (feed full or closed).
    pub fn push(&self, samples: Vec<MetricSample>) -> bool {
        let batch = MetricBatch::new(samples, self.clock.now());
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(batch)) => {
                warn!(samples = batch.samples.len(), "Metric feed full, batch dropped");
                if let Some(health) = &self.health {
                    health.batch_dropped();
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Metric feed closed, batch dropped");
                false
            }
        }
    }
}

impl std::fmt::Debug for MetricFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricFeed")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::runtime::ControlHealth;
    use crate::scene::{SceneCoordinator, SceneCoordinatorConfig, SceneSnapshot, StaticSceneLoader};
    use crate::threshold::Comparator;
    use chrono::Utc;

    struct Fixture {
        monitor: Arc<ThresholdMonitor>,
        scenes: SceneHandle,
        clock: Arc<ManualClock>,
        prefs: SharedPreferences,
        health: SharedControlHealth,
    }

    fn fixture(rules: Vec<ThresholdRule>) -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let (coordinator, scenes) = SceneCoordinator::new(
            SceneCoordinatorConfig::default(),
            Arc::new(StaticSceneLoader::new()),
            clock.clone(),
            SceneSnapshot::initial(Utc::now()),
        );
        tokio::spawn(coordinator.run(CancellationToken::new()));

        let prefs = SharedPreferences::default();
        let health = Arc::new(ControlHealth::new());
        let monitor = ThresholdMonitor::new(
            ThresholdConfig {
                rules,
                ..ThresholdConfig::default()
            },
            scenes.clone(),
            prefs.clone(),
            clock.clone(),
            NoticeBus::default(),
        )
        .with_health(Arc::clone(&health));

        Fixture {
            monitor: Arc::new(monitor),
            scenes,
            clock,
            prefs,
            health,
        }
    }

    fn water_rule(severity: Severity) -> ThresholdRule {
        ThresholdRule::new("reservoir_high", "water_level", Comparator::Gt, 175.0, severity)
    }

    fn batch(clock: &ManualClock, metric: &str, value: f64) -> MetricBatch {
        use crate::clock::Clock;
        MetricBatch::new(vec![MetricSample::new(metric, value, Utc::now())], clock.now())
    }

    #[tokio::test]
    async fn test_critical_alert_switches_to_emergency() {
        let f = fixture(vec![water_rule(Severity::Critical)]);

        let evaluation = f.monitor.evaluate(&batch(&f.clock, "water_level", 181.0)).await;

        assert_eq!(evaluation.alerts.len(), 1);
        assert_eq!(evaluation.max_severity(), Some(Severity::Critical));
        assert!(evaluation.emergency_requested);

        let outcome = evaluation.transition.unwrap().await.unwrap().unwrap();
        assert_eq!(outcome.snapshot().current, SceneId::Emergency);
        assert_eq!(outcome.snapshot().previous, Some(SceneId::Normal));
    }

    #[tokio::test]
    async fn test_non_critical_alert_does_not_switch() {
        let f = fixture(vec![water_rule(Severity::Danger)]);

        let evaluation = f.monitor.evaluate(&batch(&f.clock, "water_level", 181.0)).await;

        assert_eq!(evaluation.alerts.len(), 1);
        assert!(!evaluation.emergency_requested);
        assert_eq!(f.monitor.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_refire() {
        let f = fixture(vec![water_rule(Severity::Critical)]);

        let first = f.monitor.evaluate(&batch(&f.clock, "water_level", 181.0)).await;
        first.transition.unwrap().await.unwrap().unwrap();
        f.scenes
            .transition(SceneId::Normal, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();

        f.clock.advance(Duration::from_secs(10));
        let second = f.monitor.evaluate(&batch(&f.clock, "water_level", 182.0)).await;
        assert!(second.alerts.is_empty());
        assert!(!second.emergency_requested);

        f.clock.advance(Duration::from_secs(21));
        let third = f.monitor.evaluate(&batch(&f.clock, "water_level", 183.0)).await;
        assert_eq!(third.alerts.len(), 1);
        assert!(third.emergency_requested);
    }

    #[tokio::test]
    async fn test_full_request_queue_does_not_block_evaluation() {
        let clock = Arc::new(ManualClock::new());
        // Coordinator never runs, so its single queue slot stays taken
        let (_coordinator, scenes) = SceneCoordinator::new(
            SceneCoordinatorConfig {
                request_capacity: 1,
                ..SceneCoordinatorConfig::default()
            },
            Arc::new(StaticSceneLoader::new()),
            clock.clone(),
            SceneSnapshot::initial(Utc::now()),
        );
        scenes
            .try_submit(SceneId::Inspection, TransitionOrigin::Manual, TransitionContext::default())
            .unwrap();
        let monitor = ThresholdMonitor::new(
            ThresholdConfig {
                rules: vec![water_rule(Severity::Critical)],
                ..ThresholdConfig::default()
            },
            scenes,
            SharedPreferences::default(),
            clock.clone(),
            NoticeBus::default(),
        );

        let evaluation = tokio::time::timeout(
            Duration::from_secs(1),
            monitor.evaluate(&batch(&clock, "water_level", 181.0)),
        )
        .await
        .expect("evaluation must not wait for queue space");

        assert_eq!(evaluation.alerts.len(), 1);
        assert!(!evaluation.emergency_requested);
        assert_eq!(monitor.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_no_request_when_already_in_emergency() {
        let f = fixture(vec![
            water_rule(Severity::Critical),
            ThresholdRule::new("flow_high", "flow_rate", Comparator::Ge, 9000.0, Severity::Critical),
        ]);

        let first = f.monitor.evaluate(&batch(&f.clock, "water_level", 181.0)).await;
        first.transition.unwrap().await.unwrap().unwrap();

        let second = f.monitor.evaluate(&batch(&f.clock, "flow_rate", 9100.0)).await;
        assert_eq!(second.alerts.len(), 1);
        assert!(!second.emergency_requested);
    }

    #[tokio::test]
    async fn test_preferences_gate_behavior() {
        let f = fixture(vec![water_rule(Severity::Critical)]);

        f.prefs.set_threshold_alerts(false);
        let ignored = f.monitor.evaluate(&batch(&f.clock, "water_level", 181.0)).await;
        assert!(ignored.alerts.is_empty());

        f.prefs.set_threshold_alerts(true);
        f.prefs.set_auto_switch_scenes(false);
        let alert_only = f.monitor.evaluate(&batch(&f.clock, "water_level", 181.0)).await;
        assert_eq!(alert_only.alerts.len(), 1);
        assert!(!alert_only.emergency_requested);
        assert_eq!(f.scenes.current_scene(), SceneId::Normal);
    }

    #[tokio::test]
    async fn test_alert_ring_keeps_last_ten() {
        let rules = (0..12)
            .map(|n| {
                ThresholdRule::new(format!("r{n}"), "vibration", Comparator::Gt, n as f64, Severity::Warning)
            })
            .collect();
        let f = fixture(rules);

        f.monitor.evaluate(&batch(&f.clock, "vibration", 100.0)).await;

        let alerts = f.monitor.alerts();
        assert_eq!(alerts.len(), 10);
        assert_eq!(alerts[0].rule.id, "r2");
        assert_eq!(f.health.snapshot().alerts_fired, 12);
    }

    #[tokio::test]
    async fn test_run_drops_late_batches() {
        let f = fixture(vec![water_rule(Severity::Warning)]);
        let (feed, rx) = f.monitor.feed();
        let shutdown = CancellationToken::new();

        // Queued before the clock jumps: older than the deadline when dequeued.
        assert!(feed.push(vec![MetricSample::new("water_level", 190.0, Utc::now())]));
        f.clock.advance(Duration::from_secs(5));
        drop(feed);

        Arc::clone(&f.monitor).run(rx, shutdown).await;

        assert!(f.monitor.alerts().is_empty());
        assert_eq!(f.health.snapshot().batches_dropped, 1);
    }

    #[tokio::test]
    async fn test_feed_drops_when_full() {
        let f = fixture(Vec::new());
        let (feed, _rx) = f.monitor.feed();

        for _ in 0..DEFAULT_FEED_CAPACITY {
            assert!(feed.push(Vec::new()));
        }
        assert!(!feed.push(Vec::new()));
        assert_eq!(f.health.snapshot().batches_dropped, 1);
    }
}
