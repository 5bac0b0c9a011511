//! Runtime health monitoring.
//!
//! Atomic counters updated by the scene coordinator, threshold monitor and
//! synchronization coordinator, summarized into a [`HealthSnapshot`] for the
//! operator console.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Consecutive failed transitions before the runtime reports critical.
const CRITICAL_CONSECUTIVE_FAILURES: u64 = 3;

/// Health status of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Transitions commit and the last broadcast reached every screen.
    Healthy,
    /// The last broadcast missed at least one screen.
    Degraded,
    /// A recent transition failed but the scene machine is still usable.
    Recovering,
    /// Several transitions in a row failed.
    Critical,
}

impl HealthStatus {
    /// Returns a string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Recovering => "recovering",
            HealthStatus::Critical => "critical",
        }
    }
}

/// A point-in-time snapshot of runtime health.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    /// Current health status.
    pub status: HealthStatus,
    /// Transitions that changed the scene.
    pub transitions_committed: u64,
    /// Transitions rolled back after an initializer failure or timeout.
    pub transitions_failed: u64,
    /// Requests that targeted the current scene.
    pub transitions_unchanged: u64,
    /// Threshold alerts recorded.
    pub alerts_fired: u64,
    /// Metric batches dropped (feed full or past deadline).
    pub batches_dropped: u64,
    /// Per-display deliveries acknowledged.
    pub deliveries_completed: u64,
    /// Slots skipped because their display was offline or gone.
    pub delivery_gaps: u64,
    /// Per-display deliveries that timed out or failed after retries.
    pub delivery_failures: u64,
    /// Time since the last committed transition.
    pub time_since_last_commit: Option<Duration>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            status: HealthStatus::Healthy,
            transitions_committed: 0,
            transitions_failed: 0,
            transitions_unchanged: 0,
            alerts_fired: 0,
            batches_dropped: 0,
            deliveries_completed: 0,
            delivery_gaps: 0,
            delivery_failures: 0,
            time_since_last_commit: None,
        }
    }
}

/// Control-room health monitor with atomic counters.
pub struct ControlHealth {
    transitions_committed: AtomicU64,
    transitions_failed: AtomicU64,
    transitions_unchanged: AtomicU64,
    consecutive_failures: AtomicU64,
    alerts_fired: AtomicU64,
    batches_dropped: AtomicU64,
    deliveries_completed: AtomicU64,
    delivery_gaps: AtomicU64,
    delivery_failures: AtomicU64,
    last_dispatch_incomplete: AtomicBool,
    start_time: Instant,
    /// Micros since `start_time` plus one; zero means never.
    last_commit_micros: AtomicU64,
}

impl Default for ControlHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlHealth {
    /// Create a new health monitor.
    pub fn new() -> Self {
        Self {
            transitions_committed: AtomicU64::new(0),
            transitions_failed: AtomicU64::new(0),
            transitions_unchanged: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            alerts_fired: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
            deliveries_completed: AtomicU64::new(0),
            delivery_gaps: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            last_dispatch_incomplete: AtomicBool::new(false),
            start_time: Instant::now(),
            last_commit_micros: AtomicU64::new(0),
        }
    }

    /// Record a committed transition.
    pub fn transition_committed(&self) {
        self.transitions_committed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let elapsed = self.start_time.elapsed().as_micros() as u64 + 1;
        self.last_commit_micros.store(elapsed, Ordering::Relaxed);
    }

    /// Record a rolled-back transition.
    pub fn transition_failed(&self) {
        self.transitions_failed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request for the scene already shown.
    pub fn transition_unchanged(&self) {
        self.transitions_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    /// Record threshold alerts.
    pub fn alerts_fired(&self, count: usize) {
        self.alerts_fired.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a dropped metric batch.
    pub fn batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one broadcast.
    pub fn dispatch_finished(&self, delivered: usize, gaps: usize, failures: usize) {
        self.deliveries_completed
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_gaps.fetch_add(gaps as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
        self.last_dispatch_incomplete
            .store(gaps + failures > 0, Ordering::Relaxed);
    }

    /// Get a snapshot of current health.
    pub fn snapshot(&self) -> HealthSnapshot {
        let consecutive_failures = self.consecutive_failures.load(Ordering::Relaxed);
        let incomplete = self.last_dispatch_incomplete.load(Ordering::Relaxed);

        let last_commit_micros = self.last_commit_micros.load(Ordering::Relaxed);
        let time_since_last_commit = if last_commit_micros > 0 {
            let now_micros = self.start_time.elapsed().as_micros() as u64;
            Some(Duration::from_micros(
                now_micros.saturating_sub(last_commit_micros.saturating_sub(1)),
            ))
        } else {
            None
        };

        let status = if consecutive_failures >= CRITICAL_CONSECUTIVE_FAILURES {
            HealthStatus::Critical
        } else if consecutive_failures > 0 {
            HealthStatus::Recovering
        } else if incomplete {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthSnapshot {
            status,
            transitions_committed: self.transitions_committed.load(Ordering::Relaxed),
            transitions_failed: self.transitions_failed.load(Ordering::Relaxed),
            transitions_unchanged: self.transitions_unchanged.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            deliveries_completed: self.deliveries_completed.load(Ordering::Relaxed),
            delivery_gaps: self.delivery_gaps.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            time_since_last_commit,
        }
    }
}

/// Shared health monitor.
pub type SharedControlHealth = Arc<ControlHealth>;
