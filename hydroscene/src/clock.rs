//! Time sources for liveness and debounce logic.
//!
//! Components that reason about elapsed time (heartbeat sweep, threshold
//! cool-down, batch deadlines) read time through the [`Clock`] trait instead
//! of calling `Instant::now()` directly. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`] forward explicitly so that
//! liveness rules can be checked without sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic time for measuring intervals.
    fn now(&self) -> Instant;

    /// Wall-clock time for timestamps shown to operators or persisted.
    fn wall(&self) -> DateTime<Utc>;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a shared system clock.
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// Both the monotonic and wall readings advance together, so a test that
/// advances by 16 seconds sees 16 seconds pass in both.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<(Instant, DateTime<Utc>)>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a manual clock starting at the current real time.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new((Instant::now(), Utc::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.0 += by;
            guard.1 += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner
            .lock()
            .map(|g| g.0)
            .unwrap_or_else(|_| Instant::now())
    }

    fn wall(&self) -> DateTime<Utc> {
        self.inner.lock().map(|g| g.1).unwrap_or_else(|_| Utc::now())
    }
}
