//! Display registry and heartbeat tracking.
//!
//! Displays connect, register a descriptor and then send heartbeats. The
//! registry never lets callers set a status: [`DisplayRegistry::sweep`]
//! flips displays whose last heartbeat is older than the timeout to
//! offline, and the next heartbeat brings them back online. Offline
//! displays stay registered so they keep their layout slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::types::{Display, DisplayDescriptor, DisplayId, DisplayStatus, WILDCARD_CAPABILITY};
use crate::clock::SharedClock;
use crate::error::ControlError;

/// Default heartbeat timeout.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default sweep period.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Liveness settings.
#[derive(Debug, Clone)]
pub struct DisplayRegistryConfig {
    /// A display whose last heartbeat is older than this goes offline.
    pub heartbeat_timeout: Duration,
    /// Period of the background sweep; must be shorter than the timeout.
    pub sweep_interval: Duration,
}

impl Default for DisplayRegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Registry membership and liveness changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Registered(DisplayId),
    WentOffline(DisplayId),
    Recovered(DisplayId),
    Unregistered(DisplayId),
}

struct Inner {
    displays: RwLock<HashMap<DisplayId, Display>>,
    config: DisplayRegistryConfig,
    clock: SharedClock,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<DisplayEvent>,
}

/// Shared registry of connected displays.
///
/// Cloning is cheap; all clones see the same displays.
#[derive(Clone)]
pub struct DisplayRegistry {
    inner: Arc<Inner>,
}

impl DisplayRegistry {
    /// Create an empty registry.
    pub fn new(config: DisplayRegistryConfig, clock: SharedClock) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                displays: RwLock::new(HashMap::new()),
                config,
                clock,
                next_id: AtomicU64::new(1),
                event_tx,
            }),
        }
    }

    /// Liveness settings in effect.
    pub fn config(&self) -> &DisplayRegistryConfig {
        &self.inner.config
    }

    /// Register a display. It starts online with a fresh heartbeat.
    pub fn register_display(&self, descriptor: DisplayDescriptor) -> Result<DisplayId, ControlError> {
        if descriptor.name.trim().is_empty() {
            return Err(ControlError::validation("display name must not be empty"));
        }
        if descriptor.resolution.width == 0 || descriptor.resolution.height == 0 {
            return Err(ControlError::validation(format!(
                "display '{}' has zero resolution",
                descriptor.name
            )));
        }
        if let Some(requested) = &descriptor.id {
            let requested = requested.trim();
            if requested.is_empty() || requested == WILDCARD_CAPABILITY {
                return Err(ControlError::validation(format!(
                    "invalid display id '{requested}'"
                )));
            }
        }

        let mut displays = self
            .inner
            .displays
            .write()
            .map_err(|_| ControlError::validation("display registry unavailable"))?;

        let id = match &descriptor.id {
            Some(requested) => {
                let id = DisplayId::new(requested.trim());
                if displays.contains_key(&id) {
                    return Err(ControlError::validation(format!(
                        "display id '{id}' is already registered"
                    )));
                }
                id
            }
            None => loop {
                let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let candidate = DisplayId::new(format!("display-{n}"));
                if !displays.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let entry = Display {
            id: id.clone(),
            name: descriptor.name,
            resolution: descriptor.resolution,
            capabilities: descriptor.capabilities,
            status: DisplayStatus::Online,
            last_heartbeat: self.inner.clock.now(),
            registered_at: self.inner.clock.wall(),
        };

        info!(
            display = %id,
            name = %entry.name,
            resolution = %entry.resolution,
            capabilities = ?entry.capabilities,
            "Display registered"
        );

        displays.insert(id.clone(), entry);
        drop(displays);

        let _ = self.inner.event_tx.send(DisplayEvent::Registered(id.clone()));
        Ok(id)
    }

    /// Record a heartbeat.
    ///
    /// Returns `true` if the display was offline and is now back online.
    pub fn heartbeat(&self, id: &DisplayId) -> Result<bool, ControlError> {
        let recovered = {
            let mut displays = self
                .inner
                .displays
                .write()
                .map_err(|_| ControlError::DisplayNotFound(id.clone()))?;
            let display = displays
                .get_mut(id)
                .ok_or_else(|| ControlError::DisplayNotFound(id.clone()))?;

            display.last_heartbeat = self.inner.clock.now();
            let recovered = display.status == DisplayStatus::Offline;
            display.status = DisplayStatus::Online;
            recovered
        };

        if recovered {
            info!(display = %id, "Display recovered");
            let _ = self.inner.event_tx.send(DisplayEvent::Recovered(id.clone()));
        }
        Ok(recovered)
    }

    /// Remove a display immediately.
    pub fn unregister_display(&self, id: &DisplayId) -> Result<Display, ControlError> {
        let removed = self
            .inner
            .displays
            .write()
            .ok()
            .and_then(|mut displays| displays.remove(id))
            .ok_or_else(|| ControlError::DisplayNotFound(id.clone()))?;

        info!(display = %id, "Display unregistered");
        let _ = self.inner.event_tx.send(DisplayEvent::Unregistered(id.clone()));
        Ok(removed)
    }

    /// Flip every display with a stale heartbeat to offline.
    ///
    /// Returns the ids that changed status in this sweep.
    pub fn sweep(&self) -> Vec<DisplayId> {
        let now = self.inner.clock.now();
        let timeout = self.inner.config.heartbeat_timeout;

        let flipped: Vec<DisplayId> = match self.inner.displays.write() {
            Ok(mut displays) => displays
                .values_mut()
                .filter(|d| d.status == DisplayStatus::Online)
                .filter(|d| now.saturating_duration_since(d.last_heartbeat) > timeout)
                .map(|d| {
                    d.status = DisplayStatus::Offline;
                    d.id.clone()
                })
                .collect(),
            Err(_) => Vec::new(),
        };

        for id in &flipped {
            warn!(display = %id, timeout_secs = timeout.as_secs(), "Display missed heartbeat, marked offline");
            let _ = self.inner.event_tx.send(DisplayEvent::WentOffline(id.clone()));
        }
        if flipped.is_empty() {
            debug!(displays = self.len(), "Heartbeat sweep: all displays current");
        }
        flipped
    }

    /// Look up a display.
    pub fn get(&self, id: &DisplayId) -> Option<Display> {
        self.inner
            .displays
            .read()
            .ok()
            .and_then(|d| d.get(id).cloned())
    }

    /// Returns true if the display is registered.
    pub fn contains(&self, id: &DisplayId) -> bool {
        self.inner
            .displays
            .read()
            .map(|d| d.contains_key(id))
            .unwrap_or(false)
    }

    /// Returns true if the display is registered and online.
    pub fn is_online(&self, id: &DisplayId) -> bool {
        self.inner
            .displays
            .read()
            .map(|d| d.get(id).is_some_and(Display::is_online))
            .unwrap_or(false)
    }

    /// All displays, sorted by id.
    pub fn list(&self) -> Vec<Display> {
        let mut displays: Vec<Display> = self
            .inner
            .displays
            .read()
            .map(|d| d.values().cloned().collect())
            .unwrap_or_default();
        displays.sort_by(|a, b| a.id.cmp(&b.id));
        displays
    }

    pub fn len(&self) -> usize {
        self.inner.displays.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to membership and liveness changes.
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.inner.event_tx.subscribe()
    }
}

impl std::fmt::Debug for DisplayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayRegistry")
            .field("displays", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}
