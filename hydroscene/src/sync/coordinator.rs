//! Synchronization coordinator.
//!
//! Relays scene updates to the displays of the active layout according to
//! the sync regime:
//!
//! | Regime         | Relayed updates                                | Recipients          |
//! |----------------|------------------------------------------------|---------------------|
//! | `independent`  | none                                           | -                   |
//! | `synchronized` | all                                            | online slots        |
//! | `master_slave` | from the master display or from the core       | online slots        |
//!
//! Every online slot is delivered concurrently with its own timeout and
//! retry budget, so a slow screen only delays its own outcome. Offline or
//! unregistered occupants are recorded as gaps and the originating display
//! (which already shows the change) is skipped.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::regime::{SceneUpdate, SyncRegime, SyncState};
use super::sink::SharedSink;
use crate::display::{DisplayId, DisplayRegistry};
use crate::error::ControlError;
use crate::layout::{LayoutManager, SlotState};
use crate::notify::{ControlNotice, NoticeBus};
use crate::runtime::SharedControlHealth;

/// Default per-attempt delivery timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Default retries after the first attempt.
pub const DEFAULT_DELIVERY_RETRIES: u32 = 2;

/// Delivery settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time allowed for one delivery attempt.
    pub delivery_timeout: Duration,
    /// Retries after the first failed attempt.
    pub delivery_retries: u32,
    /// Pause between attempts.
    pub retry_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            delivery_retries: DEFAULT_DELIVERY_RETRIES,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Result of delivering one update to one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The display acknowledged the update.
    Delivered { attempts: u32 },
    /// The slot's display originated the update.
    Skipped,
    /// The slot's display was offline or no longer registered.
    Gap(SlotState),
    /// Every attempt ran out of time.
    TimedOut { attempts: u32 },
    /// The last attempt failed.
    Failed { attempts: u32, reason: String },
}

impl DeliveryOutcome {
    /// Returns true if the display shows the update afterwards.
    pub fn is_updated(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. } | DeliveryOutcome::Skipped)
    }
}

/// Outcome for one slot of the active layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDelivery {
    pub slot: usize,
    pub display: DisplayId,
    pub outcome: DeliveryOutcome,
}

/// Per-display outcomes of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub regime: SyncRegime,
    pub deliveries: Vec<SlotDelivery>,
}

impl DeliveryReport {
    fn inert(regime: SyncRegime) -> Self {
        Self {
            regime,
            deliveries: Vec::new(),
        }
    }

    /// Slots that show the update.
    pub fn updated(&self) -> usize {
        self.deliveries.iter().filter(|d| d.outcome.is_updated()).count()
    }

    /// Slots skipped because their display was unreachable.
    pub fn gaps(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| matches!(d.outcome, DeliveryOutcome::Gap(_)))
            .count()
    }

    /// Slots where delivery timed out or failed.
    pub fn failures(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| {
                matches!(
                    d.outcome,
                    DeliveryOutcome::TimedOut { .. } | DeliveryOutcome::Failed { .. }
                )
            })
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.updated() == self.deliveries.len()
    }

    /// Returns true if nothing was attempted (independent regime).
    pub fn is_inert(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Operator-facing summary, e.g. "3/4 screens updated".
    pub fn summary(&self) -> String {
        format!("{}/{} screens updated", self.updated(), self.deliveries.len())
    }
}

struct Inner {
    config: SyncConfig,
    registry: DisplayRegistry,
    layouts: LayoutManager,
    sink: SharedSink,
    notices: NoticeBus,
    health: Option<SharedControlHealth>,
    state: RwLock<SyncState>,
    last_update: RwLock<Option<SceneUpdate>>,
    /// Displays known to show `last_update`.
    in_sync: RwLock<HashSet<DisplayId>>,
}

/// Relays scene updates to the display wall.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        registry: DisplayRegistry,
        layouts: LayoutManager,
        sink: SharedSink,
        notices: NoticeBus,
    ) -> Self {
        Self::build(config, registry, layouts, sink, notices, None)
    }

    /// Same as [`SyncCoordinator::new`] with delivery counters recorded.
    pub fn with_health(
        config: SyncConfig,
        registry: DisplayRegistry,
        layouts: LayoutManager,
        sink: SharedSink,
        notices: NoticeBus,
        health: SharedControlHealth,
    ) -> Self {
        Self::build(config, registry, layouts, sink, notices, Some(health))
    }

    fn build(
        config: SyncConfig,
        registry: DisplayRegistry,
        layouts: LayoutManager,
        sink: SharedSink,
        notices: NoticeBus,
        health: Option<SharedControlHealth>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                layouts,
                sink,
                notices,
                health,
                state: RwLock::new(SyncState::default()),
                last_update: RwLock::new(None),
                in_sync: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Change the sync regime.
    ///
    /// Master/slave requires a registered, online master. Other regimes
    /// ignore `master`.
    pub fn set_sync_regime(
        &self,
        regime: SyncRegime,
        master: Option<DisplayId>,
    ) -> Result<SyncState, ControlError> {
        let master = match regime {
            SyncRegime::MasterSlave => {
                let master = master.ok_or_else(|| {
                    ControlError::validation("master_slave regime requires a master display")
                })?;
                let display = self
                    .inner
                    .registry
                    .get(&master)
                    .ok_or_else(|| ControlError::DisplayNotFound(master.clone()))?;
                if !display.is_online() {
                    return Err(ControlError::validation(format!(
                        "master display '{master}' is offline"
                    )));
                }
                Some(master)
            }
            SyncRegime::Independent | SyncRegime::Synchronized => None,
        };

        let state = SyncState { regime, master };
        if let Ok(mut current) = self.inner.state.write() {
            *current = state.clone();
        }
        info!(regime = %state.regime, master = ?state.master, "Sync regime set");
        Ok(state)
    }

    /// Reinstall a persisted regime without checking the master.
    ///
    /// A master that does not come back online triggers the usual fallback
    /// at the next dispatch or liveness change.
    pub fn restore(&self, state: SyncState) {
        info!(regime = %state.regime, master = ?state.master, "Sync regime restored");
        if let Ok(mut current) = self.inner.state.write() {
            *current = state;
        }
    }

    pub fn state(&self) -> SyncState {
        self.inner.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Fall back to independent if the master is no longer online.
    ///
    /// Returns true if the regime changed.
    pub fn check_master(&self) -> bool {
        let lost = {
            let Ok(mut state) = self.inner.state.write() else {
                return false;
            };
            let master_online = state
                .master
                .as_ref()
                .is_some_and(|m| self.inner.registry.is_online(m));
            if state.regime == SyncRegime::MasterSlave && !master_online {
                let lost = state.master.take();
                state.regime = SyncRegime::Independent;
                Some(lost)
            } else {
                None
            }
        };

        match lost {
            Some(master) => {
                let master = master.unwrap_or_else(|| DisplayId::new("<none>"));
                let reason = if self.inner.registry.contains(&master) {
                    "master display went offline"
                } else {
                    "master display is no longer registered"
                };
                warn!(%master, reason, "Sync regime fell back to independent");
                self.inner.notices.publish(ControlNotice::RegimeFallback {
                    master,
                    reason: reason.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// Reject updates from anyone but the master under master/slave.
    ///
    /// Updates without an originating display come from the core and are
    /// always allowed.
    pub fn authorize(&self, origin: Option<&DisplayId>) -> Result<(), ControlError> {
        self.check_master();
        let state = self.state();
        match (state.regime, state.master, origin) {
            (SyncRegime::MasterSlave, Some(master), Some(origin)) if *origin != master => {
                Err(ControlError::PermissionDenied {
                    display: origin.clone(),
                    master,
                })
            }
            _ => Ok(()),
        }
    }

    /// Deliver an update to every slot of the active layout.
    pub async fn dispatch(&self, update: SceneUpdate) -> Result<DeliveryReport, ControlError> {
        self.authorize(update.originating_display.as_ref())?;

        if let Ok(mut last) = self.inner.last_update.write() {
            *last = Some(update.clone());
        }
        if let Ok(mut in_sync) = self.inner.in_sync.write() {
            in_sync.clear();
        }

        let regime = self.state().regime;
        if regime == SyncRegime::Independent {
            debug!(scene = %update.scene, "Independent regime, update not relayed");
            return Ok(DeliveryReport::inert(regime));
        }

        let targets = self.inner.layouts.targets();
        let deliveries = join_all(targets.into_iter().map(|target| {
            let update = &update;
            async move {
                let outcome = if update.originating_display.as_ref() == Some(&target.display) {
                    DeliveryOutcome::Skipped
                } else if target.state != SlotState::Online {
                    DeliveryOutcome::Gap(target.state)
                } else {
                    self.deliver_one(&target.display, update).await
                };
                SlotDelivery {
                    slot: target.slot,
                    display: target.display,
                    outcome,
                }
            }
        }))
        .await;

        if let Ok(mut in_sync) = self.inner.in_sync.write() {
            *in_sync = deliveries
                .iter()
                .filter(|d| d.outcome.is_updated())
                .map(|d| d.display.clone())
                .collect();
        }

        let report = DeliveryReport { regime, deliveries };
        self.record(&update, &report);
        Ok(report)
    }

    /// Send the last relayed state to one display.
    ///
    /// Returns `None` when there is nothing to send or the regime is
    /// independent.
    pub async fn resync(&self, display_id: &DisplayId) -> Result<Option<DeliveryOutcome>, ControlError> {
        if !self.inner.registry.contains(display_id) {
            return Err(ControlError::DisplayNotFound(display_id.clone()));
        }
        if self.state().regime == SyncRegime::Independent {
            return Ok(None);
        }
        let last = self.last_update();
        let Some(update) = last else {
            return Ok(None);
        };

        let update = update.from_display(None);
        let outcome = self.deliver_one(display_id, &update).await;
        if outcome.is_updated() {
            if let Ok(mut in_sync) = self.inner.in_sync.write() {
                in_sync.insert(display_id.clone());
            }
        }
        info!(display = %display_id, scene = %update.scene, outcome = ?outcome, "Display resynchronized");
        Ok(Some(outcome))
    }

    /// Resync a display unless it already shows the last relayed state.
    pub async fn catch_up(&self, display_id: &DisplayId) -> Result<Option<DeliveryOutcome>, ControlError> {
        if self.is_in_sync(display_id) {
            debug!(display = %display_id, "Display already shows the last update");
            return Ok(None);
        }
        self.resync(display_id).await
    }

    /// Returns true if the display acknowledged (or originated) the last update.
    pub fn is_in_sync(&self, display_id: &DisplayId) -> bool {
        self.inner
            .in_sync
            .read()
            .map(|s| s.contains(display_id))
            .unwrap_or(false)
    }

    /// Stop assuming a display shows the last update.
    ///
    /// Called when it goes offline or unregisters.
    pub fn forget(&self, display_id: &DisplayId) {
        if let Ok(mut in_sync) = self.inner.in_sync.write() {
            in_sync.remove(display_id);
        }
    }

    /// Install the state displays should show before anything is dispatched.
    ///
    /// Ignored once an update has been dispatched.
    pub fn seed(&self, update: SceneUpdate) {
        if let Ok(mut last) = self.inner.last_update.write() {
            if last.is_none() {
                debug!(scene = %update.scene, "Sync state seeded");
                *last = Some(update);
            }
        }
    }

    /// The last update handed to [`SyncCoordinator::dispatch`].
    pub fn last_update(&self) -> Option<SceneUpdate> {
        self.inner.last_update.read().ok().and_then(|u| u.clone())
    }

    async fn deliver_one(&self, display_id: &DisplayId, update: &SceneUpdate) -> DeliveryOutcome {
        let config = &self.inner.config;
        let max_attempts = config.delivery_retries + 1;
        let mut outcome = DeliveryOutcome::Gap(SlotState::Missing);

        for attempt in 1..=max_attempts {
            // Unregistration and liveness changes take effect before every attempt.
            match self.inner.registry.get(display_id) {
                None => return DeliveryOutcome::Gap(SlotState::Missing),
                Some(d) if !d.is_online() => return DeliveryOutcome::Gap(SlotState::Offline),
                Some(_) => {}
            }

            outcome = match tokio::time::timeout(
                config.delivery_timeout,
                self.inner.sink.deliver(display_id, update),
            )
            .await
            {
                Ok(Ok(())) => return DeliveryOutcome::Delivered { attempts: attempt },
                Ok(Err(e)) => DeliveryOutcome::Failed {
                    attempts: attempt,
                    reason: e.to_string(),
                },
                Err(_) => DeliveryOutcome::TimedOut { attempts: attempt },
            };

            debug!(display = %display_id, attempt, outcome = ?outcome, "Delivery attempt failed");
            if attempt < max_attempts && !config.retry_backoff.is_zero() {
                tokio::time::sleep(config.retry_backoff).await;
            }
        }

        outcome
    }

    fn record(&self, update: &SceneUpdate, report: &DeliveryReport) {
        if let Some(health) = &self.inner.health {
            health.dispatch_finished(report.updated(), report.gaps(), report.failures());
        }

        if report.is_complete() {
            info!(scene = %update.scene, regime = %report.regime, summary = %report.summary(), "Scene update delivered");
        } else {
            warn!(
                scene = %update.scene,
                regime = %report.regime,
                summary = %report.summary(),
                gaps = report.gaps(),
                failures = report.failures(),
                "Scene update incomplete"
            );
            self.inner.notices.publish(ControlNotice::DeliveryIncomplete {
                scene: update.scene,
                summary: report.summary(),
            });
        }
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}
