//! Control-room runtime orchestrator.
//!
//! This module provides the central runtime that builds every component,
//! spawns the background tasks and owns their shutdown. Collaborators talk
//! to the control room through [`ControlRoomRuntime`] only.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        ControlRoomRuntime                          │
//! │                                                                    │
//! │  MetricFeed ──► ThresholdMonitor ─┐                                │
//! │  AdvisoryFeed ► SuggestionArbiter ┤                                │
//! │  operator ───────────────────────►├──► SceneCoordinator (actor)    │
//! │  PlaylistPlayer ──────────────────┘          │ SceneEvent          │
//! │                                              ▼                     │
//! │  HeartbeatSweeper ─► DisplayRegistry ─► SceneRelay ─► SyncCoordinator ─► DisplaySink
//! │                          DisplayEvent        │                     │
//! │                                              ▼                     │
//! │                                         StateStore                 │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use hydroscene::runtime::{ControlRoomRuntime, RuntimeConfig};
//!
//! let runtime = ControlRoomRuntime::new(config, loader, sink, clock);
//! runtime.transition(SceneId::Dispatch, TransitionOrigin::Manual, context).await?;
//! runtime.shutdown().await;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::health::{ControlHealth, HealthSnapshot, SharedControlHealth};
use crate::clock::SharedClock;
use crate::display::{
    Display, DisplayDescriptor, DisplayEvent, DisplayId, DisplayRegistry, DisplayRegistryConfig,
    HeartbeatSweeper,
};
use crate::error::ControlError;
use crate::layout::{ActiveLayout, Layout, LayoutId, LayoutManager, LayoutSpec};
use crate::notify::{ControlNotice, NoticeBus};
use crate::playlist::{PlaybackStatus, PlaylistPlayer};
use crate::preferences::{Preferences, SharedPreferences};
use crate::scene::{
    SceneCoordinator, SceneCoordinatorConfig, SceneEvent, SceneHandle, SceneId, SceneRegistry,
    SceneSnapshot, SharedLoader, TransitionContext, TransitionOrigin, TransitionRecord,
    TransitionResult,
};
use crate::state::{DurableState, StateStore};
use crate::suggestion::{
    AdvisoryFeed, ArbiterConfig, ArbiterDecision, SuggestionArbiter, SuggestionProposal,
};
use crate::sync::{SceneUpdate, SharedSink, SyncConfig, SyncCoordinator, SyncRegime, SyncState};
use crate::threshold::{MetricFeed, MetricSample, ThresholdAlert, ThresholdConfig, ThresholdMonitor};

/// Default capacity of the advisory push channel.
pub const DEFAULT_ADVISORY_CAPACITY: usize = 16;

/// Configuration for the control-room runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub scenes: SceneCoordinatorConfig,
    /// Preferences used when no saved state exists.
    pub preferences: Preferences,
    pub threshold: ThresholdConfig,
    pub arbiter: ArbiterConfig,
    pub display: DisplayRegistryConfig,
    pub sync: SyncConfig,
    /// Pause a running playlist when a threshold alert commits the emergency scene.
    pub pause_on_emergency: bool,
    /// Durable state location. `None` keeps everything in memory.
    pub state_path: Option<PathBuf>,
    pub advisory_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scenes: SceneCoordinatorConfig::default(),
            preferences: Preferences::default(),
            threshold: ThresholdConfig::default(),
            arbiter: ArbiterConfig::default(),
            display: DisplayRegistryConfig::default(),
            sync: SyncConfig::default(),
            pause_on_emergency: false,
            state_path: None,
            advisory_capacity: DEFAULT_ADVISORY_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Persist durable state at `path`.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }
}

/// The control-room runtime.
///
/// # Lifecycle
///
/// 1. **Creation**: `new()` restores durable state, builds the components
///    and spawns the coordinator, sweeper, relay, monitor and arbiter tasks
/// 2. **Operation**: collaborators call the methods below
/// 3. **Shutdown**: `shutdown()` stops the playlist, cancels every task,
///    waits for them and saves the final state
pub struct ControlRoomRuntime {
    scenes: SceneHandle,
    registry: DisplayRegistry,
    layouts: LayoutManager,
    sync: SyncCoordinator,
    monitor: Arc<ThresholdMonitor>,
    arbiter: Arc<SuggestionArbiter>,
    playlist: PlaylistPlayer,
    preferences: SharedPreferences,
    notices: NoticeBus,
    health: SharedControlHealth,
    metric_feed: MetricFeed,
    advisory_feed: AdvisoryFeed,
    persister: Persister,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_token: CancellationToken,
}

impl ControlRoomRuntime {
    /// Build the runtime and start its background tasks.
    ///
    /// Must be called from within a tokio runtime. An unreadable state file
    /// is logged and the control room starts fresh.
    pub fn new(
        config: RuntimeConfig,
        loader: SharedLoader,
        sink: SharedSink,
        clock: SharedClock,
    ) -> Self {
        info!("Starting control-room runtime");

        let store = config.state_path.clone().map(StateStore::new);
        let restored = match store.as_ref().map(StateStore::load) {
            Some(Ok(state)) => state,
            Some(Err(e)) => {
                warn!(error = %e, "Saved state unusable, starting fresh");
                None
            }
            None => None,
        };

        let notices = NoticeBus::default();
        let health: SharedControlHealth = Arc::new(ControlHealth::new());
        let preferences = SharedPreferences::new(
            restored
                .as_ref()
                .map(|s| s.preferences)
                .unwrap_or(config.preferences),
        );

        let registry = DisplayRegistry::new(config.display.clone(), Arc::clone(&clock));
        let layouts = LayoutManager::new(registry.clone());
        let sync = SyncCoordinator::with_health(
            config.sync.clone(),
            registry.clone(),
            layouts.clone(),
            sink,
            notices.clone(),
            Arc::clone(&health),
        );

        let initial = match &restored {
            Some(state) => {
                if let Some(layout) = state.active_layout.clone() {
                    if let Err(e) = layouts.restore(layout) {
                        warn!(error = %e, "Saved layout could not be restored");
                    }
                }
                sync.restore(state.sync.clone());
                state.snapshot.clone()
            }
            None => SceneSnapshot::initial(clock.wall()),
        };
        // Screens that reconnect before the first commit still get the scene
        sync.seed(
            SceneUpdate::new(initial.current, initial.entered_at)
                .with_layers(SceneRegistry::builtin().get(initial.current).layers()),
        );

        let (coordinator, scenes) =
            SceneCoordinator::new(config.scenes.clone(), loader, Arc::clone(&clock), initial);
        let coordinator = coordinator.with_health(Arc::clone(&health));

        let monitor = Arc::new(
            ThresholdMonitor::new(
                config.threshold.clone(),
                scenes.clone(),
                preferences.clone(),
                Arc::clone(&clock),
                notices.clone(),
            )
            .with_health(Arc::clone(&health)),
        );
        let (metric_feed, metric_rx) = monitor.feed();

        let arbiter = Arc::new(SuggestionArbiter::new(
            config.arbiter.clone(),
            scenes.clone(),
            preferences.clone(),
            notices.clone(),
        ));
        let (advisory_feed, advisory_rx) = SuggestionArbiter::feed(config.advisory_capacity);

        let playlist = PlaylistPlayer::new(scenes.clone());
        let persister = Persister {
            store,
            scenes: scenes.clone(),
            preferences: preferences.clone(),
            layouts: layouts.clone(),
            sync: sync.clone(),
        };

        // Subscribe before any task can publish
        let relay = SceneRelay {
            scene_events: scenes.subscribe(),
            display_events: registry.subscribe(),
            sync: sync.clone(),
            layouts: layouts.clone(),
            playlist: playlist.clone(),
            notices: notices.clone(),
            persister: persister.clone(),
            clock: Arc::clone(&clock),
            pause_on_emergency: config.pause_on_emergency,
        };

        let shutdown_token = CancellationToken::new();
        let mut tasks = Vec::with_capacity(5);

        let token = shutdown_token.clone();
        tasks.push((
            "scene coordinator",
            tokio::spawn(async move { coordinator.run(token).await }),
        ));

        let token = shutdown_token.clone();
        let sweeper = HeartbeatSweeper::new(registry.clone());
        tasks.push((
            "heartbeat sweeper",
            tokio::spawn(async move { sweeper.run(token).await }),
        ));

        let token = shutdown_token.clone();
        tasks.push((
            "scene relay",
            tokio::spawn(async move { relay.run(token).await }),
        ));

        let token = shutdown_token.clone();
        let task_monitor = Arc::clone(&monitor);
        tasks.push((
            "threshold monitor",
            tokio::spawn(async move { task_monitor.run(metric_rx, token).await }),
        ));

        let token = shutdown_token.clone();
        let task_arbiter = Arc::clone(&arbiter);
        tasks.push((
            "suggestion arbiter",
            tokio::spawn(async move { task_arbiter.run(advisory_rx, token).await }),
        ));

        info!(
            scene = %scenes.current_scene(),
            regime = %sync.state().regime,
            restored = restored.is_some(),
            "Control-room runtime started"
        );

        Self {
            scenes,
            registry,
            layouts,
            sync,
            monitor,
            arbiter,
            playlist,
            preferences,
            notices,
            health,
            metric_feed,
            advisory_feed,
            persister,
            tasks,
            shutdown_token,
        }
    }

    // ---------------------------------------------------------------------
    // Scenes
    // ---------------------------------------------------------------------

    /// Request a scene transition and wait for its outcome.
    ///
    /// A request carrying an originating display is checked against the
    /// sync regime first, so a non-master cannot change the scene under
    /// master/slave.
    pub async fn transition(
        &self,
        target: SceneId,
        origin: TransitionOrigin,
        context: TransitionContext,
    ) -> TransitionResult {
        if context.originating_display.is_some() {
            self.sync.authorize(context.originating_display.as_ref())?;
        }
        self.scenes.transition(target, origin, context).await
    }

    /// Return to the previous scene.
    pub async fn revert_to_previous(&self) -> TransitionResult {
        self.scenes.revert_to_previous(TransitionOrigin::Manual).await
    }

    /// The last committed snapshot.
    pub fn snapshot(&self) -> SceneSnapshot {
        self.scenes.current_snapshot()
    }

    /// Handle to the scene coordinator.
    pub fn scenes(&self) -> &SceneHandle {
        &self.scenes
    }

    /// Transition audit trail, oldest first.
    pub fn audit(&self) -> Vec<TransitionRecord> {
        self.scenes.audit()
    }

    // ---------------------------------------------------------------------
    // Displays and layouts
    // ---------------------------------------------------------------------

    pub fn register_display(&self, descriptor: DisplayDescriptor) -> Result<DisplayId, ControlError> {
        self.registry.register_display(descriptor)
    }

    /// Record a heartbeat. Returns true if the display was offline.
    pub fn heartbeat(&self, id: &DisplayId) -> Result<bool, ControlError> {
        self.registry.heartbeat(id)
    }

    pub fn unregister_display(&self, id: &DisplayId) -> Result<Display, ControlError> {
        self.registry.unregister_display(id)
    }

    pub fn displays(&self) -> Vec<Display> {
        self.registry.list()
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    pub fn create_layout(&self, spec: LayoutSpec) -> Result<Layout, ControlError> {
        self.layouts.create_layout(spec)
    }

    /// Activate a layout and persist it.
    pub fn activate_layout(
        &self,
        id: &LayoutId,
        assignment: Vec<DisplayId>,
    ) -> Result<ActiveLayout, ControlError> {
        let active = self.layouts.activate_layout(id, assignment)?;
        self.persister.persist();
        Ok(active)
    }

    /// Put another display into one slot of the active layout and persist.
    pub fn replace_slot(&self, slot: usize, display: DisplayId) -> Result<ActiveLayout, ControlError> {
        let active = self.layouts.replace_slot(slot, display)?;
        self.persister.persist();
        Ok(active)
    }

    pub fn layouts(&self) -> &LayoutManager {
        &self.layouts
    }

    // ---------------------------------------------------------------------
    // Synchronization
    // ---------------------------------------------------------------------

    /// Change the sync regime and persist it.
    pub fn set_sync_regime(
        &self,
        regime: SyncRegime,
        master: Option<DisplayId>,
    ) -> Result<SyncState, ControlError> {
        let state = self.sync.set_sync_regime(regime, master)?;
        self.persister.persist();
        Ok(state)
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    // ---------------------------------------------------------------------
    // Telemetry and suggestions
    // ---------------------------------------------------------------------

    /// Queue a telemetry batch. Returns false if it was dropped.
    pub fn ingest(&self, samples: Vec<MetricSample>) -> bool {
        self.metric_feed.push(samples)
    }

    /// Feed for a telemetry source running on another task.
    pub fn metric_feed(&self) -> MetricFeed {
        self.metric_feed.clone()
    }

    /// Recent threshold alerts, oldest first.
    pub fn alerts(&self) -> Vec<ThresholdAlert> {
        self.monitor.alerts()
    }

    /// Handle a proposal and wait for the arbiter's decision.
    pub async fn submit_suggestion(
        &self,
        proposal: SuggestionProposal,
    ) -> Result<ArbiterDecision, ControlError> {
        self.arbiter.submit(proposal).await
    }

    /// Feed for an advisory service pushing proposals asynchronously.
    pub fn advisory_feed(&self) -> AdvisoryFeed {
        self.advisory_feed.clone()
    }

    pub fn pending_suggestion(&self) -> Option<SuggestionProposal> {
        self.arbiter.pending()
    }

    pub async fn accept_pending(&self) -> TransitionResult {
        self.arbiter.accept_pending().await
    }

    pub fn reject_pending(&self) -> Option<SuggestionProposal> {
        self.arbiter.reject_pending()
    }

    // ---------------------------------------------------------------------
    // Preferences, playlist, notices, health
    // ---------------------------------------------------------------------

    pub fn preferences(&self) -> Preferences {
        self.preferences.snapshot()
    }

    /// Replace the preference flags and persist them.
    pub fn set_preferences(&self, values: Preferences) {
        self.preferences.apply(values);
        info!(
            auto_switch_scenes = values.auto_switch_scenes,
            ai_suggestions = values.ai_suggestions,
            threshold_alerts = values.threshold_alerts,
            "Preferences updated"
        );
        self.persister.persist();
    }

    pub fn playlist(&self) -> &PlaylistPlayer {
        &self.playlist
    }

    /// Subscribe to operator notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<ControlNotice> {
        self.notices.subscribe()
    }

    pub fn health(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Get the shutdown token for external coordination.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Shutdown the runtime gracefully.
    pub async fn shutdown(mut self) {
        info!("Shutting down control-room runtime");

        self.playlist.stop().await;
        self.shutdown_token.cancel();

        for (name, handle) in self.tasks.drain(..) {
            match handle.await {
                Ok(()) => debug!(task = name, "Task stopped"),
                Err(e) => error!(task = name, error = %e, "Task panicked"),
            }
        }

        self.persister.persist();
        info!("Control-room runtime stopped");
    }
}

/// Writes [`DurableState`] after changes. A missing store makes this a no-op.
#[derive(Clone)]
struct Persister {
    store: Option<StateStore>,
    scenes: SceneHandle,
    preferences: SharedPreferences,
    layouts: LayoutManager,
    sync: SyncCoordinator,
}

impl Persister {
    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let state = DurableState::new(
            self.scenes.current_snapshot(),
            self.preferences.snapshot(),
            self.layouts.persisted(),
            self.sync.state(),
        );
        if let Err(e) = store.save(&state) {
            error!(error = %e, "Failed to save control-room state");
        }
    }
}

/// Turns scene and display events into display-wall updates.
struct SceneRelay {
    scene_events: broadcast::Receiver<SceneEvent>,
    display_events: broadcast::Receiver<DisplayEvent>,
    sync: SyncCoordinator,
    layouts: LayoutManager,
    playlist: PlaylistPlayer,
    notices: NoticeBus,
    persister: Persister,
    clock: SharedClock,
    pause_on_emergency: bool,
}

impl SceneRelay {
    async fn run(mut self, shutdown: CancellationToken) {
        info!(pause_on_emergency = self.pause_on_emergency, "Scene relay starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Scene relay shutting down");
                    break;
                }

                event = self.scene_events.recv() => match event {
                    Ok(event) => self.on_scene_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Scene relay lagged behind scene events");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Scene relay stopped (coordinator gone)");
                        break;
                    }
                },

                event = self.display_events.recv() => match event {
                    Ok(event) => self.on_display_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Scene relay lagged behind display events");
                        // Missed liveness changes may have hidden a lost master
                        if self.sync.check_master() {
                            self.persister.persist();
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Scene relay stopped (registry gone)");
                        break;
                    }
                },
            }
        }
    }

    async fn on_scene_event(&self, event: SceneEvent) {
        match event {
            SceneEvent::Committed {
                snapshot,
                origin,
                context,
                scene_context,
            } => {
                let viewport = context.viewport.or(scene_context.viewport);
                let update = SceneUpdate::new(snapshot.current, snapshot.entered_at)
                    .with_viewport(viewport)
                    .with_layers(scene_context.layers)
                    .from_display(context.originating_display);
                self.dispatch(update).await;
                self.persister.persist();

                if self.pause_on_emergency
                    && origin == TransitionOrigin::Threshold
                    && snapshot.current == SceneId::Emergency
                    && self.playlist.state().await.status == PlaybackStatus::Running
                {
                    info!("Emergency committed, pausing playlist");
                    self.playlist.pause().await;
                }
            }
            SceneEvent::Failed {
                target,
                origin,
                reason,
            } => {
                self.notices.publish(ControlNotice::TransitionFailed {
                    target,
                    origin,
                    reason,
                });
            }
            SceneEvent::ViewportChanged {
                snapshot,
                viewport,
                originating_display,
                ..
            } => {
                let update = SceneUpdate::new(snapshot.current, self.clock.wall())
                    .with_viewport(Some(viewport))
                    .from_display(originating_display);
                self.dispatch(update).await;
            }
        }
    }

    async fn dispatch(&self, update: SceneUpdate) {
        let scene = update.scene;
        match self.sync.dispatch(update).await {
            Ok(report) if report.is_inert() => {}
            Ok(report) => {
                debug!(%scene, summary = %report.summary(), "Scene update relayed");
            }
            Err(e) => warn!(%scene, error = %e, "Scene update not relayed"),
        }
    }

    async fn on_display_event(&self, event: DisplayEvent) {
        match event {
            DisplayEvent::WentOffline(id) => {
                self.sync.forget(&id);
                self.notices.publish(ControlNotice::DisplayOffline(id));
                if self.sync.check_master() {
                    self.persister.persist();
                }
            }
            DisplayEvent::Unregistered(id) => {
                debug!(display = %id, "Display unregistered");
                self.sync.forget(&id);
                if self.sync.check_master() {
                    self.persister.persist();
                }
            }
            DisplayEvent::Recovered(id) => {
                self.notices.publish(ControlNotice::DisplayRecovered(id.clone()));
                self.catch_up(&id).await;
            }
            DisplayEvent::Registered(id) => {
                // A wall screen reconnecting under its stable id gets the current state
                if self.layouts.occupies_slot(&id) {
                    self.catch_up(&id).await;
                }
            }
        }
    }

    async fn catch_up(&self, id: &DisplayId) {
        match self.sync.catch_up(id).await {
            Ok(Some(outcome)) => debug!(display = %id, ?outcome, "Resync delivered"),
            Ok(None) => {}
            Err(e) => warn!(display = %id, error = %e, "Resync failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::Resolution;
    use crate::scene::StaticSceneLoader;
    use crate::sync::BroadcastDisplaySink;
    use std::time::Duration;

    fn descriptor(id: &str) -> DisplayDescriptor {
        DisplayDescriptor::new(id.to_uppercase(), Resolution::new(1920, 1080)).with_id(id)
    }

    fn runtime_with(config: RuntimeConfig) -> (ControlRoomRuntime, Arc<BroadcastDisplaySink>) {
        let sink = Arc::new(BroadcastDisplaySink::default());
        let runtime = ControlRoomRuntime::new(
            config,
            Arc::new(StaticSceneLoader::new()),
            Arc::clone(&sink) as SharedSink,
            Arc::new(ManualClock::new()),
        );
        (runtime, sink)
    }

    #[tokio::test]
    async fn test_runtime_creation_and_shutdown() {
        let (runtime, _sink) = runtime_with(RuntimeConfig::default());

        assert!(runtime.scenes().is_running());
        assert_eq!(runtime.snapshot().current, SceneId::Normal);

        tokio::time::timeout(Duration::from_secs(5), runtime.shutdown())
            .await
            .expect("Shutdown should complete within 5 seconds");
    }

    #[tokio::test]
    async fn test_state_restored_after_restart() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = RuntimeConfig::default().with_state_path(temp.path().join("state.json"));

        let (runtime, _sink) = runtime_with(config.clone());
        runtime
            .transition(SceneId::Inspection, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();
        runtime.set_preferences(Preferences {
            ai_suggestions: false,
            ..Preferences::default()
        });
        runtime.shutdown().await;

        let (restarted, _sink) = runtime_with(config);
        let snapshot = restarted.snapshot();
        assert_eq!(snapshot.current, SceneId::Inspection);
        assert_eq!(snapshot.previous, Some(SceneId::Normal));
        assert!(!restarted.preferences().ai_suggestions);
        restarted.shutdown().await;
    }

    #[tokio::test]
    async fn test_non_master_transition_rejected() {
        let (runtime, _sink) = runtime_with(RuntimeConfig::default());
        let master = runtime
            .register_display(descriptor("master"))
            .unwrap();
        let other = runtime
            .register_display(descriptor("other"))
            .unwrap();
        runtime
            .set_sync_regime(SyncRegime::MasterSlave, Some(master.clone()))
            .unwrap();

        let err = runtime
            .transition(
                SceneId::Dispatch,
                TransitionOrigin::Manual,
                TransitionContext::default().from_display(other),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::PermissionDenied { .. }));
        assert_eq!(runtime.snapshot().current, SceneId::Normal);

        runtime
            .transition(
                SceneId::Dispatch,
                TransitionOrigin::Manual,
                TransitionContext::default().from_display(master),
            )
            .await
            .unwrap();
        assert_eq!(runtime.snapshot().current, SceneId::Dispatch);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_master_unregistered_falls_back() {
        let (runtime, _sink) = runtime_with(RuntimeConfig::default());
        let mut notices = runtime.subscribe_notices();
        let master = runtime
            .register_display(descriptor("master"))
            .unwrap();
        runtime
            .set_sync_regime(SyncRegime::MasterSlave, Some(master.clone()))
            .unwrap();

        runtime.unregister_display(&master).unwrap();

        let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(notice, ControlNotice::RegimeFallback { .. }));
        assert_eq!(runtime.sync().state().regime, SyncRegime::Independent);
        runtime.shutdown().await;
    }
}
