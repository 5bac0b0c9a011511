//! Scene state machine.
//!
//! [`SceneCoordinator`] is the single owner of the [`SceneSnapshot`]. It runs
//! as a background task and drains a bounded queue of [`TransitionRequest`]s
//! one at a time, so two transitions can never interleave or commit out of
//! order. [`SceneHandle`] is the only way to reach it.
//!
//! # Transition sequence
//!
//! ```text
//! request ──► target == current? ──yes──► Unchanged (no initializer, entered_at kept)
//!                    │ no
//!                    ▼
//!        publish snapshot with transition_in_progress = true
//!                    │
//!                    ▼
//!        run loader under initializer timeout
//!           │ ok                      │ error / timeout
//!           ▼                         ▼
//!   commit current/previous     republish pre-attempt snapshot
//!   SceneEvent::Committed       SceneEvent::Failed
//! ```
//!
//! Requests that arrive while an initializer is running wait in the queue.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::loader::{SceneContext, SharedLoader};
use super::request::{
    TransitionContext, TransitionOrigin, TransitionOutcome, TransitionRequest, TransitionResult,
};
use super::snapshot::SceneSnapshot;
use super::types::{SceneId, SceneRegistry, Viewport};
use crate::clock::SharedClock;
use crate::display::DisplayId;
use crate::error::ControlError;
use crate::runtime::SharedControlHealth;

/// Default capacity of the transition request queue.
pub const DEFAULT_REQUEST_CAPACITY: usize = 32;

/// Default time allowed for a scene initializer.
pub const DEFAULT_INITIALIZER_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of audit records kept.
pub const DEFAULT_AUDIT_CAPACITY: usize = 256;

/// Configuration for the scene coordinator.
#[derive(Debug, Clone)]
pub struct SceneCoordinatorConfig {
    /// Capacity of the request queue.
    pub request_capacity: usize,
    /// Time allowed for the loader before the transition fails.
    pub initializer_timeout: Duration,
    /// Number of audit records retained (oldest evicted).
    pub audit_capacity: usize,
    /// Capacity of the scene event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SceneCoordinatorConfig {
    fn default() -> Self {
        Self {
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            initializer_timeout: DEFAULT_INITIALIZER_TIMEOUT,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            event_capacity: 64,
        }
    }
}

/// Events published by the coordinator.
#[derive(Debug, Clone)]
pub enum SceneEvent {
    /// A transition committed.
    Committed {
        /// The new snapshot.
        snapshot: SceneSnapshot,
        /// Who asked for it.
        origin: TransitionOrigin,
        /// Context supplied with the request.
        context: TransitionContext,
        /// Data produced by the scene initializer.
        scene_context: SceneContext,
    },
    /// A transition failed and was rolled back.
    Failed {
        /// Scene the transition aimed for.
        target: SceneId,
        /// Who asked for it.
        origin: TransitionOrigin,
        /// Failure cause.
        reason: String,
    },
    /// A request targeted the current scene but carried a new viewport.
    ViewportChanged {
        /// The unchanged snapshot.
        snapshot: SceneSnapshot,
        /// Who asked for it.
        origin: TransitionOrigin,
        /// The requested viewport.
        viewport: Viewport,
        /// Display that initiated the change, if any.
        originating_display: Option<DisplayId>,
    },
}

/// How a recorded transition request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Scene changed.
    Committed,
    /// Target was already current.
    Unchanged,
    /// Initializer failed; snapshot rolled back.
    Failed(String),
}

/// One line of the transition audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Scene before the request.
    pub from: SceneId,
    /// Requested scene.
    pub target: SceneId,
    /// Trigger source.
    pub origin: TransitionOrigin,
    /// When the request was created.
    pub requested_at: DateTime<Utc>,
    /// When the coordinator finished with it.
    pub completed_at: DateTime<Utc>,
    /// Result.
    pub outcome: RecordOutcome,
}

type AuditLog = Arc<RwLock<VecDeque<TransitionRecord>>>;

/// Single-writer owner of the scene snapshot.
pub struct SceneCoordinator {
    config: SceneCoordinatorConfig,
    registry: SceneRegistry,
    loader: SharedLoader,
    clock: SharedClock,
    request_rx: mpsc::Receiver<TransitionRequest>,
    snapshot_tx: watch::Sender<SceneSnapshot>,
    event_tx: broadcast::Sender<SceneEvent>,
    audit: AuditLog,
    health: Option<SharedControlHealth>,
}

impl SceneCoordinator {
    /// Create a coordinator and the handle used to reach it.
    ///
    /// `initial` is the snapshot to start from: `SceneSnapshot::initial` on a
    /// fresh start, or the persisted snapshot after a restart.
    pub fn new(
        config: SceneCoordinatorConfig,
        loader: SharedLoader,
        clock: SharedClock,
        initial: SceneSnapshot,
    ) -> (Self, SceneHandle) {
        let (request_tx, request_rx) = mpsc::channel(config.request_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.stable());
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let audit: AuditLog = Arc::new(RwLock::new(VecDeque::with_capacity(
            config.audit_capacity.min(1024),
        )));

        let handle = SceneHandle {
            request_tx,
            snapshot_rx,
            event_tx: event_tx.clone(),
            audit: Arc::clone(&audit),
            clock: Arc::clone(&clock),
        };

        let coordinator = Self {
            config,
            registry: SceneRegistry::builtin(),
            loader,
            clock,
            request_rx,
            snapshot_tx,
            event_tx,
            audit,
            health: None,
        };

        (coordinator, handle)
    }

    /// Record transition counters into the shared health monitor.
    pub fn with_health(mut self, health: SharedControlHealth) -> Self {
        self.health = Some(health);
        self
    }

    /// Process requests until shutdown is signalled or every handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            scene = %self.snapshot_tx.borrow().current,
            initializer_timeout_ms = self.config.initializer_timeout.as_millis() as u64,
            "Scene coordinator starting"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Scene coordinator shutting down");
                    break;
                }

                request = self.request_rx.recv() => {
                    match request {
                        Some(request) => self.handle_request(request).await,
                        None => {
                            debug!("Scene coordinator stopped (all handles dropped)");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Handle one request inside the critical section.
    async fn handle_request(&mut self, mut request: TransitionRequest) {
        let current = self.snapshot_tx.borrow().stable();
        let target = request.target;
        let origin = request.origin;

        if target == current.current {
            debug!(scene = %target, %origin, "Transition target already current");
            self.record(&request, current.current, RecordOutcome::Unchanged);
            if let Some(health) = &self.health {
                health.transition_unchanged();
            }
            if let Some(viewport) = request.context.viewport {
                let _ = self.event_tx.send(SceneEvent::ViewportChanged {
                    snapshot: current.clone(),
                    origin,
                    viewport,
                    originating_display: request.context.originating_display.clone(),
                });
            }
            request.respond(Ok(TransitionOutcome::Unchanged(current)));
            return;
        }

        info!(
            from = %current.current,
            to = %target,
            %origin,
            reason = request.context.reason.as_deref().unwrap_or(""),
            "Scene transition started"
        );
        self.snapshot_tx.send_replace(current.transitioning());

        let scene = self.registry.get(target);
        let loaded = tokio::time::timeout(self.config.initializer_timeout, self.loader.load(scene))
            .await;

        let result = match loaded {
            Ok(Ok(scene_context)) => Ok(scene_context),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "initializer timed out after {}ms",
                self.config.initializer_timeout.as_millis()
            )),
        };

        match result {
            Ok(scene_context) => {
                let committed = current.committed(target, self.clock.wall());
                self.snapshot_tx.send_replace(committed.clone());

                info!(
                    scene = %committed.current,
                    previous = %current.current,
                    %origin,
                    "Scene transition committed"
                );

                self.record(&request, current.current, RecordOutcome::Committed);
                if let Some(health) = &self.health {
                    health.transition_committed();
                }
                let _ = self.event_tx.send(SceneEvent::Committed {
                    snapshot: committed.clone(),
                    origin,
                    context: request.context.clone(),
                    scene_context,
                });
                request.respond(Ok(TransitionOutcome::Committed(committed)));
            }
            Err(reason) => {
                // Roll back: observers see the pre-attempt snapshot again.
                self.snapshot_tx.send_replace(current.clone());

                warn!(
                    scene = %current.current,
                    target = %target,
                    %origin,
                    reason = %reason,
                    "Scene transition failed, rolled back"
                );

                self.record(&request, current.current, RecordOutcome::Failed(reason.clone()));
                if let Some(health) = &self.health {
                    health.transition_failed();
                }
                let _ = self.event_tx.send(SceneEvent::Failed {
                    target,
                    origin,
                    reason: reason.clone(),
                });
                request.respond(Err(ControlError::TransitionFailed { target, reason }));
            }
        }
    }

    fn record(&self, request: &TransitionRequest, from: SceneId, outcome: RecordOutcome) {
        if self.config.audit_capacity == 0 {
            return;
        }
        if let Ok(mut audit) = self.audit.write() {
            if audit.len() >= self.config.audit_capacity {
                audit.pop_front();
            }
            audit.push_back(TransitionRecord {
                from,
                target: request.target,
                origin: request.origin,
                requested_at: request.requested_at,
                completed_at: self.clock.wall(),
                outcome,
            });
        }
    }
}

/// Cloneable entry point to the scene coordinator.
///
/// This is the single transition entry point shared by the operator console,
/// the threshold monitor, the suggestion arbiter and the playlist player.
#[derive(Clone)]
pub struct SceneHandle {
    request_tx: mpsc::Sender<TransitionRequest>,
    snapshot_rx: watch::Receiver<SceneSnapshot>,
    event_tx: broadcast::Sender<SceneEvent>,
    audit: AuditLog,
    clock: SharedClock,
}

impl SceneHandle {
    /// Queue a transition and return the receiver for its result.
    ///
    /// Waits for queue space if the coordinator is backed up.
    pub async fn submit(
        &self,
        target: SceneId,
        origin: TransitionOrigin,
        context: TransitionContext,
    ) -> Result<oneshot::Receiver<TransitionResult>, ControlError> {
        let (request, rx) = TransitionRequest::new(target, origin, context, self.clock.wall());
        self.request_tx
            .send(request)
            .await
            .map_err(|_| ControlError::Unavailable)?;
        Ok(rx)
    }

    /// Queue a transition without waiting for queue space.
    ///
    /// Fails with [`ControlError::Busy`] when the queue is full.
    pub fn try_submit(
        &self,
        target: SceneId,
        origin: TransitionOrigin,
        context: TransitionContext,
    ) -> Result<oneshot::Receiver<TransitionResult>, ControlError> {
        let (request, rx) = TransitionRequest::new(target, origin, context, self.clock.wall());
        self.request_tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => ControlError::Busy,
            TrySendError::Closed(_) => ControlError::Unavailable,
        })?;
        Ok(rx)
    }

    /// Request a transition and wait for it to commit, fail, or no-op.
    pub async fn transition(
        &self,
        target: SceneId,
        origin: TransitionOrigin,
        context: TransitionContext,
    ) -> TransitionResult {
        let rx = self.submit(target, origin, context).await?;
        rx.await.map_err(|_| ControlError::Unavailable)?
    }

    /// Transition back to the previous scene.
    ///
    /// Returns `Unchanged` if there is no previous scene yet.
    pub async fn revert_to_previous(&self, origin: TransitionOrigin) -> TransitionResult {
        let snapshot = self.current_snapshot();
        match snapshot.previous {
            Some(previous) => {
                self.transition(previous, origin, TransitionContext::because("revert to previous"))
                    .await
            }
            None => Ok(TransitionOutcome::Unchanged(snapshot)),
        }
    }

    /// The last committed snapshot.
    pub fn current_snapshot(&self) -> SceneSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// The scene currently shown.
    pub fn current_scene(&self) -> SceneId {
        self.snapshot_rx.borrow().current
    }

    /// Watch snapshot changes.
    pub fn watch(&self) -> watch::Receiver<SceneSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to committed, failed and viewport events.
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.event_tx.subscribe()
    }

    /// Audit trail, oldest first.
    pub fn audit(&self) -> Vec<TransitionRecord> {
        self.audit
            .read()
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns true while the coordinator task is accepting requests.
    pub fn is_running(&self) -> bool {
        !self.request_tx.is_closed()
    }
}

impl std::fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHandle")
            .field("snapshot", &*self.snapshot_rx.borrow())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::runtime::ControlHealth;
    use crate::scene::loader::{LoadFuture, LoaderError, SceneContextLoader};
    use crate::scene::types::Scene;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loader that counts calls and can be told to fail or stall.
    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
        fail_on: Option<SceneId>,
        delay: Duration,
    }

    impl SceneContextLoader for CountingLoader {
        fn load<'a>(&'a self, scene: &'static Scene) -> LoadFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if self.fail_on == Some(scene.id) {
                    return Err(LoaderError::Unavailable("gis server down".to_string()));
                }
                Ok(SceneContext {
                    scene: scene.id,
                    layers: scene.layers(),
                    viewport: None,
                })
            })
        }
    }

    fn spawn(loader: Arc<CountingLoader>, config: SceneCoordinatorConfig) -> SceneHandle {
        let (coordinator, handle) = SceneCoordinator::new(
            config,
            loader,
            SystemClock::shared(),
            SceneSnapshot::initial(Utc::now()),
        );
        tokio::spawn(coordinator.run(CancellationToken::new()));
        handle
    }

    #[tokio::test]
    async fn test_initial_state_is_normal() {
        let handle = spawn(Arc::default(), SceneCoordinatorConfig::default());
        let snapshot = handle.current_snapshot();
        assert_eq!(snapshot.current, SceneId::Normal);
        assert!(snapshot.previous.is_none());
    }

    #[tokio::test]
    async fn test_commit_records_previous() {
        let handle = spawn(Arc::default(), SceneCoordinatorConfig::default());

        let outcome = handle
            .transition(
                SceneId::Inspection,
                TransitionOrigin::Manual,
                TransitionContext::default(),
            )
            .await
            .unwrap();

        assert!(outcome.is_committed());
        let snapshot = handle.current_snapshot();
        assert_eq!(snapshot.current, SceneId::Inspection);
        assert_eq!(snapshot.previous, Some(SceneId::Normal));
        assert!(snapshot.is_stable());
    }

    #[tokio::test]
    async fn test_same_scene_is_noop() {
        let loader = Arc::new(CountingLoader::default());
        let handle = spawn(Arc::clone(&loader), SceneCoordinatorConfig::default());
        let before = handle.current_snapshot();

        let outcome = handle
            .transition(SceneId::Normal, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();

        assert!(!outcome.is_committed());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(handle.current_snapshot().entered_at, before.entered_at);
    }

    #[tokio::test]
    async fn test_failed_initializer_rolls_back() {
        let loader = Arc::new(CountingLoader {
            fail_on: Some(SceneId::Analysis),
            ..Default::default()
        });
        let handle = spawn(loader, SceneCoordinatorConfig::default());
        let mut events = handle.subscribe();
        let before = handle.current_snapshot();

        let err = handle
            .transition(SceneId::Analysis, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ControlError::TransitionFailed {
                target: SceneId::Analysis,
                ..
            }
        ));
        assert_eq!(handle.current_snapshot(), before);
        assert!(matches!(
            events.recv().await.unwrap(),
            SceneEvent::Failed { target: SceneId::Analysis, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initializer_timeout_fails_transition() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_secs(60),
            ..Default::default()
        });
        let config = SceneCoordinatorConfig {
            initializer_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let handle = spawn(loader, config);

        let err = handle
            .transition(SceneId::Dispatch, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap_err();

        match err {
            ControlError::TransitionFailed { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(handle.current_scene(), SceneId::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_progress_flag_visible_while_loading() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_secs(1),
            ..Default::default()
        });
        let handle = spawn(loader, SceneCoordinatorConfig::default());
        let mut watch = handle.watch();

        let rx = handle
            .submit(SceneId::Emergency, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();

        watch.changed().await.unwrap();
        let busy = watch.borrow_and_update().clone();
        assert!(busy.transition_in_progress);
        assert_eq!(busy.current, SceneId::Normal);
        assert_ne!(busy.previous, Some(busy.current));

        rx.await.unwrap().unwrap();
        let done = handle.current_snapshot();
        assert!(done.is_stable());
        assert_eq!(done.current, SceneId::Emergency);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_requests_commit_in_order() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let handle = spawn(loader, SceneCoordinatorConfig::default());

        let first = handle
            .submit(SceneId::Inspection, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();
        let second = handle
            .submit(SceneId::Dispatch, TransitionOrigin::Playlist, TransitionContext::default())
            .await
            .unwrap();

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(first.snapshot().current, SceneId::Inspection);
        assert_eq!(second.snapshot().previous, Some(SceneId::Inspection));
        assert!(second.snapshot().entered_at >= first.snapshot().entered_at);

        let audit = handle.audit();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].origin, TransitionOrigin::Manual);
        assert_eq!(audit[1].origin, TransitionOrigin::Playlist);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_submit_fails_fast_when_queue_full() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_secs(1),
            ..Default::default()
        });
        let config = SceneCoordinatorConfig {
            request_capacity: 1,
            ..SceneCoordinatorConfig::default()
        };
        let handle = spawn(loader, config);
        let mut watch = handle.watch();

        let first = handle
            .try_submit(SceneId::Inspection, TransitionOrigin::Manual, TransitionContext::default())
            .unwrap();
        watch.changed().await.unwrap();
        assert!(watch.borrow_and_update().transition_in_progress);

        let second = handle
            .try_submit(SceneId::Dispatch, TransitionOrigin::Playlist, TransitionContext::default())
            .unwrap();
        let third = handle.try_submit(
            SceneId::Emergency,
            TransitionOrigin::Threshold,
            TransitionContext::default(),
        );
        assert!(matches!(third, Err(ControlError::Busy)));

        assert!(first.await.unwrap().unwrap().is_committed());
        assert!(second.await.unwrap().unwrap().is_committed());
        assert_eq!(handle.current_scene(), SceneId::Dispatch);
    }

    #[tokio::test]
    async fn test_revert_to_previous() {
        let handle = spawn(Arc::default(), SceneCoordinatorConfig::default());

        let outcome = handle.revert_to_previous(TransitionOrigin::Manual).await.unwrap();
        assert!(!outcome.is_committed());

        handle
            .transition(SceneId::Dispatch, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();
        handle.revert_to_previous(TransitionOrigin::Manual).await.unwrap();

        let snapshot = handle.current_snapshot();
        assert_eq!(snapshot.current, SceneId::Normal);
        assert_eq!(snapshot.previous, Some(SceneId::Dispatch));
    }

    #[tokio::test]
    async fn test_noop_with_viewport_publishes_viewport_event() {
        let handle = spawn(Arc::default(), SceneCoordinatorConfig::default());
        let mut events = handle.subscribe();

        handle
            .transition(
                SceneId::Normal,
                TransitionOrigin::Playlist,
                TransitionContext::default().with_viewport(Viewport::centered(30.8, 111.0, 13.0)),
            )
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            SceneEvent::ViewportChanged { viewport, .. } => assert_eq!(viewport.zoom, 13.0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health_counters() {
        let health = Arc::new(ControlHealth::new());
        let loader = Arc::new(CountingLoader {
            fail_on: Some(SceneId::Analysis),
            ..Default::default()
        });
        let (coordinator, handle) = SceneCoordinator::new(
            SceneCoordinatorConfig::default(),
            loader,
            SystemClock::shared(),
            SceneSnapshot::initial(Utc::now()),
        );
        tokio::spawn(
            coordinator
                .with_health(Arc::clone(&health))
                .run(CancellationToken::new()),
        );

        let ctx = TransitionContext::default;
        let _ = handle.transition(SceneId::Dispatch, TransitionOrigin::Manual, ctx()).await;
        let _ = handle.transition(SceneId::Dispatch, TransitionOrigin::Manual, ctx()).await;
        let _ = handle.transition(SceneId::Analysis, TransitionOrigin::Manual, ctx()).await;

        let snapshot = health.snapshot();
        assert_eq!(snapshot.transitions_committed, 1);
        assert_eq!(snapshot.transitions_unchanged, 1);
        assert_eq!(snapshot.transitions_failed, 1);
    }

    #[tokio::test]
    async fn test_requests_fail_after_shutdown() {
        let (coordinator, handle) = SceneCoordinator::new(
            SceneCoordinatorConfig::default(),
            Arc::new(CountingLoader::default()),
            SystemClock::shared(),
            SceneSnapshot::initial(Utc::now()),
        );
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(coordinator.run(shutdown.clone()));
        shutdown.cancel();
        task.await.unwrap();

        let err = handle
            .transition(SceneId::Dispatch, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, ControlError::Unavailable);
        assert!(!handle.is_running());
    }
}
