//! Integration tests for the control-room runtime.
//!
//! These tests drive [`ControlRoomRuntime`] through its public surface with
//! a recording scene loader and a recording display sink:
//! - Threshold-driven emergency switching and rule cool-downs
//! - Suggestion auto-apply and operator review
//! - Display liveness, layout gaps and sync regimes
//! - Transition rollback, idempotence and concurrent triggers
//! - Playlist looping

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use hydroscene::clock::ManualClock;
use hydroscene::display::{DisplayDescriptor, DisplayId, DisplayStatus, Resolution, WILDCARD_CAPABILITY};
use hydroscene::layout::{LayoutId, LayoutSpec};
use hydroscene::playlist::PlaylistEntry;
use hydroscene::runtime::{ControlRoomRuntime, RuntimeConfig};
use hydroscene::scene::{
    LoadFuture, LoaderError, RecordOutcome, Scene, SceneContext, SceneContextLoader, SceneId,
    TransitionContext, TransitionOrigin, TransitionOutcome,
};
use hydroscene::suggestion::{ArbiterDecision, SuggestionProposal};
use hydroscene::sync::{AddressedUpdate, DeliveryFuture, DisplaySink, SceneUpdate, SyncRegime};
use hydroscene::threshold::{Comparator, MetricSample, Severity, ThresholdRule};
use hydroscene::ControlError;

// =============================================================================
// Test Helpers
// =============================================================================

/// Loader that records every scene it loads, in order.
#[derive(Default)]
struct RecordingLoader {
    loads: Mutex<Vec<(SceneId, tokio::time::Instant)>>,
    failing: Mutex<HashSet<SceneId>>,
}

impl RecordingLoader {
    fn fail_on(&self, scene: SceneId) {
        self.failing.lock().unwrap().insert(scene);
    }

    fn recover(&self, scene: SceneId) {
        self.failing.lock().unwrap().remove(&scene);
    }

    fn scenes(&self) -> Vec<SceneId> {
        self.loads.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    fn count(&self, scene: SceneId) -> usize {
        self.scenes().into_iter().filter(|s| *s == scene).count()
    }
}

impl SceneContextLoader for RecordingLoader {
    fn load<'a>(&'a self, scene: &'static Scene) -> LoadFuture<'a> {
        self.loads
            .lock()
            .unwrap()
            .push((scene.id, tokio::time::Instant::now()));
        let fail = self.failing.lock().unwrap().contains(&scene.id);
        Box::pin(async move {
            if fail {
                return Err(LoaderError::Unavailable("station data service down".to_string()));
            }
            Ok(SceneContext {
                scene: scene.id,
                layers: scene.layers(),
                viewport: None,
            })
        })
    }
}

/// Sink that acknowledges every update and keeps a copy.
#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<AddressedUpdate>>,
}

impl RecordingSink {
    fn displays_for(&self, scene: SceneId) -> Vec<DisplayId> {
        let mut displays: Vec<DisplayId> = self
            .delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.update.scene == scene)
            .map(|d| d.display.clone())
            .collect();
        displays.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        displays
    }
}

impl DisplaySink for RecordingSink {
    fn deliver<'a>(&'a self, display: &'a DisplayId, update: &'a SceneUpdate) -> DeliveryFuture<'a> {
        self.delivered.lock().unwrap().push(AddressedUpdate {
            display: display.clone(),
            update: update.clone(),
        });
        Box::pin(async { Ok(()) })
    }
}

struct Fixture {
    runtime: ControlRoomRuntime,
    loader: Arc<RecordingLoader>,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
}

fn fixture(config: RuntimeConfig) -> Fixture {
    let loader = Arc::new(RecordingLoader::default());
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(ManualClock::new());
    let runtime = ControlRoomRuntime::new(config, loader.clone(), sink.clone(), clock.clone());
    Fixture {
        runtime,
        loader,
        sink,
        clock,
    }
}

fn reservoir_rule() -> ThresholdRule {
    ThresholdRule::new(
        "reservoir-high",
        "water_level",
        Comparator::Gt,
        175.0,
        Severity::Critical,
    )
}

fn threshold_fixture() -> Fixture {
    let mut config = RuntimeConfig::default();
    config.threshold.rules = vec![reservoir_rule()];
    fixture(config)
}

fn wall_display(id: &str) -> DisplayDescriptor {
    DisplayDescriptor::new(id, Resolution::new(3840, 2160))
        .with_id(id)
        .with_capability(WILDCARD_CAPABILITY)
}

fn ids(names: &[&str]) -> Vec<DisplayId> {
    names.iter().map(|n| DisplayId::new(*n)).collect()
}

/// Poll until `check` holds, failing after two seconds.
async fn wait_until(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

// =============================================================================
// Threshold Monitor
// =============================================================================

#[tokio::test]
async fn test_critical_reading_switches_to_emergency() {
    let f = threshold_fixture();

    assert!(f
        .runtime
        .ingest(vec![MetricSample::new("water_level", 181.0, Utc::now())]));
    wait_until("emergency scene", || {
        f.runtime.snapshot().current == SceneId::Emergency
    })
    .await;

    let alerts = f.runtime.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity(), Severity::Critical);
    assert_eq!(alerts[0].observed_value, 181.0);

    let snapshot = f.runtime.snapshot();
    assert_eq!(snapshot.previous, Some(SceneId::Normal));
    assert!(snapshot.is_stable());

    let audit = f.runtime.audit();
    assert_eq!(audit.last().map(|r| r.origin), Some(TransitionOrigin::Threshold));

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_rule_cooldown_limits_emergency_attempts() {
    let f = threshold_fixture();
    let reading = || vec![MetricSample::new("water_level", 182.5, Utc::now())];

    f.runtime.ingest(reading());
    wait_until("emergency scene", || {
        f.runtime.snapshot().current == SceneId::Emergency
    })
    .await;

    // Operator stands down, the sensor keeps reporting inside the cool-down
    f.runtime
        .transition(SceneId::Normal, TransitionOrigin::Manual, TransitionContext::default())
        .await
        .unwrap();
    f.runtime.ingest(reading());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);
    assert_eq!(f.runtime.alerts().len(), 1);
    assert_eq!(f.loader.count(SceneId::Emergency), 1);

    f.clock.advance(Duration::from_secs(31));
    f.runtime.ingest(reading());
    wait_until("second emergency", || {
        f.runtime.snapshot().current == SceneId::Emergency
    })
    .await;
    assert_eq!(f.runtime.alerts().len(), 2);
    assert_eq!(f.loader.count(SceneId::Emergency), 2);

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_failed_emergency_retries_after_cooldown() {
    let f = threshold_fixture();
    f.loader.fail_on(SceneId::Emergency);
    let reading = || vec![MetricSample::new("water_level", 184.0, Utc::now())];

    f.runtime.ingest(reading());
    wait_until("failed emergency attempt", || {
        f.runtime
            .audit()
            .iter()
            .any(|r| matches!(r.outcome, RecordOutcome::Failed(_)))
    })
    .await;
    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);
    assert_eq!(f.runtime.health().transitions_failed, 1);

    // Still inside the cool-down: no second attempt even though the loader is back
    f.loader.recover(SceneId::Emergency);
    f.runtime.ingest(reading());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.loader.count(SceneId::Emergency), 1);
    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);

    f.clock.advance(Duration::from_secs(31));
    f.runtime.ingest(reading());
    wait_until("emergency after cool-down", || {
        f.runtime.snapshot().current == SceneId::Emergency
    })
    .await;

    assert_eq!(f.loader.count(SceneId::Emergency), 2);
    assert_eq!(f.runtime.alerts().len(), 2);
    let audit = f.runtime.audit();
    let threshold: Vec<&RecordOutcome> = audit
        .iter()
        .filter(|r| r.origin == TransitionOrigin::Threshold)
        .map(|r| &r.outcome)
        .collect();
    assert!(matches!(
        threshold.as_slice(),
        [RecordOutcome::Failed(_), RecordOutcome::Committed]
    ));

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_triggers_commit_one_at_a_time() {
    let f = threshold_fixture();
    f.runtime
        .playlist()
        .set_entries(vec![PlaylistEntry::new(SceneId::Inspection, Duration::from_secs(600))])
        .await
        .unwrap();

    // Threshold, playlist and operator all ask for a different scene at once
    assert!(f
        .runtime
        .ingest(vec![MetricSample::new("water_level", 181.0, Utc::now())]));
    let (manual, playlist) = tokio::join!(
        f.runtime
            .transition(SceneId::Analysis, TransitionOrigin::Manual, TransitionContext::default()),
        f.runtime.playlist().start(),
    );
    assert!(manual.unwrap().is_committed());
    playlist.unwrap();

    let committed = || {
        f.runtime
            .audit()
            .into_iter()
            .filter(|r| r.outcome == RecordOutcome::Committed)
            .collect::<Vec<_>>()
    };
    wait_until("three commits", || committed().len() == 3).await;
    f.runtime.playlist().stop().await;

    let records = committed();
    let origins: HashSet<TransitionOrigin> = records.iter().map(|r| r.origin).collect();
    assert_eq!(
        origins,
        HashSet::from([
            TransitionOrigin::Threshold,
            TransitionOrigin::Playlist,
            TransitionOrigin::Manual
        ])
    );

    // Each commit starts from the scene the previous one entered
    let mut shown = SceneId::Normal;
    for record in &records {
        assert_eq!(record.from, shown);
        assert_ne!(record.target, record.from);
        shown = record.target;
    }
    let snapshot = f.runtime.snapshot();
    assert_eq!(snapshot.current, shown);
    assert_eq!(snapshot.previous, Some(records[1].target));
    assert_ne!(snapshot.previous, Some(snapshot.current));
    assert!(snapshot.is_stable());

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_alerts_without_auto_switch_keep_scene() {
    let f = threshold_fixture();
    let mut prefs = f.runtime.preferences();
    prefs.auto_switch_scenes = false;
    f.runtime.set_preferences(prefs);

    f.runtime
        .ingest(vec![MetricSample::new("water_level", 190.0, Utc::now())]);
    wait_until("alert", || !f.runtime.alerts().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);
    assert_eq!(f.loader.count(SceneId::Emergency), 0);

    f.runtime.shutdown().await;
}

// =============================================================================
// Suggestion Arbiter
// =============================================================================

#[tokio::test]
async fn test_confident_suggestion_applies_immediately() {
    let f = fixture(RuntimeConfig::default());
    let proposal = SuggestionProposal::new(SceneId::Dispatch, "peak demand forecast", 0.95, Utc::now());

    let decision = f.runtime.submit_suggestion(proposal).await.unwrap();

    match decision {
        ArbiterDecision::Applied(TransitionOutcome::Committed(snapshot)) => {
            assert_eq!(snapshot.current, SceneId::Dispatch);
        }
        other => panic!("expected an applied suggestion, got {other:?}"),
    }
    assert_eq!(f.runtime.snapshot().current, SceneId::Dispatch);
    assert!(f.runtime.pending_suggestion().is_none());

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_uncertain_suggestion_waits_for_operator() {
    let f = fixture(RuntimeConfig::default());
    let proposal = SuggestionProposal::new(SceneId::Dispatch, "peak demand forecast", 0.6, Utc::now());

    let decision = f.runtime.submit_suggestion(proposal).await.unwrap();
    assert!(matches!(decision, ArbiterDecision::Pending { replaced: None }));
    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);
    assert_eq!(
        f.runtime.pending_suggestion().map(|p| p.target_scene),
        Some(SceneId::Dispatch)
    );

    let rejected = f.runtime.reject_pending();
    assert_eq!(rejected.map(|p| p.confidence), Some(0.6));
    assert!(f.runtime.pending_suggestion().is_none());
    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);
    assert_eq!(f.loader.count(SceneId::Dispatch), 0);

    f.runtime.shutdown().await;
}

// =============================================================================
// Scene transitions
// =============================================================================

#[tokio::test]
async fn test_transition_to_current_scene_is_noop() {
    let f = fixture(RuntimeConfig::default());
    let before = f.runtime.snapshot();

    let outcome = f
        .runtime
        .transition(SceneId::Normal, TransitionOrigin::Manual, TransitionContext::default())
        .await
        .unwrap();

    assert!(matches!(outcome, TransitionOutcome::Unchanged(_)));
    assert!(f.loader.scenes().is_empty());
    assert_eq!(f.runtime.snapshot().entered_at, before.entered_at);

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_failed_initializer_rolls_back() {
    let f = fixture(RuntimeConfig::default());
    f.loader.fail_on(SceneId::Analysis);

    let result = f
        .runtime
        .transition(SceneId::Analysis, TransitionOrigin::Manual, TransitionContext::default())
        .await;

    assert!(matches!(
        result,
        Err(ControlError::TransitionFailed {
            target: SceneId::Analysis,
            ..
        })
    ));
    let snapshot = f.runtime.snapshot();
    assert_eq!(snapshot.current, SceneId::Normal);
    assert_eq!(snapshot.previous, None);
    assert!(snapshot.is_stable());
    assert!(f.sink.displays_for(SceneId::Analysis).is_empty());
    assert_eq!(f.runtime.health().transitions_failed, 1);

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_previous_scene_tracks_last_commit() {
    let f = fixture(RuntimeConfig::default());
    for target in [SceneId::Inspection, SceneId::Dispatch, SceneId::Analysis] {
        let before = f.runtime.snapshot().current;
        f.runtime
            .transition(target, TransitionOrigin::Manual, TransitionContext::default())
            .await
            .unwrap();
        let after = f.runtime.snapshot();
        assert_eq!(after.current, target);
        assert_eq!(after.previous, Some(before));
    }

    f.runtime.revert_to_previous().await.unwrap();
    assert_eq!(f.runtime.snapshot().current, SceneId::Dispatch);
    assert_eq!(f.runtime.snapshot().previous, Some(SceneId::Analysis));

    f.runtime.shutdown().await;
}

// =============================================================================
// Displays, layouts and synchronization
// =============================================================================

#[tokio::test]
async fn test_stale_display_goes_offline_and_recovers() {
    let f = fixture(RuntimeConfig::default());
    let id = f.runtime.register_display(wall_display("wall-1")).unwrap();

    f.clock.advance(Duration::from_secs(16));
    let stale = f.runtime.registry().sweep();

    assert_eq!(stale, vec![id.clone()]);
    assert_eq!(
        f.runtime.registry().get(&id).map(|d| d.status),
        Some(DisplayStatus::Offline)
    );

    assert!(f.runtime.heartbeat(&id).unwrap());
    assert_eq!(
        f.runtime.registry().get(&id).map(|d| d.status),
        Some(DisplayStatus::Online)
    );
    assert_eq!(f.runtime.displays().len(), 1);

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_heartbeat_from_unknown_display() {
    let f = fixture(RuntimeConfig::default());
    let result = f.runtime.heartbeat(&DisplayId::new("ghost"));
    assert!(matches!(result, Err(ControlError::DisplayNotFound(_))));
    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_synchronized_dispatch_skips_offline_slot() {
    let f = fixture(RuntimeConfig::default());
    for id in ["a", "b", "c", "d"] {
        f.runtime.register_display(wall_display(id)).unwrap();
    }
    f.runtime.create_layout(LayoutSpec::grid("wall", 2, 2)).unwrap();
    f.runtime
        .activate_layout(&LayoutId::new("wall"), ids(&["a", "b", "c", "d"]))
        .unwrap();
    f.runtime
        .set_sync_regime(SyncRegime::Synchronized, None)
        .unwrap();

    f.clock.advance(Duration::from_secs(20));
    for id in ids(&["a", "b", "c"]) {
        f.runtime.heartbeat(&id).unwrap();
    }
    assert_eq!(f.runtime.registry().sweep(), ids(&["d"]));

    let report = f
        .runtime
        .sync()
        .dispatch(SceneUpdate::new(SceneId::Dispatch, Utc::now()))
        .await
        .unwrap();

    assert_eq!(report.updated(), 3);
    assert_eq!(report.gaps(), 1);
    assert_eq!(report.summary(), "3/4 screens updated");
    assert_eq!(f.sink.displays_for(SceneId::Dispatch), ids(&["a", "b", "c"]));
    assert_eq!(f.runtime.health().delivery_gaps, 1);
    // The offline display keeps its slot
    assert!(f.runtime.layouts().occupies_slot(&DisplayId::new("d")));

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_master_slave_rejects_then_accepts_after_promotion() {
    let f = fixture(RuntimeConfig::default());
    for id in ["a", "b", "c"] {
        f.runtime.register_display(wall_display(id)).unwrap();
    }
    f.runtime.create_layout(LayoutSpec::linear("row", 3)).unwrap();
    f.runtime
        .activate_layout(&LayoutId::new("row"), ids(&["a", "b", "c"]))
        .unwrap();
    f.runtime
        .set_sync_regime(SyncRegime::MasterSlave, Some(DisplayId::new("a")))
        .unwrap();

    let from_b = || TransitionContext::because("zoom to spillway").from_display(DisplayId::new("b"));

    let rejected = f
        .runtime
        .transition(SceneId::Inspection, TransitionOrigin::Manual, from_b())
        .await;
    assert!(matches!(rejected, Err(ControlError::PermissionDenied { .. })));
    assert_eq!(f.runtime.snapshot().current, SceneId::Normal);
    assert!(f.sink.displays_for(SceneId::Inspection).is_empty());

    f.runtime
        .set_sync_regime(SyncRegime::MasterSlave, Some(DisplayId::new("b")))
        .unwrap();
    let outcome = f
        .runtime
        .transition(SceneId::Inspection, TransitionOrigin::Manual, from_b())
        .await
        .unwrap();
    assert!(outcome.is_committed());

    wait_until("relay to the other displays", || {
        f.sink.displays_for(SceneId::Inspection) == ids(&["a", "c"])
    })
    .await;
    // Late registration catch-ups must not echo the scene back to the master
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.sink.displays_for(SceneId::Inspection), ids(&["a", "c"]));

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_recovered_display_gets_scene_before_any_commit() {
    let f = fixture(RuntimeConfig::default());
    for id in ["a", "b"] {
        f.runtime.register_display(wall_display(id)).unwrap();
    }
    f.runtime.create_layout(LayoutSpec::linear("pair", 2)).unwrap();
    f.runtime
        .activate_layout(&LayoutId::new("pair"), ids(&["a", "b"]))
        .unwrap();
    f.runtime
        .set_sync_regime(SyncRegime::Synchronized, None)
        .unwrap();

    f.clock.advance(Duration::from_secs(20));
    f.runtime.heartbeat(&DisplayId::new("a")).unwrap();
    assert_eq!(f.runtime.registry().sweep(), ids(&["b"]));
    let before = f.sink.delivered.lock().unwrap().len();

    assert!(f.runtime.heartbeat(&DisplayId::new("b")).unwrap());
    wait_until("recovered display resynced", || {
        f.sink.delivered.lock().unwrap()[before..]
            .iter()
            .any(|d| d.display.as_str() == "b")
    })
    .await;

    let delivered = f.sink.delivered.lock().unwrap().clone();
    let resync = delivered[before..]
        .iter()
        .find(|d| d.display.as_str() == "b")
        .map(|d| d.update.clone());
    assert_eq!(resync.as_ref().map(|u| u.scene), Some(SceneId::Normal));
    assert!(resync.is_some_and(|u| !u.layers.is_empty()));
    assert!(f.loader.scenes().is_empty());

    f.runtime.shutdown().await;
}

#[tokio::test]
async fn test_master_slave_requires_online_master() {
    let f = fixture(RuntimeConfig::default());
    f.runtime.register_display(wall_display("a")).unwrap();
    f.clock.advance(Duration::from_secs(20));
    f.runtime.registry().sweep();

    let result = f
        .runtime
        .set_sync_regime(SyncRegime::MasterSlave, Some(DisplayId::new("a")));
    assert!(result.is_err());
    assert_eq!(f.runtime.sync().state().regime, SyncRegime::Independent);

    f.runtime.shutdown().await;
}

// =============================================================================
// Playlist
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_playlist_loops_through_runtime() {
    let f = fixture(RuntimeConfig::default());
    let dwell = Duration::from_secs(20);
    f.runtime
        .playlist()
        .set_entries(vec![
            PlaylistEntry::new(SceneId::Inspection, dwell),
            PlaylistEntry::new(SceneId::Dispatch, dwell),
            PlaylistEntry::new(SceneId::Analysis, dwell),
        ])
        .await
        .unwrap();

    let t0 = tokio::time::Instant::now();
    f.runtime.playlist().start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(130)).await;
    f.runtime.playlist().stop().await;

    let loads = f.loader.loads.lock().unwrap().clone();
    let scenes: Vec<SceneId> = loads.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        scenes,
        vec![
            SceneId::Inspection,
            SceneId::Dispatch,
            SceneId::Analysis,
            SceneId::Inspection,
            SceneId::Dispatch,
            SceneId::Analysis,
            SceneId::Inspection,
        ]
    );
    for (n, (_, at)) in loads.iter().enumerate() {
        assert_eq!(at.duration_since(t0).as_secs(), 20 * n as u64);
    }

    f.runtime.shutdown().await;
}
