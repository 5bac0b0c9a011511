//! `hydroscene run` - start the control room with an operator console.
//!
//! Reads console commands from stdin until `quit`, end of input or Ctrl+C,
//! then shuts the runtime down and saves state.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use hydroscene::clock::SystemClock;
use hydroscene::display::{DisplayDescriptor, Resolution, WILDCARD_CAPABILITY};
use hydroscene::layout::{LayoutId, LayoutSpec};
use hydroscene::notify::ControlNotice;
use hydroscene::playlist::PlaylistEntry;
use hydroscene::runtime::ControlRoomRuntime;
use hydroscene::scene::{StaticSceneLoader, TransitionContext, TransitionOrigin, TransitionOutcome};
use hydroscene::suggestion::{ArbiterDecision, SuggestionProposal};
use hydroscene::sync::{BroadcastDisplaySink, SharedSink};
use hydroscene::threshold::MetricSample;
use hydroscene::ControlError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::console::{ConsoleCommand, DisplayAction, LayoutAction, PlaylistAction, PreferenceFlag};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Default resolution for displays registered from the console.
const CONSOLE_RESOLUTION: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

enum Flow {
    Continue,
    Quit,
}

/// Run the control room until the operator quits.
pub async fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("run");

    let sink = Arc::new(BroadcastDisplaySink::default());
    let runtime = ControlRoomRuntime::new(
        runner.config().runtime_config(),
        Arc::new(StaticSceneLoader::new()),
        Arc::clone(&sink) as SharedSink,
        SystemClock::shared(),
    );

    let printers = CancellationToken::new();
    spawn_notice_printer(&runtime, printers.clone());
    spawn_wall_printer(&sink, printers.clone());

    println!(
        "hydroscene v{} - scene '{}' - type 'help' for commands",
        hydroscene::VERSION,
        runtime.snapshot().current
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line.map_err(CliError::Console)? else {
                    break;
                };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if let Flow::Quit = execute(&runtime, command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => print!("{}", e.render()),
                }
            }
        }
    }

    printers.cancel();
    runtime.shutdown().await;
    println!("Control room stopped");
    Ok(())
}

async fn execute(runtime: &ControlRoomRuntime, command: ConsoleCommand) -> Flow {
    if let ConsoleCommand::Quit = command {
        return Flow::Quit;
    }
    if let Err(e) = execute_command(runtime, command).await {
        println!("error: {e}");
    }
    Flow::Continue
}

async fn execute_command(
    runtime: &ControlRoomRuntime,
    command: ConsoleCommand,
) -> Result<(), ControlError> {
    match command {
        ConsoleCommand::Switch { scene, from } => {
            let mut context = TransitionContext::because("operator console");
            context.originating_display = from;
            let outcome = runtime
                .transition(scene, TransitionOrigin::Manual, context)
                .await?;
            print_outcome(&outcome);
        }
        ConsoleCommand::Revert => print_outcome(&runtime.revert_to_previous().await?),
        ConsoleCommand::Sample { readings } => {
            let now = Utc::now();
            let samples = readings
                .into_iter()
                .map(|(metric, value)| MetricSample::new(metric, value, now))
                .collect();
            if !runtime.ingest(samples) {
                println!("batch dropped (monitor busy)");
            }
        }
        ConsoleCommand::Suggest {
            scene,
            confidence,
            rationale,
        } => {
            let rationale = if rationale.is_empty() {
                "operator console".to_string()
            } else {
                rationale.join(" ")
            };
            let proposal = SuggestionProposal::new(scene, rationale, confidence, Utc::now());
            match runtime.submit_suggestion(proposal).await? {
                ArbiterDecision::Dropped => println!("suggestion dropped (suggestions disabled)"),
                ArbiterDecision::Applied(outcome) => print_outcome(&outcome),
                ArbiterDecision::Pending { replaced } => {
                    println!("suggestion pending, use 'accept' or 'reject'");
                    if let Some(old) = replaced {
                        println!("  replaced earlier proposal for '{}'", old.target_scene);
                    }
                }
            }
        }
        ConsoleCommand::Pending => match runtime.pending_suggestion() {
            Some(p) => println!(
                "pending: {} ({:.0}%) {}",
                p.target_scene,
                p.confidence * 100.0,
                p.rationale
            ),
            None => println!("no pending suggestion"),
        },
        ConsoleCommand::Accept => print_outcome(&runtime.accept_pending().await?),
        ConsoleCommand::Reject => match runtime.reject_pending() {
            Some(p) => println!("rejected suggestion for '{}'", p.target_scene),
            None => println!("no pending suggestion"),
        },
        ConsoleCommand::Alerts => {
            let alerts = runtime.alerts();
            if alerts.is_empty() {
                println!("no alerts");
            }
            for alert in alerts {
                println!(
                    "{} {:<8} {} = {} ({})",
                    alert.timestamp.format("%H:%M:%S"),
                    alert.severity().as_str(),
                    alert.metric,
                    alert.observed_value,
                    alert.rule
                );
            }
        }
        ConsoleCommand::Display { action } => run_display(runtime, action)?,
        ConsoleCommand::Layout { action } => run_layout(runtime, action)?,
        ConsoleCommand::Regime { regime, master } => {
            let state = runtime.set_sync_regime(regime, master)?;
            match state.master {
                Some(master) => println!("regime {} (master {master})", state.regime),
                None => println!("regime {}", state.regime),
            }
        }
        ConsoleCommand::Playlist { action } => run_playlist(runtime, action).await?,
        ConsoleCommand::Prefs {
            flag: Some(flag),
            enabled: Some(enabled),
        } => {
            let mut prefs = runtime.preferences();
            match flag {
                PreferenceFlag::AutoSwitch => prefs.auto_switch_scenes = enabled,
                PreferenceFlag::Suggestions => prefs.ai_suggestions = enabled,
                PreferenceFlag::Alerts => prefs.threshold_alerts = enabled,
            }
            runtime.set_preferences(prefs);
        }
        ConsoleCommand::Prefs { .. } => {
            let prefs = runtime.preferences();
            println!("auto_switch  {}", on_off(prefs.auto_switch_scenes));
            println!("suggestions  {}", on_off(prefs.ai_suggestions));
            println!("alerts       {}", on_off(prefs.threshold_alerts));
        }
        ConsoleCommand::Status => {
            let snapshot = runtime.snapshot();
            let health = runtime.health();
            let sync = runtime.sync().state();
            println!(
                "scene {} (previous {}) since {}",
                snapshot.current,
                snapshot
                    .previous
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                snapshot.entered_at.format("%H:%M:%S")
            );
            println!("regime {} displays {}", sync.regime, runtime.displays().len());
            println!(
                "health {} - {} committed, {} failed, {} alerts, {} gaps",
                health.status.as_str(),
                health.transitions_committed,
                health.transitions_failed,
                health.alerts_fired,
                health.delivery_gaps
            );
        }
        ConsoleCommand::Audit => {
            for record in runtime.audit() {
                println!(
                    "{} {} {} -> {} {:?}",
                    record.requested_at.format("%H:%M:%S"),
                    record.origin,
                    record.from,
                    record.target,
                    record.outcome
                );
            }
        }
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn run_display(runtime: &ControlRoomRuntime, action: DisplayAction) -> Result<(), ControlError> {
    match action {
        DisplayAction::Register { id, capabilities } => {
            let mut descriptor = DisplayDescriptor::new(id.clone(), CONSOLE_RESOLUTION).with_id(id);
            if capabilities.is_empty() {
                descriptor = descriptor.with_capability(WILDCARD_CAPABILITY);
            }
            for capability in capabilities {
                descriptor = descriptor.with_capability(capability);
            }
            let id = runtime.register_display(descriptor)?;
            println!("registered {id}");
        }
        DisplayAction::Heartbeat { id } => {
            if runtime.heartbeat(&id)? {
                println!("{id} back online");
            }
        }
        DisplayAction::Remove { id } => {
            runtime.unregister_display(&id)?;
            println!("removed {id}");
        }
        DisplayAction::List => {
            let displays = runtime.displays();
            if displays.is_empty() {
                println!("no displays");
            }
            for d in displays {
                println!(
                    "{:<16} {:<8} {}x{} [{}]",
                    d.id.as_str(),
                    d.status.as_str(),
                    d.resolution.width,
                    d.resolution.height,
                    d.capabilities.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn run_layout(runtime: &ControlRoomRuntime, action: LayoutAction) -> Result<(), ControlError> {
    match action {
        LayoutAction::Grid { id, rows, cols } => {
            let layout = runtime.create_layout(LayoutSpec::grid(id, rows, cols))?;
            println!("layout {} created ({} slots)", layout.id(), layout.cell_count());
        }
        LayoutAction::Linear { id, cells } => {
            let layout = runtime.create_layout(LayoutSpec::linear(id, cells))?;
            println!("layout {} created ({} slots)", layout.id(), layout.cell_count());
        }
        LayoutAction::Activate { id, displays } => {
            let active = runtime.activate_layout(&LayoutId::new(id), displays)?;
            println!("layout {} active", active.layout.id());
        }
        LayoutAction::Replace { slot, display } => {
            runtime.replace_slot(slot, display.clone())?;
            println!("slot {slot} now shows {display}");
        }
        LayoutAction::Show => match runtime.layouts().active() {
            Some(active) => {
                println!("active layout: {}", active.layout.id());
                for target in runtime.layouts().targets() {
                    println!(
                        "  slot {:<3} {:<16} {:?}",
                        target.slot,
                        target.display.as_str(),
                        target.state
                    );
                }
            }
            None => println!("no active layout"),
        },
    }
    Ok(())
}

async fn run_playlist(runtime: &ControlRoomRuntime, action: PlaylistAction) -> Result<(), ControlError> {
    let playlist = runtime.playlist();
    match action {
        PlaylistAction::Add { scene, dwell } => {
            let mut entries = playlist.entries().await;
            entries.push(PlaylistEntry::new(scene, dwell));
            playlist.set_entries(entries).await?;
        }
        PlaylistAction::Clear => playlist.set_entries(Vec::new()).await?,
        PlaylistAction::Start => playlist.start().await?,
        PlaylistAction::Pause => playlist.pause().await,
        PlaylistAction::Resume => playlist.resume().await?,
        PlaylistAction::Stop => playlist.stop().await,
        PlaylistAction::Status => {}
    }

    let state = playlist.state().await;
    println!(
        "playlist {:?} - entry {} of {}",
        state.status,
        if state.entries == 0 { 0 } else { state.index + 1 },
        state.entries
    );
    Ok(())
}

fn print_outcome(outcome: &TransitionOutcome) {
    match outcome {
        TransitionOutcome::Committed(snapshot) => println!("scene now {}", snapshot.current),
        TransitionOutcome::Unchanged(snapshot) => println!("already in {}", snapshot.current),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Print operator notices as they arrive.
fn spawn_notice_printer(runtime: &ControlRoomRuntime, shutdown: CancellationToken) {
    let mut notices = runtime.subscribe_notices();
    tokio::spawn(async move {
        loop {
            let notice = tokio::select! {
                _ = shutdown.cancelled() => break,
                notice = notices.recv() => notice,
            };
            match notice {
                Ok(notice) => println!("! {}", describe(&notice)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Print what each wall display is sent. Stands in for real display connections.
fn spawn_wall_printer(sink: &BroadcastDisplaySink, shutdown: CancellationToken) {
    let mut updates = sink.subscribe();
    tokio::spawn(async move {
        loop {
            let update = tokio::select! {
                _ = shutdown.cancelled() => break,
                update = updates.recv() => update,
            };
            match update {
                Ok(addressed) => println!(
                    "> {} shows {}",
                    addressed.display, addressed.update.scene
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn describe(notice: &ControlNotice) -> String {
    match notice {
        ControlNotice::AlertFired(alert) => format!(
            "{} alert: {} = {} ({})",
            alert.severity(),
            alert.metric,
            alert.observed_value,
            alert.rule
        ),
        ControlNotice::SuggestionPending(p) => format!(
            "suggestion: switch to {} ({:.0}%) - {}",
            p.target_scene,
            p.confidence * 100.0,
            p.rationale
        ),
        ControlNotice::SuggestionApplied { scene, confidence } => {
            format!("suggestion applied: {} ({:.0}%)", scene, confidence * 100.0)
        }
        ControlNotice::SuggestionFailed { target, reason } => {
            format!("suggestion for {target} failed: {reason}")
        }
        ControlNotice::TransitionFailed {
            target,
            origin,
            reason,
        } => format!("{origin} transition to {target} failed: {reason}"),
        ControlNotice::DisplayOffline(id) => format!("display {id} offline"),
        ControlNotice::DisplayRecovered(id) => format!("display {id} recovered"),
        ControlNotice::RegimeFallback { master, reason } => {
            format!("sync regime now independent ({reason}: {master})")
        }
        ControlNotice::DeliveryIncomplete { scene, summary } => {
            format!("{scene} broadcast incomplete: {summary}")
        }
    }
}
