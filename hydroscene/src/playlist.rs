//! Scene playlist player.
//!
//! Cycles through an ordered list of scenes, dwelling on each for a fixed
//! time and looping until stopped. Every advance goes through the same
//! transition entry point as any other trigger, with origin `playlist`.
//!
//! A manual or threshold transition while the player is running does not
//! stop it: the next tick switches to the next playlist entry regardless.
//!
//! ```text
//!   start ──► Running ──pause──► Paused ──resume──► Running
//!     ▲          │                  │
//!     │         stop               stop
//!     │          ▼                  ▼
//!     └────── Stopped ◄─────────────┘   (cursor reset to 0)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ControlError;
use crate::scene::{SceneHandle, SceneId, TransitionContext, TransitionOrigin, Viewport};

/// One playlist step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub scene: SceneId,
    pub viewport: Option<Viewport>,
    /// Time spent on this entry before advancing.
    pub dwell: Duration,
}

impl PlaylistEntry {
    pub fn new(scene: SceneId, dwell: Duration) -> Self {
        Self {
            scene,
            viewport: None,
            dwell,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Running,
    Paused,
    Stopped,
}

/// Observable player state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistState {
    pub status: PlaybackStatus,
    /// Index of the entry currently shown (or to be shown on start).
    pub index: usize,
    pub entries: usize,
    /// Dwell left on the current entry while paused.
    pub remaining: Option<Duration>,
}

struct Timer {
    cancel: CancellationToken,
    deadline: Instant,
}

struct Inner {
    entries: Vec<PlaylistEntry>,
    cursor: usize,
    status: PlaybackStatus,
    timer: Option<Timer>,
    remaining: Option<Duration>,
    /// Bumped on every reschedule so stale timer tasks can tell.
    generation: u64,
}

impl Inner {
    fn cancel_timer(&mut self) -> Option<Instant> {
        self.timer.take().map(|timer| {
            timer.cancel.cancel();
            timer.deadline
        })
    }
}

/// Timer-driven scene sequencer.
#[derive(Clone)]
pub struct PlaylistPlayer {
    scenes: SceneHandle,
    inner: Arc<Mutex<Inner>>,
}

impl PlaylistPlayer {
    pub fn new(scenes: SceneHandle) -> Self {
        Self {
            scenes,
            inner: Arc::new(Mutex::new(Inner {
                entries: Vec::new(),
                cursor: 0,
                status: PlaybackStatus::Stopped,
                timer: None,
                remaining: None,
                generation: 0,
            })),
        }
    }

    /// Replace the playlist. A running or paused player is stopped first.
    pub async fn set_entries(&self, entries: Vec<PlaylistEntry>) -> Result<(), ControlError> {
        if let Some((n, _)) = entries.iter().enumerate().find(|(_, e)| e.dwell.is_zero()) {
            return Err(ControlError::validation(format!(
                "playlist entry {n} has zero dwell"
            )));
        }

        let mut inner = self.inner.lock().await;
        Self::halt(&mut inner);
        info!(entries = entries.len(), "Playlist loaded");
        inner.entries = entries;
        Ok(())
    }

    pub async fn entries(&self) -> Vec<PlaylistEntry> {
        self.inner.lock().await.entries.clone()
    }

    /// Show the entry at the cursor and start its dwell timer.
    ///
    /// Starting a running player does nothing; starting a paused one resumes it.
    pub async fn start(&self) -> Result<(), ControlError> {
        let mut inner = self.inner.lock().await;
        let status = inner.status;
        match status {
            PlaybackStatus::Running => return Ok(()),
            PlaybackStatus::Paused => {
                drop(inner);
                return self.resume().await;
            }
            PlaybackStatus::Stopped => {}
        }
        if inner.entries.is_empty() {
            return Err(ControlError::validation("playlist is empty"));
        }

        inner.status = PlaybackStatus::Running;
        info!(index = inner.cursor, entries = inner.entries.len(), "Playlist started");
        self.fire(&mut inner);
        Ok(())
    }

    /// Halt the timer, keeping the cursor and the remaining dwell.
    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        if inner.status != PlaybackStatus::Running {
            return;
        }
        let remaining = inner
            .cancel_timer()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        inner.remaining = remaining;
        inner.status = PlaybackStatus::Paused;
        info!(index = inner.cursor, remaining_ms = remaining.map(|r| r.as_millis() as u64), "Playlist paused");
    }

    /// Restart the timer for the remaining dwell of the current entry.
    pub async fn resume(&self) -> Result<(), ControlError> {
        let mut inner = self.inner.lock().await;
        if inner.status != PlaybackStatus::Paused {
            return Ok(());
        }
        let delay = inner
            .remaining
            .take()
            .or_else(|| inner.entries.get(inner.cursor).map(|e| e.dwell))
            .ok_or_else(|| ControlError::validation("playlist is empty"))?;

        inner.status = PlaybackStatus::Running;
        info!(index = inner.cursor, remaining_ms = delay.as_millis() as u64, "Playlist resumed");
        self.schedule(&mut inner, delay);
        Ok(())
    }

    /// Cancel the timer and reset the cursor.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.status != PlaybackStatus::Stopped {
            info!("Playlist stopped");
        }
        Self::halt(&mut inner);
    }

    pub async fn state(&self) -> PlaylistState {
        let inner = self.inner.lock().await;
        PlaylistState {
            status: inner.status,
            index: inner.cursor,
            entries: inner.entries.len(),
            remaining: inner.remaining,
        }
    }

    fn halt(inner: &mut Inner) {
        inner.cancel_timer();
        inner.generation += 1;
        inner.status = PlaybackStatus::Stopped;
        inner.cursor = 0;
        inner.remaining = None;
    }

    /// Request the transition for the entry at the cursor and arm its timer.
    fn fire(&self, inner: &mut Inner) {
        let Some(entry) = inner.entries.get(inner.cursor).cloned() else {
            return;
        };

        let mut context = TransitionContext::because(format!("playlist entry {}", inner.cursor));
        context.viewport = entry.viewport;

        debug!(index = inner.cursor, scene = %entry.scene, "Playlist advancing");
        // Never wait for queue space while the playlist lock is held
        match self
            .scenes
            .try_submit(entry.scene, TransitionOrigin::Playlist, context)
        {
            Ok(reply) => {
                tokio::spawn(async move {
                    if let Ok(Err(e)) = reply.await {
                        warn!(error = %e, "Playlist transition failed");
                    }
                });
            }
            Err(e) => warn!(error = %e, "Playlist could not reach scene coordinator"),
        }

        self.schedule(inner, entry.dwell);
    }

    fn schedule(&self, inner: &mut Inner, delay: Duration) {
        inner.cancel_timer();
        inner.generation += 1;

        let cancel = CancellationToken::new();
        inner.timer = Some(Timer {
            cancel: cancel.clone(),
            deadline: Instant::now() + delay,
        });

        let generation = inner.generation;
        let player = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            player.tick(generation, cancel).await;
        });
    }

    async fn tick(&self, generation: u64, cancel: CancellationToken) {
        let mut inner = self.inner.lock().await;
        // Pause, stop or reschedule may have happened since the timer expired.
        if cancel.is_cancelled()
            || inner.generation != generation
            || inner.status != PlaybackStatus::Running
            || inner.entries.is_empty()
        {
            return;
        }
        inner.timer = None;
        inner.cursor = (inner.cursor + 1) % inner.entries.len();
        self.fire(&mut inner);
    }
}

impl std::fmt::Debug for PlaylistPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistPlayer").finish_non_exhaustive()
    }
}
