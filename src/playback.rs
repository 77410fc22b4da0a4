//! Frame playback timing.
//!
//! A pure state machine: the view polls it once per render tick with the
//! current time and whether the current frame can be shown, and acts on the
//! returned [`PlaybackStep`]. Time is always passed in so ticks are
//! deterministic.

use std::time::Duration;
use web_time::Instant;

/// What the view should do on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStep {
    /// Nothing to do
    Idle,
    /// The next frame is due within the lead time; start loading it
    Prefetch,
    /// The next frame is due but the current one is not loaded yet
    Hold,
    /// Move to the next frame
    Advance,
}

/// Playback state of one view.
#[derive(Debug, Clone)]
pub struct Playback {
    /// How long before a frame is due its load is started
    lead: Duration,
    /// Frames per second while playing
    fps: f32,
    /// Time the next frame is due, while playing
    next_due: Option<Instant>,
    /// Whether the lead prefetch for `next_due` was already signalled
    prefetched: bool,
}

impl Playback {
    /// Create a stopped playback with the given lead time.
    pub fn new(lead: Duration) -> Self {
        Self {
            lead,
            fps: crate::constants::DEFAULT_PLAYBACK_FPS,
            next_due: None,
            prefetched: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Time between two frames.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps)
    }

    /// Start playing at `fps`. The first advance is due one interval from `now`.
    pub fn play(&mut self, now: Instant, fps: f32) {
        if self.is_playing() {
            return;
        }
        self.fps = if fps > 0.0 {
            fps
        } else {
            crate::constants::DEFAULT_PLAYBACK_FPS
        };
        self.next_due = Some(now + self.interval());
        self.prefetched = false;
        log::debug!("Playback started at {} fps", self.fps);
    }

    /// Stop playing. Returns whether playback was running.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.next_due.take().is_some();
        if was_playing {
            log::debug!("Playback stopped");
        }
        was_playing
    }

    /// Decide what to do at `now`.
    ///
    /// `current_ready` tells whether the current frame's low-quality tier is
    /// loaded; until it is, a due advance turns into [`PlaybackStep::Hold`].
    pub fn poll(&mut self, now: Instant, current_ready: bool) -> PlaybackStep {
        let Some(due) = self.next_due else {
            return PlaybackStep::Idle;
        };

        if now >= due {
            if !current_ready {
                log::debug!("Playback holding: current frame not loaded");
                return PlaybackStep::Hold;
            }
            self.next_due = Some(now + self.interval());
            self.prefetched = false;
            return PlaybackStep::Advance;
        }

        if !self.prefetched && now + self.lead >= due {
            self.prefetched = true;
            return PlaybackStep::Prefetch;
        }

        PlaybackStep::Idle
    }
}
