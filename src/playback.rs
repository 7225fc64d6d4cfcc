//! Playback controller.
//!
//! Owns the live media element for one presentation and translates its event
//! stream into the `PlaybackSession` transport state. All operations are
//! clamped and idempotent; state is reconciled from the engine's events, not
//! from the caller's optimistic assumption.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::media::{MediaElement, MediaError, MediaEvent, VideoFrame};
use crate::timer::Countdown;

/// Transport and descriptive state for one playback session.
///
/// Plain scalars only; this is the whitelist DTO that may be logged or
/// inspected. Native handles never live here.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub source_url: String,
    pub title: String,
    pub poster_url: Option<String>,
    /// Seconds, `>= 0`.
    pub current_time: f64,
    /// Seconds, `>= 0`. Zero until the engine reports a real duration.
    pub duration: f64,
    /// Linear volume in `[0, 1]`.
    pub volume: f64,
    pub muted: bool,
    pub is_playing: bool,
}

impl PlaybackSession {
    pub fn new(source_url: String, title: String, poster_url: Option<String>) -> Self {
        Self {
            source_url,
            title,
            poster_url,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            muted: false,
            is_playing: false,
        }
    }
}

/// Transport state captured from an outgoing presentation and replayed into
/// the next one on a mode transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturedPlayback {
    pub position: f64,
    pub volume: f64,
    pub muted: bool,
    pub was_playing: bool,
}

/// Direction of the last skip, shown by the transient indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Forward,
    Backward,
}

/// Timing knobs, taken from the config.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackTuning {
    /// Seconds moved by `skip_forward`/`skip_backward`.
    pub skip_seconds: f64,
    /// How long the skip-direction indicator stays up.
    pub skip_indicator: Duration,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            skip_seconds: 10.0,
            skip_indicator: Duration::from_secs(1),
        }
    }
}

/// Owns one media element and the session state derived from it.
pub struct PlaybackController {
    element: Option<Box<dyn MediaElement>>,
    session: PlaybackSession,
    tuning: PlaybackTuning,
    /// Seek issued but not yet confirmed by a `PositionChanged`. Repeated
    /// skips within one frame build on this, not on the stale session
    /// position.
    pending_seek: Option<f64>,
    skip_indicator: Option<SkipDirection>,
    skip_timer: Countdown,
}

impl PlaybackController {
    pub fn new(
        session: PlaybackSession,
        element: Box<dyn MediaElement>,
        tuning: PlaybackTuning,
    ) -> Self {
        Self {
            element: Some(element),
            session,
            tuning,
            pending_seek: None,
            skip_indicator: None,
            skip_timer: Countdown::new(),
        }
    }

    /// Controller with no live element: the poster-fallback state after a
    /// media fault. Transport operations become no-ops.
    pub fn detached(session: PlaybackSession, tuning: PlaybackTuning) -> Self {
        Self {
            element: None,
            session,
            tuning,
            pending_seek: None,
            skip_indicator: None,
            skip_timer: Countdown::new(),
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Whether a live element is attached (false after teardown or a media
    /// fault; transport controls are disabled then).
    pub fn has_element(&self) -> bool {
        self.element.is_some()
    }

    /// Ask the engine to start. Rejection (autoplay policy) is swallowed;
    /// playback simply remains paused and the event stream stays silent.
    pub fn play(&mut self) {
        if let Some(element) = self.element.as_mut() {
            match element.play() {
                Ok(()) => {}
                Err(MediaError::PlayRejected) => {
                    debug!("play rejected by platform; staying paused");
                }
                Err(MediaError::Fault(msg)) => {
                    warn!("play failed: {msg}");
                }
            }
        }
    }

    pub fn pause(&mut self) {
        if let Some(element) = self.element.as_mut() {
            element.pause();
        }
    }

    pub fn toggle(&mut self) {
        if self.session.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seek to `seconds`, clamped to `[0, duration]`. While the duration is
    /// still unknown (0) only the lower bound applies.
    pub fn seek(&mut self, seconds: f64) {
        let target = clamp_position(seconds, self.session.duration);
        if let Some(element) = self.element.as_mut() {
            element.seek(target);
            self.pending_seek = Some(target);
        }
    }

    /// Set volume, clamped to `[0, 1]`. Zero implies muted; any positive
    /// volume while muted unmutes.
    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        let Some(element) = self.element.as_mut() else {
            return;
        };
        element.set_volume(volume);
        if volume == 0.0 {
            element.set_muted(true);
        } else if self.session.muted {
            element.set_muted(false);
        }
    }

    /// Flip mute without touching the stored numeric volume.
    pub fn toggle_mute(&mut self) {
        let muted = !self.session.muted;
        if let Some(element) = self.element.as_mut() {
            element.set_muted(muted);
        }
    }

    pub fn skip_forward(&mut self, now: Instant) {
        self.skip(SkipDirection::Forward, now);
    }

    pub fn skip_backward(&mut self, now: Instant) {
        self.skip(SkipDirection::Backward, now);
    }

    fn skip(&mut self, direction: SkipDirection, now: Instant) {
        let delta = match direction {
            SkipDirection::Forward => self.tuning.skip_seconds,
            SkipDirection::Backward => -self.tuning.skip_seconds,
        };
        // Base on the not-yet-confirmed seek so skips issued in the same
        // frame accumulate instead of collapsing into one step.
        let base = self.pending_seek.unwrap_or(self.session.current_time);
        self.seek(base + delta);
        self.skip_indicator = Some(direction);
        self.skip_timer.arm(now, self.tuning.skip_indicator);
    }

    /// The transient skip indicator, if its timer has not expired yet.
    pub fn skip_indicator(&self) -> Option<SkipDirection> {
        self.skip_indicator
    }

    /// Advance timers. Called once per UI frame.
    pub fn tick(&mut self, now: Instant) {
        if self.skip_timer.fire_if_expired(now) {
            self.skip_indicator = None;
        }
    }

    /// Drain engine events into the session and hand them back so the owner
    /// can react to faults and end-of-stream.
    pub fn pump(&mut self) -> Vec<MediaEvent> {
        let Some(element) = self.element.as_mut() else {
            return Vec::new();
        };
        let events = element.poll();
        for event in &events {
            match event {
                MediaEvent::PositionChanged(t) => {
                    self.session.current_time = t.max(0.0);
                    self.pending_seek = None;
                }
                MediaEvent::DurationChanged(d) => self.session.duration = d.max(0.0),
                MediaEvent::PlayingChanged(playing) => self.session.is_playing = *playing,
                MediaEvent::VolumeChanged(v) => self.session.volume = v.clamp(0.0, 1.0),
                MediaEvent::MutedChanged(m) => self.session.muted = *m,
                MediaEvent::EndOfStream => self.session.is_playing = false,
                MediaEvent::Fault(_) => {}
            }
        }
        events
    }

    /// Most recent decoded frame, if any.
    pub fn take_frame(&mut self) -> Option<VideoFrame> {
        self.element.as_mut().and_then(|e| e.take_frame())
    }

    /// Snapshot continuity state for a mode transition.
    pub fn capture(&self) -> CapturedPlayback {
        CapturedPlayback {
            position: self.session.current_time,
            volume: self.session.volume,
            muted: self.session.muted,
            was_playing: self.session.is_playing,
        }
    }

    /// Replay captured state into a freshly attached element: seek, restore
    /// volume/mute, then attempt resume iff playback had been active. A
    /// rejected resume leaves the session paused.
    pub fn replay(&mut self, captured: &CapturedPlayback) {
        self.session.current_time = captured.position;
        self.session.volume = captured.volume;
        self.session.muted = captured.muted;
        if let Some(element) = self.element.as_mut() {
            let target = clamp_position(captured.position, self.session.duration);
            element.seek(target);
            self.pending_seek = Some(target);
            element.set_volume(captured.volume);
            element.set_muted(captured.muted);
        }
        if captured.was_playing {
            self.play();
        }
    }

    /// Pause and release the element. The decoder must be gone before the
    /// next presentation attaches to the same source.
    pub fn teardown(&mut self) {
        if let Some(mut element) = self.element.take() {
            element.pause();
            drop(element);
        }
        self.session.is_playing = false;
        self.pending_seek = None;
        self.skip_timer.cancel();
        self.skip_indicator = None;
    }
}

/// Clamp a seek target. Unknown duration (0) clamps only at the low end.
fn clamp_position(seconds: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        seconds.clamp(0.0, duration)
    } else {
        seconds.max(0.0)
    }
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` past one hour.
pub fn format_time(seconds: f64) -> String {
    let secs = seconds.max(0.0) as u64;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
