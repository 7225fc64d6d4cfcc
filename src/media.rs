//! Media element seam.
//!
//! `MediaElement` abstracts the live decoder/pipeline so the playback
//! controller and mode state machine stay testable without GStreamer. The
//! real implementation lives in `gst_backend`; tests use in-memory fakes.

use thiserror::Error;

/// Errors surfaced by a media element. All of these are non-fatal to the
/// widget; each has a documented fallback in the caller.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The platform refused to start playback (autoplay policy or a state
    /// change failure). Callers leave playback paused.
    #[error("playback start rejected by the platform")]
    PlayRejected,
    /// The source could not be loaded or decoded. The presentation falls
    /// back to the poster with controls disabled.
    #[error("media fault: {0}")]
    Fault(String),
}

/// State changes reported by the underlying engine.
///
/// Transport state in `PlaybackSession` is reconciled from these events, not
/// from the caller's optimistic assumption: a `seek` is not reflected until
/// the engine reports the new position.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    PositionChanged(f64),
    DurationChanged(f64),
    PlayingChanged(bool),
    VolumeChanged(f64),
    MutedChanged(bool),
    EndOfStream,
    Fault(String),
}

/// One decoded RGBA frame handed to the UI for texture upload.
#[derive(Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never dump pixel data into logs.
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// A live decoder bound to one source URL.
///
/// Exactly one element exists per presentation; the mode state machine drops
/// the outgoing element before creating the next one so two instances never
/// hold the same source open.
pub trait MediaElement {
    /// Ask the engine to start playback. May be rejected (autoplay policy).
    fn play(&mut self) -> Result<(), MediaError>;

    /// Pause. Always succeeds; pausing a paused element is a no-op.
    fn pause(&mut self);

    /// Seek to an absolute position in seconds. The caller clamps.
    fn seek(&mut self, seconds: f64);

    /// Set linear volume in `[0, 1]`. The caller clamps.
    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    /// Drain pending state changes. Called once per UI frame.
    fn poll(&mut self) -> Vec<MediaEvent>;

    /// Take the most recent decoded frame, if a new one arrived.
    fn take_frame(&mut self) -> Option<VideoFrame>;
}

/// Creates media elements for a source URL. The mode state machine calls
/// this once per presentation mount.
pub type MediaFactory = Box<dyn FnMut(&str) -> Result<Box<dyn MediaElement>, MediaError>>;
