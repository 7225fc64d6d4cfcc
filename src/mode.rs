//! Display-mode state machine.
//!
//! Owns the single active display mode and everything scoped to it: the
//! playback controller, the controls-visibility countdown (theater only),
//! the floating drag/resize controller (minimized only) and the PiP bridge.
//! Mode transitions preserve playback continuity: capture, tear down the
//! outgoing presentation, mount a new one on the same source, seek back and
//! attempt resume.

use std::time::{Duration, Instant};

use egui::Pos2;
use tracing::{debug, info, warn};

use crate::drag_resize::{DragResizeController, FloatingGeometry, ResizeDirection, Viewport};
use crate::media::{MediaEvent, MediaFactory};
use crate::persistence::PositionStore;
use crate::pip::{PipBridge, PipSurface};
use crate::playback::{PlaybackController, PlaybackSession, PlaybackTuning};
use crate::timer::Countdown;

/// The three mutually exclusive presentations. Exactly one is active per
/// session; transitions happen only on explicit intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Full-viewport immersive playback.
    Theater,
    /// Inline centered modal.
    Mini,
    /// Floating draggable/resizable window.
    Minimized,
}

/// What the host collaborator hands us to open the widget. The widget never
/// fetches or resolves catalog data itself.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub source_url: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub description: Option<String>,
}

/// Timing knobs for the machine, taken from the config.
#[derive(Debug, Clone, Copy)]
pub struct MachineTuning {
    /// Inactivity delay before theater controls hide.
    pub controls_hide_delay: Duration,
    pub playback: PlaybackTuning,
}

impl Default for MachineTuning {
    fn default() -> Self {
        Self {
            controls_hide_delay: Duration::from_secs(3),
            playback: PlaybackTuning::default(),
        }
    }
}

/// Auto-hide state for the on-screen controls. The countdown is armed only
/// in theater mode; the simpler mini/minimized controls are always visible.
struct ControlsVisibility {
    visible: bool,
    timer: Countdown,
    delay: Duration,
}

impl ControlsVisibility {
    fn new(delay: Duration) -> Self {
        Self {
            visible: true,
            timer: Countdown::new(),
            delay,
        }
    }

    fn enter_theater(&mut self, now: Instant) {
        self.visible = true;
        self.timer.arm(now, self.delay);
    }

    fn leave_theater(&mut self) {
        self.timer.cancel();
        self.visible = true;
    }

    fn activity(&mut self, now: Instant) {
        self.visible = true;
        self.timer.arm(now, self.delay);
    }

    fn tick(&mut self, now: Instant) {
        if self.timer.fire_if_expired(now) {
            self.visible = false;
        }
    }
}

/// Top-level orchestrator for one playback session.
pub struct ModeStateMachine {
    request: OpenRequest,
    factory: MediaFactory,
    controller: PlaybackController,
    mode: DisplayMode,
    closed: bool,
    media_fault: Option<String>,
    controls: ControlsVisibility,
    floating: Option<DragResizeController>,
    /// In-memory placement, seeded from the store on the first minimized
    /// entry and reused on later entries within this session.
    last_floating: Option<FloatingGeometry>,
    store: Box<dyn PositionStore>,
    pip: PipBridge,
    viewport: Viewport,
    tuning: MachineTuning,
    on_close: Option<Box<dyn FnMut()>>,
}

impl ModeStateMachine {
    /// Open the widget in theater mode against the requested source.
    pub fn open(
        request: OpenRequest,
        mut factory: MediaFactory,
        store: Box<dyn PositionStore>,
        pip_surface: Box<dyn PipSurface>,
        viewport: Viewport,
        tuning: MachineTuning,
        on_close: Box<dyn FnMut()>,
        now: Instant,
    ) -> Self {
        let session = PlaybackSession::new(
            request.source_url.clone(),
            request.title.clone(),
            request.poster_url.clone(),
        );

        let (controller, media_fault) = match factory(&request.source_url) {
            Ok(element) => (
                PlaybackController::new(session, element, tuning.playback),
                None,
            ),
            Err(e) => {
                warn!("media fault while opening {}: {e}", request.title);
                (
                    PlaybackController::detached(session, tuning.playback),
                    Some(e.to_string()),
                )
            }
        };

        let mut machine = Self {
            request,
            factory,
            controller,
            mode: DisplayMode::Theater,
            closed: false,
            media_fault,
            controls: ControlsVisibility::new(tuning.controls_hide_delay),
            floating: None,
            last_floating: None,
            store,
            pip: PipBridge::new(pip_surface),
            viewport,
            tuning,
            on_close: Some(on_close),
        };
        machine.enter_mode(now);
        machine
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn session(&self) -> &PlaybackSession {
        self.controller.session()
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    /// The media fault message, if the session degraded to the poster.
    pub fn media_fault(&self) -> Option<&str> {
        self.media_fault.as_deref()
    }

    /// Whether transport controls are usable (no media fault, not closed).
    pub fn controls_enabled(&self) -> bool {
        !self.closed && self.media_fault.is_none()
    }

    /// Whether the on-screen controls should be drawn right now.
    pub fn controls_visible(&self) -> bool {
        self.controls.visible
    }

    /// Native PiP chrome showing; the widget overlay is suspended.
    pub fn pip_active(&self) -> bool {
        self.pip.is_active()
    }

    pub fn description(&self) -> Option<&str> {
        self.request.description.as_deref()
    }

    /// Transition to another display mode, preserving playback continuity.
    pub fn transition(&mut self, target: DisplayMode, now: Instant) {
        if self.closed || target == self.mode {
            return;
        }
        info!("mode transition {:?} -> {:?}", self.mode, target);

        // 1. Capture continuity state from the outgoing presentation.
        let captured = self.controller.capture();
        // 2. Tear it down: the old decoder must release the source before
        //    the new element attaches, and mode-scoped timers/listeners die
        //    with their mode.
        self.controller.teardown();
        self.teardown_mode_scoped();
        self.mode = target;

        // 3. Mount the new presentation on the same source.
        let session = PlaybackSession::new(
            self.request.source_url.clone(),
            self.request.title.clone(),
            self.request.poster_url.clone(),
        );
        if self.media_fault.is_some() {
            // A faulted session stays on the poster; don't retry the source.
            let mut session = session;
            session.current_time = captured.position;
            session.duration = self.controller.session().duration;
            session.volume = captured.volume;
            session.muted = captured.muted;
            self.controller = PlaybackController::detached(session, self.tuning.playback);
        } else {
            match (self.factory)(&self.request.source_url) {
                Ok(element) => {
                    self.controller =
                        PlaybackController::new(session, element, self.tuning.playback);
                    self.controller.pump();
                    // 4.+5. Seek to the captured position and attempt resume;
                    // an autoplay rejection leaves playback paused.
                    self.controller.replay(&captured);
                    self.controller.pump();
                }
                Err(e) => {
                    warn!("media fault while remounting: {e}");
                    self.media_fault = Some(e.to_string());
                    let mut session = session;
                    session.current_time = captured.position;
                    session.volume = captured.volume;
                    session.muted = captured.muted;
                    self.controller = PlaybackController::detached(session, self.tuning.playback);
                }
            }
        }

        self.enter_mode(now);
    }

    /// Terminal: tear everything down, exit PiP if active, notify the host.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        info!("closing playback widget");
        self.pip.exit();
        self.pip.pump();
        self.controller.teardown();
        self.teardown_mode_scoped();
        self.closed = true;
        if let Some(mut on_close) = self.on_close.take() {
            on_close();
        }
    }

    /// Request native PiP; unsupported/rejected platforms fall back to the
    /// minimized floating window instead of surfacing an error.
    pub fn request_pip(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        match self.pip.request() {
            Ok(()) => {}
            Err(e) => {
                debug!("{e}; falling back to minimized mode");
                self.transition(DisplayMode::Minimized, now);
            }
        }
    }

    /// Dismiss PiP from the widget's restore affordance.
    pub fn exit_pip(&mut self) {
        self.pip.exit();
    }

    /// Pointer movement / touch start anywhere over the presentation.
    /// Resets the theater auto-hide countdown; other modes always show
    /// their controls and never arm it.
    pub fn pointer_activity(&mut self, now: Instant) {
        if self.mode == DisplayMode::Theater {
            self.controls.activity(now);
        }
    }

    /// Per-frame pump: media events, PiP lifecycle, timers.
    pub fn tick(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        let events = self.controller.pump();
        for event in events {
            if let MediaEvent::Fault(message) = event {
                warn!("media fault during playback: {message}");
                self.controller.teardown();
                self.media_fault = Some(message);
            }
        }
        self.controller.tick(now);
        self.controls.tick(now);
        self.pip.pump();
    }

    /// Host viewport changed; the floating window is re-clamped inside it.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(floating) = self.floating.as_mut() {
            floating.set_viewport(viewport);
            self.last_floating = Some(floating.geometry());
        }
    }

    pub fn floating_geometry(&self) -> Option<FloatingGeometry> {
        self.floating.as_ref().map(|f| f.geometry())
    }

    /// Resize direction under the pointer, for cursor feedback.
    pub fn floating_hover(&self, pos: Pos2) -> ResizeDirection {
        self.floating
            .as_ref()
            .map(|f| f.hit_resize(pos))
            .unwrap_or(ResizeDirection::None)
    }

    pub fn floating_interacting(&self) -> bool {
        self.floating
            .as_ref()
            .map(|f| f.is_interacting())
            .unwrap_or(false)
    }

    /// Pointer-down over the floating window. True if a gesture started.
    pub fn float_pointer_pressed(&mut self, pos: Pos2) -> bool {
        self.floating
            .as_mut()
            .map(|f| f.pointer_pressed(pos))
            .unwrap_or(false)
    }

    /// Pointer-move during a gesture. True if the geometry changed.
    pub fn float_pointer_moved(&mut self, pos: Pos2) -> bool {
        let changed = self
            .floating
            .as_mut()
            .map(|f| f.pointer_moved(pos))
            .unwrap_or(false);
        if changed {
            self.last_floating = self.floating.as_ref().map(|f| f.geometry());
        }
        changed
    }

    /// Pointer-up: commit the gesture and persist the placement.
    pub fn float_pointer_released(&mut self) {
        if let Some(geometry) = self.floating.as_mut().and_then(|f| f.pointer_released()) {
            self.last_floating = Some(geometry);
            self.store.save(geometry);
        }
    }

    /// Arm everything scoped to the (already set) current mode.
    fn enter_mode(&mut self, now: Instant) {
        match self.mode {
            DisplayMode::Theater => {
                self.controls.enter_theater(now);
            }
            DisplayMode::Mini => {
                self.controls.leave_theater();
            }
            DisplayMode::Minimized => {
                self.controls.leave_theater();
                let geometry = self
                    .last_floating
                    .or_else(|| self.store.load())
                    .unwrap_or_else(|| FloatingGeometry::default_for(self.viewport))
                    .clamped_to(self.viewport);
                self.last_floating = Some(geometry);
                self.floating = Some(DragResizeController::new(geometry, self.viewport));
            }
        }
    }

    /// Drop everything scoped to the outgoing mode. The single teardown
    /// path: runs on every transition and on close.
    fn teardown_mode_scoped(&mut self) {
        self.controls.leave_theater();
        self.floating = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaElement, MediaError, VideoFrame};
    use crate::persistence::MemoryPositionStore;
    use crate::pip::{PipError, PipEvent};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const HD: Viewport = Viewport {
        width: 1920,
        height: 1080,
    };

    type EventQueue = Rc<RefCell<Vec<MediaEvent>>>;

    struct FakeElement {
        live_counter: Rc<Cell<usize>>,
        pending: EventQueue,
        duration: f64,
        reject_play: bool,
    }

    impl Drop for FakeElement {
        fn drop(&mut self) {
            self.live_counter.set(self.live_counter.get() - 1);
        }
    }

    impl MediaElement for FakeElement {
        fn play(&mut self) -> Result<(), MediaError> {
            if self.reject_play {
                return Err(MediaError::PlayRejected);
            }
            self.pending.borrow_mut().push(MediaEvent::PlayingChanged(true));
            Ok(())
        }

        fn pause(&mut self) {
            self.pending.borrow_mut().push(MediaEvent::PlayingChanged(false));
        }

        fn seek(&mut self, seconds: f64) {
            let clamped = if self.duration > 0.0 {
                seconds.clamp(0.0, self.duration)
            } else {
                seconds.max(0.0)
            };
            self.pending.borrow_mut().push(MediaEvent::PositionChanged(clamped));
        }

        fn set_volume(&mut self, volume: f64) {
            self.pending.borrow_mut().push(MediaEvent::VolumeChanged(volume));
        }

        fn set_muted(&mut self, muted: bool) {
            self.pending.borrow_mut().push(MediaEvent::MutedChanged(muted));
        }

        fn poll(&mut self) -> Vec<MediaEvent> {
            std::mem::take(&mut *self.pending.borrow_mut())
        }

        fn take_frame(&mut self) -> Option<VideoFrame> {
            None
        }
    }

    #[derive(Clone, Default)]
    struct Harness {
        live: Rc<Cell<usize>>,
        peak_live: Rc<Cell<usize>>,
        created: Rc<Cell<usize>>,
        fail_creation: Rc<Cell<bool>>,
        reject_play: Rc<Cell<bool>>,
        /// Event queue of the most recently created element, for injecting
        /// unsolicited engine events (faults, EOS) into a live session.
        last_queue: Rc<RefCell<Option<EventQueue>>>,
    }

    impl Harness {
        fn factory(&self, duration: f64) -> MediaFactory {
            let harness = self.clone();
            Box::new(move |_source| {
                if harness.fail_creation.get() {
                    return Err(MediaError::Fault("codec error".into()));
                }
                harness.live.set(harness.live.get() + 1);
                harness.peak_live.set(harness.peak_live.get().max(harness.live.get()));
                harness.created.set(harness.created.get() + 1);
                let pending: EventQueue =
                    Rc::new(RefCell::new(vec![MediaEvent::DurationChanged(duration)]));
                *harness.last_queue.borrow_mut() = Some(pending.clone());
                Ok(Box::new(FakeElement {
                    live_counter: harness.live.clone(),
                    pending,
                    duration,
                    reject_play: harness.reject_play.get(),
                }) as Box<dyn MediaElement>)
            })
        }

        fn inject(&self, event: MediaEvent) {
            if let Some(queue) = self.last_queue.borrow().as_ref() {
                queue.borrow_mut().push(event);
            }
        }
    }

    #[derive(Default)]
    struct SharedPip {
        supported: bool,
        pending: Vec<PipEvent>,
    }

    struct FakePip(Rc<RefCell<SharedPip>>);

    impl PipSurface for FakePip {
        fn request(&mut self) -> Result<(), PipError> {
            let mut shared = self.0.borrow_mut();
            if !shared.supported {
                return Err(PipError::Unsupported);
            }
            shared.pending.push(PipEvent::Entered);
            Ok(())
        }

        fn close(&mut self) {
            self.0.borrow_mut().pending.push(PipEvent::Exited);
        }

        fn poll(&mut self) -> Vec<PipEvent> {
            std::mem::take(&mut self.0.borrow_mut().pending)
        }
    }

    /// Store handle the test keeps while the machine owns the other end, so
    /// save/load calls stay observable.
    struct SharedStore(Rc<RefCell<MemoryPositionStore>>);

    impl PositionStore for SharedStore {
        fn load(&mut self) -> Option<FloatingGeometry> {
            self.0.borrow_mut().load()
        }

        fn save(&mut self, geometry: FloatingGeometry) {
            self.0.borrow_mut().save(geometry);
        }
    }

    struct Fixture {
        machine: ModeStateMachine,
        harness: Harness,
        pip: Rc<RefCell<SharedPip>>,
        closed: Rc<Cell<bool>>,
        start: Instant,
    }

    fn fixture() -> Fixture {
        fixture_with(Harness::default(), Box::new(MemoryPositionStore::new()), true)
    }

    fn fixture_with(
        harness: Harness,
        store: Box<dyn PositionStore>,
        pip_supported: bool,
    ) -> Fixture {
        let pip = Rc::new(RefCell::new(SharedPip {
            supported: pip_supported,
            pending: Vec::new(),
        }));
        let closed = Rc::new(Cell::new(false));
        let closed_flag = closed.clone();
        let start = Instant::now();
        let machine = ModeStateMachine::open(
            OpenRequest {
                source_url: "https://cdn.example/movie.mp4".into(),
                title: "Movie".into(),
                poster_url: None,
                description: None,
            },
            harness.factory(120.0),
            store,
            Box::new(FakePip(pip.clone())),
            HD,
            MachineTuning::default(),
            Box::new(move || closed_flag.set(true)),
            start,
        );
        Fixture {
            machine,
            harness,
            pip,
            closed,
            start,
        }
    }

    #[test]
    fn opens_in_theater_mode() {
        let f = fixture();
        assert_eq!(f.machine.mode(), DisplayMode::Theater);
        assert!(f.machine.controls_visible());
    }

    #[test]
    fn scenario_a_continuity_into_mini() {
        let mut f = fixture();
        f.machine.tick(f.start);
        f.machine.playback_mut().play();
        f.machine.playback_mut().seek(45.0);
        f.machine.tick(f.start);
        assert!(f.machine.session().is_playing);
        assert_eq!(f.machine.session().current_time, 45.0);

        f.machine.transition(DisplayMode::Mini, f.start);

        assert_eq!(f.machine.mode(), DisplayMode::Mini);
        assert_eq!(f.machine.session().current_time, 45.0);
        assert!(f.machine.session().is_playing, "resume was attempted");
    }

    #[test]
    fn continuity_holds_across_arbitrary_sequences() {
        let mut f = fixture();
        f.machine.tick(f.start);
        f.machine.playback_mut().seek(33.5);
        f.machine.playback_mut().set_volume(0.25);
        f.machine.tick(f.start);

        let sequence = [
            DisplayMode::Minimized,
            DisplayMode::Theater,
            DisplayMode::Mini,
            DisplayMode::Minimized,
            DisplayMode::Mini,
            DisplayMode::Theater,
        ];
        for target in sequence {
            let before = f.machine.session().current_time;
            f.machine.transition(target, f.start);
            assert_eq!(f.machine.mode(), target);
            assert_eq!(f.machine.session().current_time, before);
            assert_eq!(f.machine.session().volume, 0.25);
        }
    }

    #[test]
    fn never_two_live_decoders() {
        let mut f = fixture();
        f.machine.transition(DisplayMode::Mini, f.start);
        f.machine.transition(DisplayMode::Minimized, f.start);
        f.machine.transition(DisplayMode::Theater, f.start);

        assert_eq!(f.harness.created.get(), 4);
        assert_eq!(
            f.harness.peak_live.get(),
            1,
            "old element must be dropped before the new one attaches"
        );
    }

    #[test]
    fn paused_playback_stays_paused_across_transition() {
        let mut f = fixture();
        f.machine.tick(f.start);
        f.machine.playback_mut().seek(10.0);
        f.machine.tick(f.start);
        assert!(!f.machine.session().is_playing);

        f.machine.transition(DisplayMode::Minimized, f.start);
        assert!(!f.machine.session().is_playing);
    }

    #[test]
    fn rejected_resume_stays_paused() {
        let harness = Harness::default();
        let mut f = fixture_with(harness.clone(), Box::new(MemoryPositionStore::new()), true);
        f.machine.tick(f.start);
        f.machine.playback_mut().play();
        f.machine.tick(f.start);
        assert!(f.machine.session().is_playing);

        // The platform refuses autoplay on the remounted element.
        harness.reject_play.set(true);
        f.machine.transition(DisplayMode::Mini, f.start);
        assert!(!f.machine.session().is_playing);
        assert_eq!(f.machine.mode(), DisplayMode::Mini);
        assert!(f.machine.controls_enabled());
    }

    #[test]
    fn theater_controls_hide_after_inactivity() {
        let mut f = fixture();
        assert!(f.machine.controls_visible());
        f.machine.tick(f.start + Duration::from_secs(4));
        assert!(!f.machine.controls_visible());

        f.machine.pointer_activity(f.start + Duration::from_secs(5));
        assert!(f.machine.controls_visible());
        f.machine.tick(f.start + Duration::from_secs(7));
        assert!(f.machine.controls_visible());
        f.machine.tick(f.start + Duration::from_secs(9));
        assert!(!f.machine.controls_visible());
    }

    #[test]
    fn hide_timer_never_fires_outside_theater() {
        let mut f = fixture();
        f.machine.transition(DisplayMode::Mini, f.start);
        f.machine.tick(f.start + Duration::from_secs(60));
        assert!(f.machine.controls_visible());

        f.machine.transition(DisplayMode::Minimized, f.start);
        f.machine.pointer_activity(f.start + Duration::from_secs(61));
        f.machine.tick(f.start + Duration::from_secs(120));
        assert!(f.machine.controls_visible());
    }

    #[test]
    fn mode_change_disarms_pending_hide() {
        let mut f = fixture();
        // Leave theater with the countdown still pending, then wait past it.
        f.machine.transition(DisplayMode::Mini, f.start);
        f.machine.tick(f.start + Duration::from_secs(10));
        assert!(f.machine.controls_visible());
    }

    #[test]
    fn scenario_c_first_minimized_entry_uses_default_placement() {
        let mut f = fixture();
        f.machine.transition(DisplayMode::Minimized, f.start);
        let geometry = f.machine.floating_geometry().unwrap();
        assert_eq!(geometry.x, 1920 - 320 - 24);
        assert_eq!(geometry.y, 24);
    }

    #[test]
    fn saved_placement_is_loaded_on_first_minimized_entry() {
        let saved = FloatingGeometry {
            x: 40,
            y: 60,
            width: 200,
            height: 200,
        };
        let mut f = fixture_with(
            Harness::default(),
            Box::new(MemoryPositionStore::with_saved(saved)),
            true,
        );
        f.machine.transition(DisplayMode::Minimized, f.start);
        assert_eq!(f.machine.floating_geometry(), Some(saved));
    }

    #[test]
    fn drag_commit_persists_and_survives_mode_roundtrip() {
        let mut f = fixture();
        f.machine.transition(DisplayMode::Minimized, f.start);
        let geometry = f.machine.floating_geometry().unwrap();
        let grab = egui::pos2(geometry.x as f32 + 10.0, geometry.y as f32 + 10.0);

        assert!(f.machine.float_pointer_pressed(grab));
        f.machine.float_pointer_moved(egui::pos2(grab.x - 500.0, grab.y + 300.0));
        f.machine.float_pointer_released();

        let moved = f.machine.floating_geometry().unwrap();
        assert_eq!(moved.x, geometry.x - 500);
        assert_eq!(moved.y, geometry.y + 300);

        // The placement sticks across leaving and re-entering the mode.
        f.machine.transition(DisplayMode::Theater, f.start);
        assert!(f.machine.floating_geometry().is_none());
        f.machine.transition(DisplayMode::Minimized, f.start);
        assert_eq!(f.machine.floating_geometry(), Some(moved));
    }

    #[test]
    fn placement_saves_on_commit_not_during_drag() {
        let store = Rc::new(RefCell::new(MemoryPositionStore::new()));
        let mut f = fixture_with(Harness::default(), Box::new(SharedStore(store.clone())), true);
        f.machine.transition(DisplayMode::Minimized, f.start);
        let geometry = f.machine.floating_geometry().unwrap();
        let grab = egui::pos2(geometry.x as f32 + 10.0, geometry.y as f32 + 10.0);

        assert!(f.machine.float_pointer_pressed(grab));
        f.machine.float_pointer_moved(egui::pos2(grab.x - 200.0, grab.y + 100.0));
        f.machine.float_pointer_moved(egui::pos2(grab.x - 400.0, grab.y + 200.0));
        assert_eq!(store.borrow().save_count, 0, "no save while dragging");

        f.machine.float_pointer_released();
        assert_eq!(store.borrow().save_count, 1, "one save per commit");
        assert_eq!(
            store.borrow_mut().load(),
            f.machine.floating_geometry(),
            "committed placement is what was saved"
        );

        // Release without a gesture in progress saves nothing.
        f.machine.float_pointer_released();
        assert_eq!(store.borrow().save_count, 1);
    }

    #[test]
    fn scenario_b_pip_suspends_and_restores_overlay() {
        let mut f = fixture();
        f.machine.request_pip(f.start);
        assert!(!f.machine.pip_active(), "active only once platform confirms");
        f.machine.tick(f.start);
        assert!(f.machine.pip_active());
        assert_eq!(f.machine.mode(), DisplayMode::Theater);

        // Platform-initiated exit (user closed the native surface).
        f.pip.borrow_mut().pending.push(PipEvent::Exited);
        f.machine.tick(f.start);
        assert!(!f.machine.pip_active());
        assert_eq!(f.machine.mode(), DisplayMode::Theater);
    }

    #[test]
    fn unsupported_pip_falls_back_to_minimized() {
        let mut f = fixture_with(Harness::default(), Box::new(MemoryPositionStore::new()), false);
        f.machine.request_pip(f.start);
        assert_eq!(f.machine.mode(), DisplayMode::Minimized);
        assert!(!f.machine.pip_active());
    }

    #[test]
    fn close_tears_down_and_notifies_host() {
        let mut f = fixture();
        f.machine.request_pip(f.start);
        f.machine.tick(f.start);
        assert!(f.machine.pip_active());

        f.machine.close();
        assert!(f.machine.is_closed());
        assert!(f.closed.get(), "host close callback fired");
        assert_eq!(f.harness.live.get(), 0, "decoder released");
        assert!(!f.machine.pip_active(), "pip exited on close");

        // Terminal: further transitions are ignored.
        f.machine.transition(DisplayMode::Mini, f.start);
        assert_eq!(f.machine.mode(), DisplayMode::Theater);
    }

    #[test]
    fn close_in_same_frame_as_pip_request_dismisses_surface() {
        let mut f = fixture();
        f.machine.request_pip(f.start);
        // No tick in between: the platform's `Entered` is still queued when
        // the widget closes.
        f.machine.close();

        assert!(f.machine.is_closed());
        assert!(!f.machine.pip_active(), "pip must not outlive the widget");
        assert!(
            f.pip.borrow().pending.is_empty(),
            "entry and exit both reconciled"
        );
    }

    #[test]
    fn media_fault_degrades_to_poster_without_retry() {
        let harness = Harness::default();
        let mut f = fixture_with(harness.clone(), Box::new(MemoryPositionStore::new()), true);
        f.machine.tick(f.start);
        f.machine.playback_mut().seek(30.0);
        f.machine.tick(f.start);

        harness.fail_creation.set(true);
        f.machine.transition(DisplayMode::Mini, f.start);

        assert!(f.machine.media_fault().is_some());
        assert!(!f.machine.controls_enabled());
        assert_eq!(f.machine.session().current_time, 30.0);

        // Later transitions keep the poster fallback instead of retrying.
        let created_before = harness.created.get();
        harness.fail_creation.set(false);
        f.machine.transition(DisplayMode::Theater, f.start);
        assert_eq!(harness.created.get(), created_before);
        assert!(f.machine.media_fault().is_some());
    }

    #[test]
    fn fault_event_during_playback_degrades_to_poster() {
        let mut f = fixture();
        f.machine.tick(f.start);
        f.machine.playback_mut().play();
        f.machine.playback_mut().seek(12.0);
        f.machine.tick(f.start);
        assert!(f.machine.controls_enabled());

        // A fault surfaces through the event stream mid-session.
        f.harness.inject(MediaEvent::Fault("network stall".into()));
        f.machine.tick(f.start);

        assert_eq!(f.machine.media_fault(), Some("network stall"));
        assert!(!f.machine.controls_enabled());
        assert!(!f.machine.playback().has_element());
        assert_eq!(f.harness.live.get(), 0, "decoder released on fault");
        // Position survives for display next to the poster.
        assert_eq!(f.machine.session().current_time, 12.0);
    }

    #[test]
    fn transition_to_current_mode_is_a_noop() {
        let mut f = fixture();
        let created_before = f.harness.created.get();
        f.machine.transition(DisplayMode::Theater, f.start);
        assert_eq!(f.harness.created.get(), created_before);
    }
}
