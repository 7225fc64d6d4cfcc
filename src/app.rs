//! eframe application layer.
//!
//! A thin frame loop around the mode state machine: route input, pump the
//! pipeline, upload the latest decoded frame, paint whichever presentation
//! the machine says is active.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use eframe::egui;
use tracing::info;

use crate::config::{Action, Config, InputBinding};
use crate::drag_resize::Viewport;
use crate::media::MediaFactory;
use crate::mode::{DisplayMode, ModeStateMachine, OpenRequest};
use crate::persistence::PositionStore;
use crate::pip::{PipError, PipEvent, PipSurface};
use crate::ui;

/// PiP lifecycle shared between the state machine's surface handle and the
/// frame loop that actually drives the OS viewport.
#[derive(Default)]
struct PipShared {
    open: bool,
    pending: Vec<PipEvent>,
}

/// `PipSurface` backed by an always-on-top egui viewport.
struct ViewportPipSurface(Rc<RefCell<PipShared>>);

impl PipSurface for ViewportPipSurface {
    fn request(&mut self) -> Result<(), PipError> {
        let mut shared = self.0.borrow_mut();
        if !shared.open {
            shared.open = true;
            shared.pending.push(PipEvent::Entered);
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut shared = self.0.borrow_mut();
        if shared.open {
            shared.open = false;
            shared.pending.push(PipEvent::Exited);
        }
    }

    fn poll(&mut self) -> Vec<PipEvent> {
        std::mem::take(&mut self.0.borrow_mut().pending)
    }
}

pub struct PlayerApp {
    machine: ModeStateMachine,
    config: Config,
    pip: Rc<RefCell<PipShared>>,
    texture: Option<egui::TextureHandle>,
    poster: Option<egui::TextureHandle>,
    close_sent: bool,
}

impl PlayerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        request: OpenRequest,
        factory: MediaFactory,
        store: Box<dyn PositionStore>,
        config: Config,
    ) -> Self {
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::BLACK;
        visuals.panel_fill = egui::Color32::BLACK;
        cc.egui_ctx.set_visuals(visuals);

        let pip = Rc::new(RefCell::new(PipShared::default()));
        let viewport = screen_viewport(&cc.egui_ctx);
        let title = request.title.clone();
        let poster = request
            .poster_url
            .as_deref()
            .and_then(|source| load_poster(&cc.egui_ctx, source));

        let mut machine = ModeStateMachine::open(
            request,
            factory,
            store,
            Box::new(ViewportPipSurface(pip.clone())),
            viewport,
            config.machine_tuning(),
            Box::new(move || info!("playback of {title} closed")),
            Instant::now(),
        );
        machine.playback_mut().set_volume(config.default_volume);
        if config.muted_by_default {
            machine.playback_mut().toggle_mute();
        }

        Self {
            machine,
            config,
            pip,
            texture: None,
            poster,
            close_sent: false,
        }
    }

    fn run_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::PlayPause => self.machine.playback_mut().toggle(),
            Action::Mute => self.machine.playback_mut().toggle_mute(),
            Action::SkipForward => self.machine.playback_mut().skip_forward(now),
            Action::SkipBackward => self.machine.playback_mut().skip_backward(now),
            Action::VolumeUp => {
                let volume = self.machine.session().volume + self.config.volume_step;
                self.machine.playback_mut().set_volume(volume);
            }
            Action::VolumeDown => {
                let volume = self.machine.session().volume - self.config.volume_step;
                self.machine.playback_mut().set_volume(volume);
            }
            Action::TheaterMode => self.machine.transition(DisplayMode::Theater, now),
            Action::MiniMode => self.machine.transition(DisplayMode::Mini, now),
            Action::MinimizeMode => self.machine.transition(DisplayMode::Minimized, now),
            Action::PictureInPicture => self.machine.request_pip(now),
            Action::Close => self.machine.close(),
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context, now: Instant) {
        let mut actions = Vec::new();
        ctx.input(|input| {
            for event in &input.events {
                let egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    modifiers,
                    ..
                } = event
                else {
                    continue;
                };
                let binding = if modifiers.ctrl {
                    InputBinding::KeyWithCtrl(*key)
                } else if modifiers.shift {
                    InputBinding::KeyWithShift(*key)
                } else if modifiers.alt {
                    InputBinding::KeyWithAlt(*key)
                } else {
                    InputBinding::Key(*key)
                };
                if let Some(action) = self.config.action_for(&binding) {
                    actions.push(action);
                }
            }
        });
        for action in actions {
            self.machine.pointer_activity(now);
            self.run_action(action, now);
        }
    }

    /// Drag/resize gestures for the floating window. Routed by hand because
    /// the window is painted, not a real egui window.
    fn handle_floating_pointer(&mut self, ctx: &egui::Context) {
        if self.machine.mode() != DisplayMode::Minimized {
            return;
        }

        let (pointer_pos, pressed, released) = ctx.input(|input| {
            (
                input.pointer.latest_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
            )
        });
        let Some(pos) = pointer_pos else {
            if released {
                self.machine.float_pointer_released();
            }
            return;
        };

        if pressed {
            self.machine.float_pointer_pressed(pos);
        } else if self.machine.floating_interacting() {
            self.machine.float_pointer_moved(pos);
        }
        if released {
            self.machine.float_pointer_released();
        }

        let cursor = if self.machine.floating_interacting() {
            egui::CursorIcon::Grabbing
        } else {
            self.machine.floating_hover(pos).cursor()
        };
        ctx.set_cursor_icon(cursor);
    }

    fn upload_frame(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.machine.playback_mut().take_frame() {
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [frame.width as usize, frame.height as usize],
                &frame.pixels,
            );
            match self.texture.as_mut() {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture =
                        Some(ctx.load_texture("video-frame", image, egui::TextureOptions::LINEAR));
                }
            }
        }
    }

    /// Aspect-fit the current frame into `rect`, poster fallback otherwise.
    fn paint_video(&self, ui: &egui::Ui, rect: egui::Rect) {
        ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);

        let texture = if self.machine.media_fault().is_some() {
            self.poster.as_ref()
        } else {
            self.texture.as_ref().or(self.poster.as_ref())
        };
        let Some(texture) = texture else {
            ui::draw_poster_panel(ui, &self.machine, rect);
            return;
        };

        let size = texture.size_vec2();
        if size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let scale = (rect.width() / size.x).min(rect.height() / size.y);
        let fitted = egui::Rect::from_center_size(rect.center(), size * scale);
        ui.painter().image(
            texture.id(),
            fitted,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
        if self.machine.media_fault().is_some() {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Playback unavailable",
                egui::FontId::proportional(18.0),
                egui::Color32::WHITE,
            );
        }
    }

    fn paint_presentation(&mut self, ui: &mut egui::Ui, area: egui::Rect, now: Instant) {
        self.paint_video(ui, area);

        if let Some(direction) = self.machine.playback().skip_indicator() {
            ui::draw_skip_indicator(ui, area, direction);
        }
        if self.machine.controls_visible() {
            ui::draw_transport_bar(ui, &mut self.machine, now, ui::transport_bar_rect(area));
        }
    }

    fn paint_mini(&mut self, ui: &mut egui::Ui, now: Instant) {
        let screen = ui.max_rect();
        // Scrim behind the centered modal.
        ui.painter()
            .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(200));

        let width = (screen.width() * 0.6).clamp(320.0, 960.0);
        let height = width * 9.0 / 16.0 + 48.0;
        let modal = egui::Rect::from_center_size(screen.center(), egui::vec2(width, height));
        self.paint_presentation(ui, modal, now);

        if let Some(description) = self.machine.description() {
            ui.painter().text(
                egui::pos2(modal.center().x, modal.bottom() + 18.0),
                egui::Align2::CENTER_CENTER,
                description,
                egui::FontId::proportional(12.0),
                egui::Color32::GRAY,
            );
        }
    }

    fn paint_minimized(&mut self, ui: &mut egui::Ui, now: Instant) {
        let Some(geometry) = self.machine.floating_geometry() else {
            return;
        };
        let window = geometry.rect();

        self.paint_video(ui, window);
        ui.painter().rect_stroke(
            window,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::from_gray(60)),
        );
        ui::draw_title_strip(ui, &mut self.machine, now, ui::title_strip_rect(window));
    }

    /// Drive the native PiP viewport while the platform surface is open.
    fn drive_pip_viewport(&mut self, ctx: &egui::Context) {
        if !self.pip.borrow().open {
            return;
        }

        let mut close_requested = false;
        let title = self.machine.session().title.clone();
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("pip-window"),
            egui::ViewportBuilder::default()
                .with_title(title)
                .with_inner_size([320.0, 180.0])
                .with_always_on_top()
                .with_decorations(false),
            |ctx, _class| {
                egui::CentralPanel::default()
                    .frame(egui::Frame::none().fill(egui::Color32::BLACK))
                    .show(ctx, |ui| {
                        let area = ui.max_rect();
                        self.paint_video(ui, area);
                        // Dismiss affordance in the corner of the PiP window.
                        ui.allocate_new_ui(
                            egui::UiBuilder::new().max_rect(ui::title_strip_rect(area)),
                            |ui| {
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        if ui.button("✕").clicked() {
                                            close_requested = true;
                                        }
                                    },
                                );
                            },
                        );
                    });
                if ctx.input(|i| i.viewport().close_requested()) {
                    close_requested = true;
                }
            },
        );

        if close_requested {
            // User dismissed the native surface; the machine observes the
            // exit on its next pump.
            let mut shared = self.pip.borrow_mut();
            shared.open = false;
            shared.pending.push(PipEvent::Exited);
        }
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.machine.set_viewport(screen_viewport(ctx));

        if ctx.input(|i| i.pointer.is_moving() || i.pointer.any_down()) {
            self.machine.pointer_activity(now);
        }
        self.handle_keyboard(ctx, now);
        self.handle_floating_pointer(ctx);

        self.machine.tick(now);
        self.upload_frame(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                if self.machine.pip_active() {
                    let area = ui.max_rect();
                    ui::draw_pip_placeholder(ui, &mut self.machine, area);
                    return;
                }
                match self.machine.mode() {
                    DisplayMode::Theater => {
                        let area = ui.max_rect();
                        self.paint_presentation(ui, area, now);
                    }
                    DisplayMode::Mini => self.paint_mini(ui, now),
                    DisplayMode::Minimized => self.paint_minimized(ui, now),
                }
            });

        self.drive_pip_viewport(ctx);

        if self.machine.is_closed() && !self.close_sent {
            self.close_sent = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // Video and timers advance continuously.
        ctx.request_repaint();
    }
}

fn screen_viewport(ctx: &egui::Context) -> Viewport {
    let screen = ctx.screen_rect();
    Viewport {
        width: screen.width().max(1.0) as u32,
        height: screen.height().max(1.0) as u32,
    }
}

/// Decode a local poster image. Remote posters are skipped; the host hands
/// us a path or file URI when it wants one shown.
fn load_poster(ctx: &egui::Context, source: &str) -> Option<egui::TextureHandle> {
    if source.contains("://") && !source.starts_with("file://") {
        tracing::debug!("skipping remote poster {source}");
        return None;
    }
    let path = source.strip_prefix("file://").unwrap_or(source);
    let rgba = match image::open(path) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            tracing::warn!("could not load poster {path}: {e}");
            return None;
        }
    };
    let (width, height) = rgba.dimensions();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(
        [width as usize, height as usize],
        rgba.as_raw(),
    );
    Some(ctx.load_texture("poster", color_image, egui::TextureOptions::LINEAR))
}
