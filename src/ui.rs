//! On-screen controls.
//!
//! Drawing helpers for the transport bar, the minimized title strip, the
//! skip indicator and the poster fallback. They mutate the state machine
//! directly, so the app layer stays a thin frame loop.

use std::time::Instant;

use eframe::egui;

use crate::mode::{DisplayMode, ModeStateMachine};
use crate::playback::{format_time, SkipDirection};

const BAR_HEIGHT: f32 = 48.0;
const STRIP_HEIGHT: f32 = 28.0;

/// Transport bar along the bottom of the presentation.
pub fn draw_transport_bar(
    ui: &mut egui::Ui,
    machine: &mut ModeStateMachine,
    now: Instant,
    bar_rect: egui::Rect,
) {
    let enabled = machine.controls_enabled();

    ui.painter()
        .rect_filled(bar_rect, 0.0, egui::Color32::from_black_alpha(160));

    ui.allocate_new_ui(egui::UiBuilder::new().max_rect(bar_rect), |ui| {
        ui.set_min_height(bar_rect.height());
        ui.add_enabled_ui(enabled, |ui| {
            ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                ui.add_space(10.0);

                let playing = machine.session().is_playing;
                let play_icon = if playing { "⏸" } else { "▶" };
                if flat_button(ui, play_icon, 16.0).clicked() {
                    machine.playback_mut().toggle();
                }

                ui.add_space(6.0);
                if flat_button(ui, "⏪", 14.0).clicked() {
                    machine.playback_mut().skip_backward(now);
                }
                if flat_button(ui, "⏩", 14.0).clicked() {
                    machine.playback_mut().skip_forward(now);
                }

                ui.add_space(10.0);
                let session = machine.session();
                ui.label(
                    egui::RichText::new(format_time(session.current_time))
                        .color(egui::Color32::WHITE)
                        .size(12.0),
                );
                ui.label(egui::RichText::new("/").color(egui::Color32::GRAY).size(12.0));
                ui.label(
                    egui::RichText::new(format_time(session.duration))
                        .color(egui::Color32::GRAY)
                        .size(12.0),
                );

                ui.add_space(10.0);

                // Seek bar takes the space left of the right-side cluster.
                let mut position = machine.session().current_time;
                let duration = machine.session().duration.max(0.001);
                let seek = ui.add(
                    egui::Slider::new(&mut position, 0.0..=duration)
                        .show_value(false)
                        .trailing_fill(true),
                );
                if seek.changed() || seek.drag_stopped() {
                    machine.playback_mut().seek(position);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.add_space(10.0);

                    let mode_buttons = [
                        (DisplayMode::Theater, "⛶", "Theater"),
                        (DisplayMode::Mini, "🗗", "Mini player"),
                        (DisplayMode::Minimized, "🗕", "Minimize"),
                    ];
                    for (target, icon, tip) in mode_buttons {
                        if target == machine.mode() {
                            continue;
                        }
                        if flat_button(ui, icon, 14.0).on_hover_text(tip).clicked() {
                            machine.transition(target, now);
                        }
                    }
                    if flat_button(ui, "⧉", 14.0)
                        .on_hover_text("Picture in picture")
                        .clicked()
                    {
                        machine.request_pip(now);
                    }

                    ui.add_space(8.0);

                    let mute_icon = if machine.session().muted { "🔇" } else { "🔊" };
                    if flat_button(ui, mute_icon, 14.0).clicked() {
                        machine.playback_mut().toggle_mute();
                    }

                    let mut volume = machine.session().volume as f32;
                    let vol = ui.add(
                        egui::Slider::new(&mut volume, 0.0..=1.0)
                            .show_value(false),
                    );
                    if vol.changed() {
                        machine.playback_mut().set_volume(volume as f64);
                    }

                    ui.add_space(10.0);
                });
            });
        });
    });
}

/// Title strip across the top of the floating window; doubles as the drag
/// handle (pointer gestures route through the state machine, not egui).
pub fn draw_title_strip(
    ui: &mut egui::Ui,
    machine: &mut ModeStateMachine,
    now: Instant,
    strip_rect: egui::Rect,
) {
    ui.painter()
        .rect_filled(strip_rect, 0.0, egui::Color32::from_black_alpha(200));

    ui.allocate_new_ui(egui::UiBuilder::new().max_rect(strip_rect), |ui| {
        ui.set_min_height(strip_rect.height());
        ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
            ui.add_space(8.0);
            ui.label(
                egui::RichText::new(&machine.session().title)
                    .color(egui::Color32::WHITE)
                    .size(12.0),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.add_space(4.0);
                if flat_button(ui, "✕", 12.0).on_hover_text("Close").clicked() {
                    machine.close();
                }
                if flat_button(ui, "⛶", 12.0).on_hover_text("Theater").clicked() {
                    machine.transition(DisplayMode::Theater, now);
                }
            });
        });
    });
}

/// Transient feedback after a skip, centered over the video.
pub fn draw_skip_indicator(ui: &egui::Ui, rect: egui::Rect, direction: SkipDirection) {
    let text = match direction {
        SkipDirection::Forward => "⏩ 10s",
        SkipDirection::Backward => "⏪ 10s",
    };
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(28.0),
        egui::Color32::from_white_alpha(220),
    );
}

/// Fallback shown instead of video when the media element faulted or no
/// frame has arrived yet.
pub fn draw_poster_panel(ui: &egui::Ui, machine: &ModeStateMachine, rect: egui::Rect) {
    ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
    if let Some(message) = machine.media_fault() {
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Playback unavailable",
            egui::FontId::proportional(18.0),
            egui::Color32::WHITE,
        );
        ui.painter().text(
            rect.center() + egui::vec2(0.0, 26.0),
            egui::Align2::CENTER_CENTER,
            message,
            egui::FontId::proportional(12.0),
            egui::Color32::GRAY,
        );
    } else {
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            &machine.session().title,
            egui::FontId::proportional(18.0),
            egui::Color32::GRAY,
        );
    }
}

/// Badge shown while the native PiP window owns the video, with a restore
/// affordance that pulls playback back into the widget.
pub fn draw_pip_placeholder(
    ui: &mut egui::Ui,
    machine: &mut ModeStateMachine,
    rect: egui::Rect,
) {
    ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
    ui.painter().text(
        rect.center() - egui::vec2(0.0, 18.0),
        egui::Align2::CENTER_CENTER,
        "Playing in picture-in-picture",
        egui::FontId::proportional(16.0),
        egui::Color32::GRAY,
    );

    let button_rect =
        egui::Rect::from_center_size(rect.center() + egui::vec2(0.0, 18.0), egui::vec2(90.0, 26.0));
    ui.allocate_new_ui(egui::UiBuilder::new().max_rect(button_rect), |ui| {
        if ui.button("Restore").clicked() {
            machine.exit_pip();
        }
    });
}

pub fn transport_bar_rect(area: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_max(
        egui::pos2(area.left(), area.bottom() - BAR_HEIGHT),
        area.max,
    )
}

pub fn title_strip_rect(area: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_max(
        area.min,
        egui::pos2(area.right(), area.top() + STRIP_HEIGHT),
    )
}

fn flat_button(ui: &mut egui::Ui, icon: &str, size: f32) -> egui::Response {
    ui.add(
        egui::Button::new(
            egui::RichText::new(icon)
                .size(size)
                .color(egui::Color32::WHITE),
        )
        .frame(false),
    )
}
