//! Floating-window geometry, dragging and resizing.
//!
//! Active only while the widget is in minimized mode. Pointer-down on the
//! title strip begins a drag; pointer-down on an edge or corner begins a
//! resize. Every move is clamped so the window never leaves the viewport,
//! and every committed change (pointer release) is reported so the owner can
//! persist it.

use egui::{Pos2, Rect};

/// Per-axis size bounds for the floating window, in pixels.
pub const MIN_FLOAT_SIZE: u32 = 150;
pub const MAX_FLOAT_SIZE: u32 = 600;

/// Width of the edge band that starts a resize instead of a drag.
const RESIZE_BORDER: f32 = 6.0;
/// Height of the title strip that acts as the drag handle.
pub const DRAG_HANDLE_HEIGHT: f32 = 28.0;

/// Viewports narrower than this get the smaller default inset.
const NARROW_VIEWPORT: u32 = 768;
const INSET_DESKTOP: i32 = 24;
const INSET_NARROW: i32 = 12;

/// Default floating window size (16:9, within the size bounds).
const DEFAULT_FLOAT_WIDTH: u32 = 320;
const DEFAULT_FLOAT_HEIGHT: u32 = 180;

/// Host viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Placement of the floating window. Meaningful only in minimized mode;
/// persisted globally under one fixed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FloatingGeometry {
    /// Default placement for a first-ever entry into minimized mode: top-right
    /// corner, inset by a margin that shrinks on narrow viewports.
    pub fn default_for(viewport: Viewport) -> Self {
        let inset = if viewport.width < NARROW_VIEWPORT {
            INSET_NARROW
        } else {
            INSET_DESKTOP
        };
        let geometry = Self {
            x: viewport.width as i32 - DEFAULT_FLOAT_WIDTH as i32 - inset,
            y: inset,
            width: DEFAULT_FLOAT_WIDTH,
            height: DEFAULT_FLOAT_HEIGHT,
        };
        geometry.clamped_to(viewport)
    }

    /// Clamp size to `[MIN, MAX]` per axis and position so the window stays
    /// fully inside the viewport.
    pub fn clamped_to(mut self, viewport: Viewport) -> Self {
        self.width = self.width.clamp(MIN_FLOAT_SIZE, MAX_FLOAT_SIZE);
        self.height = self.height.clamp(MIN_FLOAT_SIZE, MAX_FLOAT_SIZE);

        let max_x = (viewport.width as i32 - self.width as i32).max(0);
        let max_y = (viewport.height as i32 - self.height as i32).max(0);
        self.x = self.x.clamp(0, max_x);
        self.y = self.y.clamp(0, max_y);
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(
            egui::pos2(self.x as f32, self.y as f32),
            egui::vec2(self.width as f32, self.height as f32),
        )
    }
}

/// Which edge or corner a resize grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeDirection {
    None,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeDirection {
    pub fn cursor(self) -> egui::CursorIcon {
        match self {
            ResizeDirection::Left | ResizeDirection::Right => egui::CursorIcon::ResizeHorizontal,
            ResizeDirection::Top | ResizeDirection::Bottom => egui::CursorIcon::ResizeVertical,
            ResizeDirection::TopLeft | ResizeDirection::BottomRight => {
                egui::CursorIcon::ResizeNwSe
            }
            ResizeDirection::TopRight | ResizeDirection::BottomLeft => {
                egui::CursorIcon::ResizeNeSw
            }
            ResizeDirection::None => egui::CursorIcon::Default,
        }
    }

    fn affects_left(self) -> bool {
        matches!(
            self,
            ResizeDirection::Left | ResizeDirection::TopLeft | ResizeDirection::BottomLeft
        )
    }

    fn affects_right(self) -> bool {
        matches!(
            self,
            ResizeDirection::Right | ResizeDirection::TopRight | ResizeDirection::BottomRight
        )
    }

    fn affects_top(self) -> bool {
        matches!(
            self,
            ResizeDirection::Top | ResizeDirection::TopLeft | ResizeDirection::TopRight
        )
    }

    fn affects_bottom(self) -> bool {
        matches!(
            self,
            ResizeDirection::Bottom | ResizeDirection::BottomLeft | ResizeDirection::BottomRight
        )
    }
}

/// What the pointer is interacting with.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    /// Dragging; the offset from the window origin to the grab point stays
    /// constant for the whole gesture.
    Dragging { grab_dx: f32, grab_dy: f32 },
    /// Resizing from the geometry captured at pointer-down.
    Resizing {
        direction: ResizeDirection,
        start: FloatingGeometry,
        origin: Pos2,
    },
}

/// Pointer-driven reposition/resize of the floating window.
///
/// Created on entry to minimized mode and dropped on exit, so its gesture
/// state can never leak into another mode.
pub struct DragResizeController {
    geometry: FloatingGeometry,
    viewport: Viewport,
    phase: Phase,
}

impl DragResizeController {
    pub fn new(geometry: FloatingGeometry, viewport: Viewport) -> Self {
        Self {
            geometry: geometry.clamped_to(viewport),
            viewport,
            phase: Phase::Idle,
        }
    }

    pub fn geometry(&self) -> FloatingGeometry {
        self.geometry
    }

    pub fn is_interacting(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Re-clamp after a viewport change so the window stays visible.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.geometry = self.geometry.clamped_to(viewport);
        }
    }

    /// Classify a hover position: edge band -> resize direction.
    pub fn hit_resize(&self, pos: Pos2) -> ResizeDirection {
        let rect = self.geometry.rect();
        // A small reach outside the rect keeps thin edges grabbable.
        if !rect.expand(RESIZE_BORDER).contains(pos) {
            return ResizeDirection::None;
        }
        let at_left = pos.x < rect.min.x + RESIZE_BORDER;
        let at_right = pos.x > rect.max.x - RESIZE_BORDER;
        let at_top = pos.y < rect.min.y + RESIZE_BORDER;
        let at_bottom = pos.y > rect.max.y - RESIZE_BORDER;

        match (at_left, at_right, at_top, at_bottom) {
            (true, false, true, false) => ResizeDirection::TopLeft,
            (false, true, true, false) => ResizeDirection::TopRight,
            (true, false, false, true) => ResizeDirection::BottomLeft,
            (false, true, false, true) => ResizeDirection::BottomRight,
            (true, false, false, false) => ResizeDirection::Left,
            (false, true, false, false) => ResizeDirection::Right,
            (false, false, true, false) => ResizeDirection::Top,
            (false, false, false, true) => ResizeDirection::Bottom,
            _ => ResizeDirection::None,
        }
    }

    /// Whether a position falls on the drag handle (title strip).
    pub fn hit_drag_handle(&self, pos: Pos2) -> bool {
        let rect = self.geometry.rect();
        rect.contains(pos) && pos.y < rect.min.y + DRAG_HANDLE_HEIGHT
    }

    /// Begin a gesture. Returns true if the press started a drag or resize.
    pub fn pointer_pressed(&mut self, pos: Pos2) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        let direction = self.hit_resize(pos);
        if direction != ResizeDirection::None {
            self.phase = Phase::Resizing {
                direction,
                start: self.geometry,
                origin: pos,
            };
            return true;
        }
        if self.hit_drag_handle(pos) {
            self.phase = Phase::Dragging {
                grab_dx: pos.x - self.geometry.x as f32,
                grab_dy: pos.y - self.geometry.y as f32,
            };
            return true;
        }
        false
    }

    /// Advance an active gesture. Returns true if the geometry changed.
    pub fn pointer_moved(&mut self, pos: Pos2) -> bool {
        let updated = match self.phase {
            Phase::Idle => return false,
            Phase::Dragging { grab_dx, grab_dy } => FloatingGeometry {
                x: (pos.x - grab_dx).round() as i32,
                y: (pos.y - grab_dy).round() as i32,
                ..self.geometry
            },
            Phase::Resizing {
                direction,
                start,
                origin,
            } => resize_from(start, direction, pos.x - origin.x, pos.y - origin.y),
        }
        .clamped_to(self.viewport);

        if updated != self.geometry {
            self.geometry = updated;
            true
        } else {
            false
        }
    }

    /// End the gesture. Returns the geometry to persist if one was active.
    pub fn pointer_released(&mut self) -> Option<FloatingGeometry> {
        if self.phase == Phase::Idle {
            return None;
        }
        self.phase = Phase::Idle;
        Some(self.geometry)
    }
}

/// Apply a pointer delta to the captured start geometry. Width and height
/// adjust independently (no forced aspect ratio); the opposite edge stays
/// anchored, so left/top resizes move the origin.
fn resize_from(
    start: FloatingGeometry,
    direction: ResizeDirection,
    dx: f32,
    dy: f32,
) -> FloatingGeometry {
    let mut x = start.x as f32;
    let mut y = start.y as f32;
    let mut w = start.width as f32;
    let mut h = start.height as f32;

    let min = MIN_FLOAT_SIZE as f32;
    let max = MAX_FLOAT_SIZE as f32;

    if direction.affects_right() {
        w = (w + dx).clamp(min, max);
    }
    if direction.affects_left() {
        let new_w = (w - dx).clamp(min, max);
        x += w - new_w;
        w = new_w;
    }
    if direction.affects_bottom() {
        h = (h + dy).clamp(min, max);
    }
    if direction.affects_top() {
        let new_h = (h - dy).clamp(min, max);
        y += h - new_h;
        h = new_h;
    }

    FloatingGeometry {
        x: x.round() as i32,
        y: y.round() as i32,
        width: w.round() as u32,
        height: h.round() as u32,
    }
}
