use eframe::egui::{Pos2, Vec2, pos2};

pub(super) const DEFAULT_MIN_SCALE: f32 = 0.1;
pub(super) const DEFAULT_MAX_SCALE: f32 = 4.0;

/// Maps world coordinates to surface-local screen coordinates:
/// `screen = world * scale + translate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Viewport {
    pub(super) translate: Vec2,
    pub(super) scale: f32,
    min_scale: f32,
    max_scale: f32,
    size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCALE, DEFAULT_MAX_SCALE)
    }
}

impl Viewport {
    pub(super) fn new(min_scale: f32, max_scale: f32) -> Self {
        let min_scale = min_scale.max(0.01);
        let max_scale = max_scale.max(min_scale);
        Self {
            translate: Vec2::ZERO,
            scale: 1.0_f32.clamp(min_scale, max_scale),
            min_scale,
            max_scale,
            size: Vec2::ZERO,
        }
    }

    pub(super) fn size(&self) -> Vec2 {
        self.size
    }

    pub(super) fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translate) / self.scale
    }

    pub(super) fn world_to_screen(&self, world: Vec2) -> Pos2 {
        (world * self.scale + self.translate).to_pos2()
    }

    /// World point shown at the middle of the surface.
    pub(super) fn world_center(&self) -> Vec2 {
        self.screen_to_world(pos2(self.size.x * 0.5, self.size.y * 0.5))
    }

    /// Scales by `factor` while keeping the world point under `anchor` fixed.
    pub(super) fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world = self.screen_to_world(anchor);
        self.scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        self.translate = anchor.to_vec2() - world * self.scale;
    }

    /// Mouse-wheel zoom with the per-event step clamped.
    pub(super) fn zoom_wheel(&mut self, anchor: Pos2, scroll: f32) {
        if scroll.abs() <= f32::EPSILON {
            return;
        }
        self.zoom_at(anchor, (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15));
    }

    pub(super) fn pan_by(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    /// Keeps the current world centre in the middle when the surface changes
    /// size. The first resize centres the world origin.
    pub(super) fn resize(&mut self, size: Vec2) {
        let size = size.max(Vec2::ZERO);
        if self.size == Vec2::ZERO {
            self.size = size;
            self.translate = size * 0.5;
            return;
        }
        let center = self.world_center();
        self.size = size;
        self.center_on(center);
    }

    pub(super) fn center_on(&mut self, world: Vec2) {
        self.translate = self.size * 0.5 - world * self.scale;
    }

    pub(super) fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    pub(super) fn reset(&mut self) {
        self.scale = 1.0_f32.clamp(self.min_scale, self.max_scale);
        self.translate = self.size * 0.5;
    }
}
