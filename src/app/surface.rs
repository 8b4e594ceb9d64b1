use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

use super::graph::view::{PaintStats, Scene, paint_scene};

/// Drawing backend for the graph canvas. Coordinates are surface-local, with
/// the origin at the surface's top-left corner.
pub(super) trait RenderSurface {
    type Handle;

    fn init(&mut self, handle: Self::Handle);
    fn resize(&mut self, size: Vec2);
    fn size(&self) -> Vec2;
    fn clear(&mut self, color: Color32);
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke);
    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, outline: Stroke);
    fn ring(&mut self, center: Pos2, radius: f32, stroke: Stroke);
    fn text(&mut self, anchor: Pos2, text: &str, size: f32, color: Color32);
    fn dispose(&mut self);

    fn draw(&mut self, scene: &Scene<'_>) -> PaintStats
    where
        Self: Sized,
    {
        paint_scene(self, scene)
    }
}

/// Paints through an egui [`Painter`] clipped to the canvas rect.
#[derive(Default)]
pub(super) struct EguiSurface {
    painter: Option<Painter>,
    origin: Pos2,
    size: Vec2,
}

impl EguiSurface {
    fn to_screen(&self, point: Pos2) -> Pos2 {
        point + self.origin.to_vec2()
    }
}

impl RenderSurface for EguiSurface {
    type Handle = Painter;

    /// Takes the frame's painter; its clip rect becomes the surface origin.
    /// The size is set separately through `resize`.
    fn init(&mut self, painter: Painter) {
        self.origin = painter.clip_rect().min;
        self.painter = Some(painter);
    }

    fn resize(&mut self, size: Vec2) {
        self.size = size;
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self, color: Color32) {
        if let Some(painter) = &self.painter {
            painter.rect_filled(Rect::from_min_size(self.origin, self.size), 0.0, color);
        }
    }

    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        if let Some(painter) = &self.painter {
            painter.line_segment([self.to_screen(from), self.to_screen(to)], stroke);
        }
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, outline: Stroke) {
        if let Some(painter) = &self.painter {
            let center = self.to_screen(center);
            painter.circle_filled(center, radius, fill);
            painter.circle_stroke(center, radius, outline);
        }
    }

    fn ring(&mut self, center: Pos2, radius: f32, stroke: Stroke) {
        if let Some(painter) = &self.painter {
            painter.circle_stroke(self.to_screen(center), radius, stroke);
        }
    }

    fn text(&mut self, anchor: Pos2, text: &str, size: f32, color: Color32) {
        if let Some(painter) = &self.painter {
            painter.text(
                self.to_screen(anchor),
                Align2::LEFT_CENTER,
                text,
                FontId::proportional(size),
                color,
            );
        }
    }

    fn dispose(&mut self) {
        self.painter = None;
    }
}

#[cfg(test)]
pub(super) use recording::{DrawOp, RecordingSurface};
