use eframe::egui::{self, Key, Pos2, Sense, Ui};

use super::super::Workspace;
use super::super::surface::RenderSurface;

impl Workspace {
    /// Feeds this frame's pointer input to the engine, advances the layout
    /// and paints the graph into the remaining space.
    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        if rect.size() != self.surface.size() {
            self.surface.resize(rect.size());
            self.engine.resize(rect.size());
        }
        self.surface.init(ui.painter_at(rect));

        let to_local = |pos: Pos2| Pos2::ZERO + (pos - rect.min);
        let (hover_pos, latest_pos, pressed, released, scroll, escape) = ui.input(|input| {
            (
                input.pointer.hover_pos(),
                input.pointer.latest_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.raw_scroll_delta.y,
                input.key_pressed(Key::Escape),
            )
        });
        let hover_local = hover_pos.map(to_local);

        if escape {
            self.engine.cancel();
        }

        if pressed
            && response.hovered()
            && let Some(at) = hover_local
        {
            self.engine.pointer_down(at);
            self.pointer_captured = true;
        }

        if self.pointer_captured {
            let at = latest_pos.map(to_local);
            if let Some(at) = at {
                self.engine.pointer_move(at);
            }
            if released {
                self.engine
                    .pointer_up(at.unwrap_or_else(|| Pos2::ZERO + rect.size() * 0.5));
                self.pointer_captured = false;
            }
        }

        let hovering = response.hovered() || self.pointer_captured;
        self.engine.hover(hover_local.filter(|_| hovering));

        if response.hovered() && scroll.abs() > f32::EPSILON {
            let anchor = hover_local.unwrap_or_else(|| Pos2::ZERO + rect.size() * 0.5);
            self.engine.wheel(anchor, scroll);
        }

        self.engine.tick();
        self.engine.dispatch(&mut self.inspector);
        self.engine.draw(&mut self.surface, &self.palette);

        if self.engine.hovered_node().is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        } else if self.pointer_captured {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::Grabbing;
            });
        }
    }
}
