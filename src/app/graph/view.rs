use std::collections::{BTreeSet, HashSet};

use eframe::egui::{Stroke, vec2};

use super::super::highlight::FocusSet;
use super::super::render_utils::{circle_visible, fade, segment_visible};
use super::super::style::ScenePalette;
use super::super::surface::RenderSurface;
use super::super::viewport::Viewport;
use super::{GraphModel, NodeKind};

const DIMMED_ALPHA: f32 = 0.18;
pub(in crate::app) const MIN_SCREEN_RADIUS: f32 = 2.0;
const HIERARCHY_EDGE_WIDTH: f32 = 1.0;
const KNOWLEDGE_EDGE_WIDTH: f32 = 2.2;
const LABEL_SIZE: f32 = 12.0;
const YEAR_LABEL_SIZE: f32 = 16.0;

/// Everything one frame paints, borrowed from the engine.
pub(in crate::app) struct Scene<'a> {
    pub(in crate::app) model: &'a GraphModel,
    pub(in crate::app) viewport: &'a Viewport,
    pub(in crate::app) palette: &'a ScenePalette,
    pub(in crate::app) focus: FocusSet<'a>,
    pub(in crate::app) selected: Option<usize>,
    pub(in crate::app) pending: Option<usize>,
    pub(in crate::app) search_matches: &'a HashSet<usize>,
    pub(in crate::app) hidden: &'a BTreeSet<NodeKind>,
}

impl Scene<'_> {
    fn is_hidden(&self, index: usize) -> bool {
        self.hidden.contains(&self.model.nodes[index].kind)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct PaintStats {
    pub(in crate::app) visible_nodes: usize,
    pub(in crate::app) visible_edges: usize,
}

pub(in crate::app) fn paint_scene<S: RenderSurface + ?Sized>(
    surface: &mut S,
    scene: &Scene<'_>,
) -> PaintStats {
    let model = scene.model;
    let viewport = scene.viewport;
    let palette = scene.palette;
    let size = viewport.size();
    let scale = viewport.scale;
    let width_scale = scale.sqrt().clamp(0.5, 2.0);
    let mut stats = PaintStats::default();

    surface.clear(palette.background);

    let screen = model
        .nodes
        .iter()
        .map(|node| viewport.world_to_screen(node.pos))
        .collect::<Vec<_>>();

    for edge in &model.edges {
        if edge.source >= model.nodes.len() || edge.target >= model.nodes.len() {
            continue;
        }
        if scene.is_hidden(edge.source) || scene.is_hidden(edge.target) {
            continue;
        }

        let (start, end) = (screen[edge.source], screen[edge.target]);
        if !segment_visible(size, start, end, 2.0) {
            continue;
        }

        let width = if edge.kind.is_knowledge() {
            KNOWLEDGE_EDGE_WIDTH
        } else {
            HIERARCHY_EDGE_WIDTH
        } * width_scale;
        let mut color = palette.link(edge.kind);
        if scene.focus.edge_dimmed(edge.source, edge.target) {
            color = fade(color, DIMMED_ALPHA);
        }
        surface.line(start, end, Stroke::new(width, color));
        stats.visible_edges += 1;
    }

    for &index in &model.draw_order {
        if scene.is_hidden(index) {
            continue;
        }

        let node = &model.nodes[index];
        let selected = scene.selected == Some(index);
        let center = screen[index];
        let radius = (model.radius(index, selected) * scale).max(MIN_SCREEN_RADIUS);
        if !circle_visible(size, center, radius + 8.0) {
            continue;
        }
        stats.visible_nodes += 1;

        let dimmed = scene.focus.node_dimmed(index);
        let alpha = if dimmed { DIMMED_ALPHA } else { 1.0 };
        let (fill, outline) = if selected {
            (palette.accent, Stroke::new(2.6, palette.outline))
        } else {
            (palette.node(node.kind), Stroke::new(1.0, palette.outline))
        };
        surface.circle(
            center,
            radius,
            fade(fill, alpha),
            Stroke::new(outline.width, fade(outline.color, alpha)),
        );

        if scene.search_matches.contains(&index) {
            surface.ring(center, radius + 4.0, Stroke::new(1.6, palette.search_ring));
        }
        if scene.pending == Some(index) {
            surface.ring(center, radius + 7.0, Stroke::new(2.4, palette.pending_ring));
        }

        let show_label = node.kind.is_hierarchy() || selected || scene.focus.focus() == Some(index);
        if show_label {
            let size = if node.kind == NodeKind::Year {
                YEAR_LABEL_SIZE
            } else {
                LABEL_SIZE
            };
            surface.text(
                center + vec2(radius + 5.0, 0.0),
                &node.label,
                size,
                fade(palette.label, alpha),
            );
        }
    }

    stats
}
