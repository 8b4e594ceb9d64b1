use std::collections::{BTreeSet, HashSet, VecDeque};

use chrono::NaiveDate;
use eframe::egui::{Pos2, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::{debug, info};

use crate::records::{KnowledgeLinkKind, YearlyGraphData};

use super::graph::build::build_graph;
use super::graph::interaction::{Effect, Gesture, InteractionController, LinkMode};
use super::graph::view::{MIN_SCREEN_RADIUS, PaintStats, Scene};
use super::graph::{BuildStats, GraphData, GraphModel, Node, NodeKind};
use super::highlight::FocusSet;
use super::physics::{ForceConfig, Simulation, TickOutcome};
use super::style::{StyleCache, StyleProvider};
use super::surface::RenderSurface;
use super::viewport::Viewport;

const RELOAD_ALPHA: f32 = 0.6;
const FIRST_LOAD_ALPHA: f32 = 1.0;

/// Outbound notifications, drained by [`GraphEngine::dispatch`].
#[derive(Clone, Debug, PartialEq)]
pub(super) enum GraphEvent {
    NodeActivated(String),
    DateActivated(NaiveDate),
    LinkRequested {
        source_id: String,
        target_id: String,
        kind: KnowledgeLinkKind,
    },
}

pub(super) trait GraphCallbacks {
    fn on_node_activated(&mut self, source_id: &str);
    fn on_date_activated(&mut self, date: NaiveDate);
    fn on_link_requested(&mut self, source_id: &str, target_id: &str, kind: KnowledgeLinkKind);
    /// Called by the shell whenever fresh raw data has been loaded.
    fn on_data_loaded(&mut self, data: &YearlyGraphData);
}

#[derive(Clone, Debug)]
pub(super) struct EngineSettings {
    pub(super) min_scale: f32,
    pub(super) max_scale: f32,
    pub(super) hidden: BTreeSet<NodeKind>,
    pub(super) link_kind: KnowledgeLinkKind,
}

/// Read-only snapshot for the UI chrome.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct EngineStatus {
    pub(super) year: i32,
    pub(super) zoom_percent: u32,
    pub(super) link_mode: bool,
    pub(super) pending_label: Option<String>,
    pub(super) node_count: usize,
    pub(super) knowledge_link_count: usize,
    pub(super) visible_nodes: usize,
    pub(super) search_matches: usize,
    pub(super) settled: bool,
    pub(super) stats: BuildStats,
}

type RedrawHook = Box<dyn FnMut()>;

/// Owns the live graph and everything that animates, paints and edits it.
pub(super) struct GraphEngine {
    model: GraphModel,
    simulation: Simulation,
    viewport: Viewport,
    controller: InteractionController,
    style: StyleCache,
    hidden: BTreeSet<NodeKind>,
    selected: Option<usize>,
    search_query: String,
    search_matches: HashSet<usize>,
    matcher: SkimMatcherV2,
    events: VecDeque<GraphEvent>,
    radii: Vec<f32>,
    redraw: Option<RedrawHook>,
    last_paint: PaintStats,
    disposed: bool,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl GraphEngine {
    pub(super) fn new(settings: EngineSettings) -> Self {
        let hidden = settings
            .hidden
            .into_iter()
            .filter(|kind| !kind.is_hierarchy())
            .collect();
        Self {
            model: GraphModel::empty(0),
            simulation: Simulation::new(Vec2::ZERO),
            viewport: Viewport::new(settings.min_scale, settings.max_scale),
            controller: InteractionController::new(settings.link_kind),
            style: StyleCache::default(),
            hidden,
            selected: None,
            search_query: String::new(),
            search_matches: HashSet::new(),
            matcher: SkimMatcherV2::default(),
            events: VecDeque::new(),
            radii: Vec::new(),
            redraw: None,
            last_paint: PaintStats::default(),
            disposed: false,
        }
    }

    /// Installs the hook invoked whenever the canvas needs repainting.
    pub(super) fn set_redraw_hook(&mut self, hook: impl FnMut() + 'static) {
        self.redraw = Some(Box::new(hook));
    }

    fn request_redraw(&mut self) {
        if let Some(redraw) = self.redraw.as_mut() {
            redraw();
        }
    }

    pub(super) fn model(&self) -> &GraphModel {
        &self.model
    }

    pub(super) fn load(&mut self, data: &YearlyGraphData, year: i32) -> BuildStats {
        let graph = build_graph(data, year);
        self.install(graph, year)
    }

    /// Swaps in a freshly built graph. Nodes that survive keep their place,
    /// pins and in-flight gestures are dropped.
    pub(super) fn install(&mut self, graph: GraphData, year: i32) -> BuildStats {
        let selected_id = self
            .selected
            .and_then(|index| self.model.nodes.get(index))
            .map(|node| node.id.clone());

        for effect in self.controller.reset_gesture() {
            self.apply(effect);
        }

        let carried = !self.model.nodes.is_empty();
        let center = self.simulation.center();
        self.model = GraphModel::from_data(graph, year, center, Some(&self.model));
        self.selected = selected_id.and_then(|id| self.model.node_index(&id));
        if let Some(pending) = self.controller.pending_node_id()
            && self.model.node_index(pending).is_none()
        {
            self.controller.clear_pending();
        }
        self.refresh_search();

        self.simulation
            .restart(if carried { RELOAD_ALPHA } else { FIRST_LOAD_ALPHA });
        info!(
            year,
            nodes = self.model.nodes.len(),
            edges = self.model.edges.len(),
            "graph installed"
        );
        self.request_redraw();
        self.model.stats
    }

    /// Advances the layout one step and requests a repaint if anything moved
    /// or the layout just settled.
    pub(super) fn tick(&mut self) -> TickOutcome {
        if self.disposed {
            return TickOutcome::Idle;
        }

        self.radii.clear();
        for index in 0..self.model.nodes.len() {
            self.radii
                .push(self.model.radius(index, self.selected == Some(index)));
        }
        let outcome = self
            .simulation
            .tick(&mut self.model.nodes, &self.model.edges, &self.radii);
        if outcome != TickOutcome::Idle {
            self.request_redraw();
        }
        outcome
    }

    pub(super) fn is_animating(&self) -> bool {
        !self.disposed && self.simulation.is_running()
    }

    pub(super) fn resize(&mut self, size: Vec2) {
        self.viewport.resize(size);
        self.simulation.set_center(self.viewport.world_center());
        self.request_redraw();
    }

    /// Closest visible node whose disc contains `world`.
    pub(super) fn hit_test(&self, world: Vec2) -> Option<usize> {
        let slop = MIN_SCREEN_RADIUS / self.viewport.scale;
        self.model
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !self.hidden.contains(&node.kind))
            .filter_map(|(index, node)| {
                let distance = (node.pos - world).length();
                let radius = self.model.radius(index, self.selected == Some(index)).max(slop);
                (distance <= radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub(super) fn pointer_down(&mut self, screen: Pos2) {
        let world = self.viewport.screen_to_world(screen);
        let hit = self.hit_test(world);
        let effects = self.controller.pointer_down(screen, world, hit);
        self.apply_all(effects);
    }

    pub(super) fn pointer_move(&mut self, screen: Pos2) {
        let world = self.viewport.screen_to_world(screen);
        let effects = self.controller.pointer_move(screen, world);
        self.apply_all(effects);
    }

    pub(super) fn pointer_up(&mut self, screen: Pos2) {
        let effects = self.controller.pointer_up(screen, &self.model.nodes);
        self.apply_all(effects);
    }

    /// Updates the hovered node; `None` when the pointer left the canvas.
    pub(super) fn hover(&mut self, screen: Option<Pos2>) {
        let hovered = screen.and_then(|screen| self.hit_test(self.viewport.screen_to_world(screen)));
        if hovered != self.controller.hovered() {
            self.controller.hover(hovered);
            self.request_redraw();
        }
    }

    /// Zooms about `screen` unless a node is being dragged or sits under the cursor.
    pub(super) fn wheel(&mut self, screen: Pos2, scroll: f32) {
        if matches!(self.controller.gesture(), Gesture::Dragging { .. })
            || self.hit_test(self.viewport.screen_to_world(screen)).is_some()
        {
            return;
        }
        self.viewport.zoom_wheel(screen, scroll);
        self.request_redraw();
    }

    pub(super) fn reset_view(&mut self) {
        self.viewport.reset();
        self.viewport.center_on(self.simulation.center());
        self.request_redraw();
    }

    fn apply_all(&mut self, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        for effect in effects {
            self.apply(effect);
        }
        self.request_redraw();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Pin { node, world } => {
                if let Some(node) = self.model.nodes.get_mut(node) {
                    node.pin = Some(world);
                    node.pos = world;
                    node.velocity = Vec2::ZERO;
                }
            }
            Effect::Release { node } => {
                if let Some(node) = self.model.nodes.get_mut(node) {
                    node.pin = None;
                }
            }
            Effect::Reheat => self.simulation.reheat(),
            Effect::Cool => self.simulation.cool(),
            Effect::Pan(delta) => self.viewport.pan_by(delta),
            Effect::Select(selected) => self.selected = selected,
            Effect::NodeActivated { source_id } => {
                self.events.push_back(GraphEvent::NodeActivated(source_id));
            }
            Effect::DateActivated(date) => {
                self.events.push_back(GraphEvent::DateActivated(date));
            }
            Effect::CreateLink {
                source_id,
                target_id,
                kind,
            } => {
                debug!(%source_id, %target_id, %kind, "link requested");
                self.events.push_back(GraphEvent::LinkRequested {
                    source_id,
                    target_id,
                    kind,
                });
            }
        }
    }

    pub(super) fn toggle_link_mode(&mut self) -> bool {
        let on = self.controller.toggle_link_mode();
        self.request_redraw();
        on
    }

    /// Escape: leaves link mode and drops any pending source.
    pub(super) fn cancel(&mut self) {
        if self.controller.link_mode().is_on() {
            self.controller.cancel();
            self.request_redraw();
        }
    }

    pub(super) fn clear_pending_link(&mut self) {
        self.controller.clear_pending();
        self.request_redraw();
    }

    pub(super) fn link_kind(&self) -> KnowledgeLinkKind {
        self.controller.link_kind
    }

    pub(super) fn set_link_kind(&mut self, kind: KnowledgeLinkKind) {
        self.controller.link_kind = kind;
    }

    pub(super) fn hidden_kinds(&self) -> &BTreeSet<NodeKind> {
        &self.hidden
    }

    /// Hides or shows one item kind. Year, month and date nodes are always
    /// shown.
    pub(super) fn set_hidden(&mut self, kind: NodeKind, hidden: bool) {
        if kind.is_hierarchy() {
            return;
        }
        let changed = if hidden {
            self.hidden.insert(kind)
        } else {
            self.hidden.remove(&kind)
        };
        if !changed {
            return;
        }
        if hidden
            && self
                .selected
                .and_then(|index| self.model.nodes.get(index))
                .is_some_and(|node| node.kind == kind)
        {
            self.selected = None;
        }
        self.controller.hover(None);
        self.request_redraw();
    }

    pub(super) fn force_config(&self) -> ForceConfig {
        self.simulation.config
    }

    pub(super) fn set_force_config(&mut self, config: ForceConfig) {
        if config != self.simulation.config {
            self.simulation.config = config;
            self.simulation.restart(self.simulation.alpha().max(0.3));
        }
    }

    pub(super) fn set_search(&mut self, query: &str) {
        let query = query.trim();
        if query == self.search_query {
            return;
        }
        self.search_query = query.to_owned();
        self.refresh_search();
        self.request_redraw();
    }

    fn refresh_search(&mut self) {
        self.search_matches.clear();
        if self.search_query.is_empty() {
            return;
        }
        for (index, node) in self.model.nodes.iter().enumerate() {
            if fuzzy_match_score(&self.matcher, &node.label, &self.search_query).is_some() {
                self.search_matches.insert(index);
            }
        }
    }

    /// Centres the viewport on the best visible search match and selects it.
    pub(super) fn jump_to_best_match(&mut self) -> Option<&Node> {
        let best = self
            .search_matches
            .iter()
            .copied()
            .filter(|&index| !self.hidden.contains(&self.model.nodes[index].kind))
            .filter_map(|index| {
                fuzzy_match_score(&self.matcher, &self.model.nodes[index].label, &self.search_query)
                    .map(|score| (score, std::cmp::Reverse(index)))
                    .map(|key| (key, index))
            })
            .max_by_key(|(key, _)| *key)
            .map(|(_, index)| index)?;

        self.viewport.center_on(self.model.nodes[best].pos);
        self.selected = Some(best);
        self.request_redraw();
        self.model.nodes.get(best)
    }

    /// Selects the node with graph id `id`, if present.
    pub(super) fn select_node_id(&mut self, id: &str) -> Option<usize> {
        let index = self.model.node_index(id)?;
        self.selected = Some(index);
        self.request_redraw();
        Some(index)
    }

    pub(super) fn hovered_node(&self) -> Option<&Node> {
        self.controller
            .hovered()
            .and_then(|index| self.model.nodes.get(index))
    }

    pub(super) fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|index| self.model.nodes.get(index))
    }

    pub(super) fn draw<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        provider: &dyn StyleProvider,
    ) -> PaintStats {
        let hovered = self.controller.hovered();
        let pending = self
            .controller
            .pending_node_id()
            .and_then(|id| self.model.node_index(id));
        let scene = Scene {
            model: &self.model,
            viewport: &self.viewport,
            palette: self.style.palette(provider),
            focus: FocusSet::new(hovered, self.selected, &self.model.connections),
            selected: self.selected,
            pending,
            search_matches: &self.search_matches,
            hidden: &self.hidden,
        };
        self.last_paint = surface.draw(&scene);
        self.last_paint
    }

    pub(super) fn status(&self) -> EngineStatus {
        let pending_label = match self.controller.link_mode() {
            LinkMode::AwaitingTarget { node_id, .. } => self
                .model
                .node_index(node_id)
                .map(|index| self.model.nodes[index].label.clone()),
            _ => None,
        };
        EngineStatus {
            year: self.model.year,
            zoom_percent: self.viewport.zoom_percent(),
            link_mode: self.controller.link_mode().is_on(),
            pending_label,
            node_count: self.model.nodes.len(),
            knowledge_link_count: self.model.knowledge_edges().len(),
            visible_nodes: self.last_paint.visible_nodes,
            search_matches: self.search_matches.len(),
            settled: !self.is_animating(),
            stats: self.model.stats,
        }
    }

    /// Drains queued events into `callbacks`, oldest first.
    pub(super) fn dispatch(&mut self, callbacks: &mut impl GraphCallbacks) {
        while let Some(event) = self.events.pop_front() {
            match event {
                GraphEvent::NodeActivated(source_id) => callbacks.on_node_activated(&source_id),
                GraphEvent::DateActivated(date) => callbacks.on_date_activated(date),
                GraphEvent::LinkRequested {
                    source_id,
                    target_id,
                    kind,
                } => callbacks.on_link_requested(&source_id, &target_id, kind),
            }
        }
    }

    /// Stops the simulation and drops the redraw hook. Idempotent.
    pub(super) fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.simulation.stop();
        self.redraw = None;
        self.events.clear();
        debug!("graph engine disposed");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use eframe::egui::vec2;

    use super::super::style::{Theme, ThemePalette};
    use super::super::surface::RecordingSurface;
    use super::*;
    use crate::records::{GoalRecord, JournalRecord, KbItemRecord, KnowledgeLinkRecord};

    fn settings() -> EngineSettings {
        EngineSettings {
            min_scale: 0.1,
            max_scale: 4.0,
            hidden: BTreeSet::new(),
            link_kind: KnowledgeLinkKind::Related,
        }
    }

    fn data() -> YearlyGraphData {
        YearlyGraphData {
            goals: vec![GoalRecord {
                id: "g1".to_owned(),
                date: Some("2025-03-10".to_owned()),
                text: "Finish chapter".to_owned(),
                ..GoalRecord::default()
            }],
            journal_entries: vec![JournalRecord {
                id: "j1".to_owned(),
                date: Some("2025-03-10".to_owned()),
                reflection_text: "Calm day".to_owned(),
            }],
            kb_items: vec![
                KbItemRecord {
                    id: "a".to_owned(),
                    created_at: Some("2025-03-11".to_owned()),
                    content: "Segment trees".to_owned(),
                    ..KbItemRecord::default()
                },
                KbItemRecord {
                    id: "b".to_owned(),
                    created_at: Some("2025-03-12".to_owned()),
                    content: "Fenwick trees".to_owned(),
                    ..KbItemRecord::default()
                },
            ],
            kb_links: vec![KnowledgeLinkRecord {
                id: "l1".to_owned(),
                source_id: "a".to_owned(),
                target_id: "b".to_owned(),
                link_type: "requires".to_owned(),
            }],
            ..YearlyGraphData::default()
        }
    }

    fn engine() -> (GraphEngine, Rc<Cell<usize>>) {
        let mut engine = GraphEngine::new(settings());
        let redraws = Rc::new(Cell::new(0));
        let counter = Rc::clone(&redraws);
        engine.set_redraw_hook(move || counter.set(counter.get() + 1));
        engine.resize(vec2(1_200.0, 900.0));
        engine.load(&data(), 2025);
        (engine, redraws)
    }

    fn screen_of(engine: &GraphEngine, id: &str) -> Pos2 {
        let index = engine.model().node_index(id).expect("node exists");
        engine
            .viewport
            .world_to_screen(engine.model().nodes[index].pos)
    }

    #[derive(Default)]
    struct Recorder {
        nodes: Vec<String>,
        dates: Vec<NaiveDate>,
        links: Vec<(String, String, KnowledgeLinkKind)>,
    }

    impl GraphCallbacks for Recorder {
        fn on_node_activated(&mut self, source_id: &str) {
            self.nodes.push(source_id.to_owned());
        }

        fn on_date_activated(&mut self, date: NaiveDate) {
            self.dates.push(date);
        }

        fn on_link_requested(&mut self, source_id: &str, target_id: &str, kind: KnowledgeLinkKind) {
            self.links
                .push((source_id.to_owned(), target_id.to_owned(), kind));
        }

        fn on_data_loaded(&mut self, _data: &YearlyGraphData) {}
    }

    fn click(engine: &mut GraphEngine, id: &str) {
        let at = screen_of(engine, id);
        engine.pointer_down(at);
        engine.pointer_up(at);
    }

    #[test]
    fn redraws_every_moving_tick_and_once_when_settled() {
        let (mut engine, redraws) = engine();
        redraws.set(0);

        let mut moved = 0;
        let mut cooled = 0;
        for _ in 0..2_000 {
            match engine.tick() {
                TickOutcome::Moved => moved += 1,
                TickOutcome::Cooled => cooled += 1,
                TickOutcome::Idle => {}
            }
        }

        assert_eq!(cooled, 1);
        assert_eq!(redraws.get(), moved + 1);
        assert!(engine.status().settled);
    }

    #[test]
    fn reload_clears_pins_and_keeps_positions() {
        let (mut engine, _) = engine();
        for _ in 0..30 {
            engine.tick();
        }
        let at = screen_of(&engine, "goal-g1");
        engine.pointer_down(at);
        engine.pointer_move(at + vec2(40.0, 0.0));
        let goal = engine.model().node_index("goal-g1").expect("goal");
        assert!(engine.model().nodes[goal].pin.is_some());
        let before = engine.model().nodes[goal].pos;

        engine.load(&data(), 2025);

        let goal = engine.model().node_index("goal-g1").expect("goal");
        assert!(engine.model().nodes.iter().all(|node| node.pin.is_none()));
        assert_eq!(engine.model().nodes[goal].pos, before);
        assert_eq!(engine.controller.gesture(), Gesture::Idle);
    }

    #[test]
    fn wheel_over_a_node_or_during_drag_does_not_zoom() {
        let (mut engine, _) = engine();
        let scale = engine.viewport.scale;

        let on_node = screen_of(&engine, "kb-a");
        engine.wheel(on_node, 120.0);
        assert_eq!(engine.viewport.scale, scale);

        let corner = Pos2::new(4.0, 4.0);
        assert!(engine.hit_test(engine.viewport.screen_to_world(corner)).is_none());
        engine.pointer_down(on_node);
        engine.pointer_move(on_node + vec2(30.0, 0.0));
        engine.wheel(corner, 120.0);
        assert_eq!(engine.viewport.scale, scale);

        engine.pointer_up(on_node + vec2(30.0, 0.0));
        engine.wheel(corner, 120.0);
        assert!(engine.viewport.scale > scale);
    }

    #[test]
    fn clicking_an_item_dispatches_activation() {
        let (mut engine, _) = engine();
        click(&mut engine, "journal-j1");
        click(&mut engine, "date-2025-03-10");

        let mut recorder = Recorder::default();
        engine.dispatch(&mut recorder);
        assert_eq!(recorder.nodes, vec!["j1".to_owned()]);
        assert_eq!(recorder.dates, NaiveDate::from_ymd_opt(2025, 3, 10).into_iter().collect::<Vec<_>>());

        engine.dispatch(&mut recorder);
        assert_eq!(recorder.nodes.len(), 1);
    }

    #[test]
    fn link_mode_requests_one_link() {
        let (mut engine, _) = engine();
        assert!(engine.toggle_link_mode());
        click(&mut engine, "kb-a");
        assert_eq!(engine.status().pending_label.as_deref(), Some("Segment trees"));
        click(&mut engine, "kb-a");
        click(&mut engine, "kb-a");
        click(&mut engine, "kb-b");

        let mut recorder = Recorder::default();
        engine.dispatch(&mut recorder);
        assert_eq!(recorder.links, vec![(
            "a".to_owned(),
            "b".to_owned(),
            KnowledgeLinkKind::Related
        )]);
        assert!(recorder.nodes.is_empty());
    }

    #[test]
    fn hidden_kinds_are_not_hit_or_painted() {
        let (mut engine, _) = engine();
        let at = screen_of(&engine, "goal-g1");
        let goal = engine.model().node_index("goal-g1");
        assert_eq!(engine.hit_test(engine.viewport.screen_to_world(at)), goal);

        engine.set_hidden(NodeKind::Goal, true);
        engine.set_hidden(NodeKind::Year, true);
        assert!(engine.hidden_kinds().contains(&NodeKind::Goal));
        assert!(!engine.hidden_kinds().contains(&NodeKind::Year));
        assert_ne!(engine.hit_test(engine.viewport.screen_to_world(at)), goal);

        let mut surface = RecordingSurface::default();
        let stats = engine.draw(&mut surface, &ThemePalette::new(Theme::Dark));
        assert_eq!(stats.visible_nodes, engine.model().nodes.len() - 1);
    }

    #[test]
    fn search_jump_selects_and_centres() {
        let (mut engine, _) = engine();
        engine.set_search("fenwick");
        assert_eq!(engine.status().search_matches, 1);

        let label = engine.jump_to_best_match().map(|node| node.label.clone());
        assert_eq!(label.as_deref(), Some("Fenwick trees"));
        let at = screen_of(&engine, "kb-b");
        assert!((at - Pos2::new(600.0, 450.0)).length() < 1e-2);
        assert_eq!(engine.selected_node().map(|node| node.id.as_str()), Some("kb-b"));
    }

    #[test]
    fn dispose_stops_ticking() {
        let (mut engine, redraws) = engine();
        engine.dispose();
        redraws.set(0);
        assert_eq!(engine.tick(), TickOutcome::Idle);
        assert!(!engine.is_animating());
        assert_eq!(redraws.get(), 0);
    }
}
