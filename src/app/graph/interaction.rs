use chrono::NaiveDate;
use eframe::egui::{Pos2, Vec2};

use super::{Node, NodeKind};
use crate::records::KnowledgeLinkKind;

/// Pointer travel, in screen pixels, below which a press counts as a click.
pub(in crate::app) const CLICK_DISTANCE: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum Gesture {
    Idle,
    Dragging { node: usize, last: Pos2, travel: f32 },
    Panning { last: Pos2, travel: f32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum LinkMode {
    Off,
    AwaitingSource,
    AwaitingTarget { node_id: String, source_id: String },
}

impl LinkMode {
    pub(in crate::app) fn is_on(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// What the engine must do in response to pointer input.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum Effect {
    Pin { node: usize, world: Vec2 },
    Release { node: usize },
    Reheat,
    Cool,
    Pan(Vec2),
    Select(Option<usize>),
    NodeActivated { source_id: String },
    DateActivated(NaiveDate),
    CreateLink {
        source_id: String,
        target_id: String,
        kind: KnowledgeLinkKind,
    },
}

pub(in crate::app) struct InteractionController {
    gesture: Gesture,
    link_mode: LinkMode,
    pub(in crate::app) link_kind: KnowledgeLinkKind,
    hovered: Option<usize>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(KnowledgeLinkKind::default())
    }
}

impl InteractionController {
    pub(in crate::app) fn new(link_kind: KnowledgeLinkKind) -> Self {
        Self {
            gesture: Gesture::Idle,
            link_mode: LinkMode::Off,
            link_kind,
            hovered: None,
        }
    }

    pub(in crate::app) fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub(in crate::app) fn link_mode(&self) -> &LinkMode {
        &self.link_mode
    }

    pub(in crate::app) fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Graph id of the node waiting for a link target.
    pub(in crate::app) fn pending_node_id(&self) -> Option<&str> {
        match &self.link_mode {
            LinkMode::AwaitingTarget { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    pub(in crate::app) fn hover(&mut self, node: Option<usize>) {
        self.hovered = node;
    }

    pub(in crate::app) fn pointer_down(
        &mut self,
        screen: Pos2,
        world: Vec2,
        hit: Option<usize>,
    ) -> Vec<Effect> {
        if !matches!(self.gesture, Gesture::Idle) {
            return Vec::new();
        }

        match hit {
            Some(node) => {
                self.gesture = Gesture::Dragging {
                    node,
                    last: screen,
                    travel: 0.0,
                };
                vec![Effect::Pin { node, world }, Effect::Reheat]
            }
            None => {
                self.gesture = Gesture::Panning {
                    last: screen,
                    travel: 0.0,
                };
                Vec::new()
            }
        }
    }

    pub(in crate::app) fn pointer_move(&mut self, screen: Pos2, world: Vec2) -> Vec<Effect> {
        match &mut self.gesture {
            Gesture::Idle => Vec::new(),
            Gesture::Dragging { node, last, travel } => {
                *travel += (screen - *last).length();
                *last = screen;
                vec![Effect::Pin { node: *node, world }]
            }
            Gesture::Panning { last, travel } => {
                let delta = screen - *last;
                *travel += delta.length();
                *last = screen;
                vec![Effect::Pan(delta)]
            }
        }
    }

    /// Ends the current gesture. `nodes` resolves a click on the dragged node.
    pub(in crate::app) fn pointer_up(&mut self, screen: Pos2, nodes: &[Node]) -> Vec<Effect> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle => Vec::new(),
            Gesture::Dragging { node, last, travel } => {
                let travel = travel + (screen - last).length();
                let mut effects = vec![Effect::Release { node }, Effect::Cool];
                if travel < CLICK_DISTANCE
                    && let Some(clicked) = nodes.get(node)
                {
                    self.click_node(node, clicked, &mut effects);
                }
                effects
            }
            Gesture::Panning { last, travel } => {
                let travel = travel + (screen - last).length();
                if travel < CLICK_DISTANCE {
                    vec![Effect::Select(None)]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn click_node(&mut self, index: usize, node: &Node, effects: &mut Vec<Effect>) {
        if node.kind == NodeKind::Date
            && let Some(date) = node.date
        {
            if !self.link_mode.is_on() {
                effects.push(Effect::Select(Some(index)));
            }
            effects.push(Effect::DateActivated(date));
            return;
        }

        if self.link_mode.is_on() {
            self.click_in_link_mode(node, effects);
            return;
        }

        effects.push(Effect::Select(Some(index)));
        if let Some(source_id) = node.source_id.as_ref().filter(|_| !node.kind.is_hierarchy()) {
            effects.push(Effect::NodeActivated {
                source_id: source_id.clone(),
            });
        }
    }

    fn click_in_link_mode(&mut self, node: &Node, effects: &mut Vec<Effect>) {
        if node.kind != NodeKind::Kb {
            return;
        }
        let Some(source_id) = node.source_id.clone() else {
            return;
        };

        match std::mem::replace(&mut self.link_mode, LinkMode::AwaitingSource) {
            LinkMode::Off => self.link_mode = LinkMode::Off,
            LinkMode::AwaitingSource => {
                self.link_mode = LinkMode::AwaitingTarget {
                    node_id: node.id.clone(),
                    source_id,
                };
            }
            LinkMode::AwaitingTarget {
                node_id,
                source_id: pending,
            } => {
                if node_id != node.id {
                    effects.push(Effect::CreateLink {
                        source_id: pending,
                        target_id: source_id,
                        kind: self.link_kind,
                    });
                }
            }
        }
    }

    /// Flips link mode; returns whether it is now on.
    pub(in crate::app) fn toggle_link_mode(&mut self) -> bool {
        self.link_mode = if self.link_mode.is_on() {
            LinkMode::Off
        } else {
            LinkMode::AwaitingSource
        };
        self.link_mode.is_on()
    }

    pub(in crate::app) fn cancel(&mut self) {
        self.link_mode = LinkMode::Off;
    }

    /// Drops the pending link source but stays in link mode.
    pub(in crate::app) fn clear_pending(&mut self) {
        if self.link_mode.is_on() {
            self.link_mode = LinkMode::AwaitingSource;
        }
    }

    /// Forgets gesture and hover state whose node indices may be stale after
    /// a reload. Returns the effects needed to unwind an active drag.
    pub(in crate::app) fn reset_gesture(&mut self) -> Vec<Effect> {
        self.hovered = None;
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Dragging { .. } => vec![Effect::Cool],
            _ => Vec::new(),
        }
    }
}
