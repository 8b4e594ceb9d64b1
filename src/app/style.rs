use std::fmt;
use std::str::FromStr;

use eframe::egui::Color32;

use super::graph::{LinkKind, NodeKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub(super) fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => Err(format!("unknown theme `{value}` (expected `dark` or `light`)")),
        }
    }
}

/// A named colour role the scene asks its provider for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) enum StyleKey {
    Background,
    Label,
    Outline,
    Accent,
    SearchRing,
    PendingRing,
    Node(NodeKind),
    Link(LinkKind),
}

/// Source of scene colours. `theme_key` must change whenever any colour
/// returned by `color_for` may have changed.
pub(super) trait StyleProvider {
    fn theme_key(&self) -> u64;
    fn color_for(&self, key: StyleKey) -> Color32;
}

/// The built-in dark and light palettes.
pub(super) struct ThemePalette {
    theme: Theme,
    version: u64,
}

impl ThemePalette {
    pub(super) fn new(theme: Theme) -> Self {
        Self { theme, version: 0 }
    }

    pub(super) fn theme(&self) -> Theme {
        self.theme
    }

    pub(super) fn set_theme(&mut self, theme: Theme) {
        if theme != self.theme {
            self.theme = theme;
            self.version += 1;
        }
    }
}

impl StyleProvider for ThemePalette {
    fn theme_key(&self) -> u64 {
        self.version
    }

    fn color_for(&self, key: StyleKey) -> Color32 {
        let dark = self.theme == Theme::Dark;
        match key {
            StyleKey::Background if dark => Color32::from_rgb(19, 23, 29),
            StyleKey::Background => Color32::from_rgb(246, 247, 249),
            StyleKey::Label if dark => Color32::from_gray(232),
            StyleKey::Label => Color32::from_gray(36),
            StyleKey::Outline if dark => Color32::from_rgba_unmultiplied(10, 12, 15, 200),
            StyleKey::Outline => Color32::from_rgba_unmultiplied(255, 255, 255, 220),
            StyleKey::Accent => Color32::from_rgb(245, 206, 93),
            StyleKey::SearchRing => Color32::from_rgb(103, 196, 255),
            StyleKey::PendingRing => Color32::from_rgb(241, 146, 94),
            StyleKey::Node(kind) => node_color(kind, dark),
            StyleKey::Link(LinkKind::Hierarchy) if dark => {
                Color32::from_rgba_unmultiplied(96, 106, 120, 150)
            }
            StyleKey::Link(LinkKind::Hierarchy) => Color32::from_rgba_unmultiplied(150, 158, 170, 170),
            StyleKey::Link(LinkKind::Related) => Color32::from_rgb(92, 170, 242),
            StyleKey::Link(LinkKind::Blocks) => Color32::from_rgb(232, 93, 93),
            StyleKey::Link(LinkKind::Requires) => Color32::from_rgb(238, 170, 64),
        }
    }
}

fn node_color(kind: NodeKind, dark: bool) -> Color32 {
    match kind {
        NodeKind::Year if dark => Color32::from_rgb(236, 236, 240),
        NodeKind::Year => Color32::from_rgb(40, 44, 52),
        NodeKind::Month if dark => Color32::from_rgb(170, 178, 196),
        NodeKind::Month => Color32::from_rgb(96, 104, 122),
        NodeKind::Date if dark => Color32::from_rgb(118, 128, 146),
        NodeKind::Date => Color32::from_rgb(150, 158, 174),
        NodeKind::Activity => Color32::from_rgb(91, 192, 135),
        NodeKind::Goal => Color32::from_rgb(246, 137, 92),
        NodeKind::Submission => Color32::from_rgb(178, 120, 230),
        NodeKind::Kb => Color32::from_rgb(80, 160, 240),
        NodeKind::Retro => Color32::from_rgb(230, 110, 170),
        NodeKind::Journal => Color32::from_rgb(215, 190, 90),
        NodeKind::Note => Color32::from_rgb(70, 195, 200),
    }
}

/// Every colour a frame needs, resolved once per theme key.
#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct ScenePalette {
    pub(super) background: Color32,
    pub(super) label: Color32,
    pub(super) outline: Color32,
    pub(super) accent: Color32,
    pub(super) search_ring: Color32,
    pub(super) pending_ring: Color32,
    pub(super) nodes: [Color32; NodeKind::COUNT],
    pub(super) links: [Color32; LinkKind::COUNT],
}

const LINK_KINDS: [LinkKind; LinkKind::COUNT] = [
    LinkKind::Hierarchy,
    LinkKind::Related,
    LinkKind::Blocks,
    LinkKind::Requires,
];

impl ScenePalette {
    fn resolve(provider: &dyn StyleProvider) -> Self {
        Self {
            background: provider.color_for(StyleKey::Background),
            label: provider.color_for(StyleKey::Label),
            outline: provider.color_for(StyleKey::Outline),
            accent: provider.color_for(StyleKey::Accent),
            search_ring: provider.color_for(StyleKey::SearchRing),
            pending_ring: provider.color_for(StyleKey::PendingRing),
            nodes: NodeKind::ALL.map(|kind| provider.color_for(StyleKey::Node(kind))),
            links: LINK_KINDS.map(|kind| provider.color_for(StyleKey::Link(kind))),
        }
    }

    pub(super) fn node(&self, kind: NodeKind) -> Color32 {
        self.nodes[kind.slot()]
    }

    pub(super) fn link(&self, kind: LinkKind) -> Color32 {
        self.links[kind.slot()]
    }
}

/// Holds the resolved palette until the provider's theme key changes.
#[derive(Default)]
pub(super) struct StyleCache {
    key: Option<u64>,
    palette: ScenePalette,
}

impl StyleCache {
    pub(super) fn palette(&mut self, provider: &dyn StyleProvider) -> &ScenePalette {
        let key = provider.theme_key();
        if self.key != Some(key) {
            self.palette = ScenePalette::resolve(provider);
            self.key = Some(key);
        }
        &self.palette
    }
}
