use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use serde::Deserialize;

use crate::app::{NodeKind, Theme};
use crate::records::{CommandSource, GraphDataSource, JsonFileSource, KnowledgeLinkKind};

const DEFAULT_MIN_ZOOM: f32 = 0.1;
const DEFAULT_MAX_ZOOM: f32 = 4.0;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// JSON document holding the records and knowledge links.
    #[arg(long, conflicts_with = "command")]
    data: Option<PathBuf>,

    /// External program answering `yearly-graph-data <year>` and the link
    /// mutation subcommands.
    #[arg(long)]
    command: Option<String>,

    /// Year to show (defaults to the current local year).
    #[arg(long)]
    year: Option<i32>,

    /// Optional TOML config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// `dark` or `light`.
    #[arg(long)]
    theme: Option<String>,

    /// Item kind hidden at startup. Repeatable.
    #[arg(long = "hide", value_name = "KIND")]
    hidden: Vec<String>,

    /// Type used for new knowledge links: related, blocks or requires.
    #[arg(long)]
    link_type: Option<String>,

    #[arg(long)]
    min_zoom: Option<f32>,

    #[arg(long)]
    max_zoom: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct FileConfig {
    data: Option<PathBuf>,
    command: Option<String>,
    year: Option<i32>,
    theme: Option<String>,
    hidden: Vec<String>,
    link_type: Option<String>,
    min_zoom: Option<f32>,
    max_zoom: Option<f32>,
}

impl FileConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SourceSpec {
    Json(PathBuf),
    Command(String),
}

/// Startup settings after merging flags, the config file and defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub source: SourceSpec,
    pub year: i32,
    pub theme: Theme,
    pub hidden: BTreeSet<NodeKind>,
    pub link_kind: KnowledgeLinkKind,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Config {
    pub fn resolve(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let source = match (&args.data, &args.command) {
            (Some(path), _) => SourceSpec::Json(path.clone()),
            (None, Some(program)) => SourceSpec::Command(program.clone()),
            (None, None) => match (file.data, file.command) {
                (Some(path), _) => SourceSpec::Json(path),
                (None, Some(program)) => SourceSpec::Command(program),
                (None, None) => bail!("no data source configured; pass --data <path> or --command <program>"),
            },
        };

        let year = args
            .year
            .or(file.year)
            .unwrap_or_else(|| Local::now().year());
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            bail!("year {year} is out of range");
        }

        let theme = match args.theme.as_deref().or(file.theme.as_deref()) {
            Some(value) => value.parse::<Theme>().map_err(anyhow::Error::msg)?,
            None => Theme::default(),
        };

        let link_kind = match args.link_type.as_deref().or(file.link_type.as_deref()) {
            Some(value) => value
                .parse::<KnowledgeLinkKind>()
                .context("invalid default link type")?,
            None => KnowledgeLinkKind::default(),
        };

        let hidden_names = if args.hidden.is_empty() {
            &file.hidden
        } else {
            &args.hidden
        };
        let hidden = hidden_names
            .iter()
            .map(|name| parse_hidden_kind(name))
            .collect::<anyhow::Result<BTreeSet<_>>>()?;

        let min_zoom = args.min_zoom.or(file.min_zoom).unwrap_or(DEFAULT_MIN_ZOOM);
        let max_zoom = args.max_zoom.or(file.max_zoom).unwrap_or(DEFAULT_MAX_ZOOM);
        if !(min_zoom > 0.0 && min_zoom < max_zoom && max_zoom.is_finite()) {
            bail!("zoom bounds must satisfy 0 < min ({min_zoom}) < max ({max_zoom})");
        }

        Ok(Self {
            source,
            year,
            theme,
            hidden,
            link_kind,
            min_zoom,
            max_zoom,
        })
    }

    pub fn open_source(&self) -> Arc<dyn GraphDataSource> {
        match &self.source {
            SourceSpec::Json(path) => Arc::new(JsonFileSource::new(path.clone())),
            SourceSpec::Command(program) => Arc::new(CommandSource::new(program.clone())),
        }
    }
}

fn parse_hidden_kind(name: &str) -> anyhow::Result<NodeKind> {
    let kind = name.parse::<NodeKind>().map_err(anyhow::Error::msg)?;
    if kind.is_hierarchy() {
        bail!("`{name}` nodes form the calendar spine and cannot be hidden");
    }
    Ok(kind)
}
