mod app;
mod config;
mod records;
mod util;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Args, Config};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("knowledge_atlas=info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::resolve(&args)?;
    let source = config.open_source();
    info!(source = %source.describe(), year = config.year, "starting knowledge atlas");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "knowledge-atlas",
        options,
        Box::new(move |cc| Ok(Box::new(app::AtlasApp::new(cc, source, config)))),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
