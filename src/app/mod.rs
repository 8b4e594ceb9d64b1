use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{info, warn};

use crate::config::Config;
use crate::records::{
    DataResult, GraphDataSource, KnowledgeLinkKind, KnowledgeLinkRecord,
    YearlyGraphData,
};

mod engine;
mod graph;
mod highlight;
mod inspector;
mod physics;
mod reload;
mod render_utils;
mod style;
mod surface;
mod ui;
mod viewport;

pub use graph::NodeKind;
pub use style::Theme;

use engine::{EngineSettings, GraphCallbacks, GraphEngine};
use inspector::Inspector;
use reload::ReloadQueue;
use style::ThemePalette;
use surface::{EguiSurface, RenderSurface};
use ui::notifications::Toasts;

type LoadResult = (i32, DataResult<YearlyGraphData>);

pub struct AtlasApp {
    source: Arc<dyn GraphDataSource>,
    config: Config,
    state: AppState,
}

enum AppState {
    Loading { year: i32, rx: Receiver<LoadResult> },
    Ready(Box<Workspace>),
    Error { year: i32, message: String },
}

enum Mutation {
    Created(KnowledgeLinkRecord),
    Deleted(String),
}

/// A successfully loaded graph plus everything the panels edit around it.
struct Workspace {
    source: Arc<dyn GraphDataSource>,
    engine: GraphEngine,
    surface: EguiSurface,
    palette: ThemePalette,
    inspector: Inspector,
    toasts: Toasts,
    search: String,
    year: i32,
    reload: ReloadQueue<LoadResult>,
    mutation_tx: Sender<DataResult<Mutation>>,
    mutation_rx: Receiver<DataResult<Mutation>>,
    mutations_in_flight: usize,
    pointer_captured: bool,
}

fn spawn_load(source: Arc<dyn GraphDataSource>, year: i32) -> Receiver<LoadResult> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let result = source.yearly_graph_data(year);
        let _ = tx.send((year, result));
    });

    rx
}

impl AtlasApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        source: Arc<dyn GraphDataSource>,
        config: Config,
    ) -> Self {
        apply_chrome_theme(&cc.egui_ctx, config.theme);
        let state = AppState::Loading {
            year: config.year,
            rx: spawn_load(Arc::clone(&source), config.year),
        };
        Self {
            source,
            config,
            state,
        }
    }

    fn start_load(&self, year: i32) -> AppState {
        AppState::Loading {
            year,
            rx: spawn_load(Arc::clone(&self.source), year),
        }
    }
}

fn apply_chrome_theme(ctx: &Context, theme: Theme) {
    ctx.set_visuals(match theme {
        Theme::Dark => egui::Visuals::dark(),
        Theme::Light => egui::Visuals::light(),
    });
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = None;

        match &mut self.state {
            AppState::Loading { year, rx } => {
                match rx.try_recv() {
                    Ok((year, Ok(data))) => {
                        let mut workspace =
                            Workspace::new(ctx, Arc::clone(&self.source), &self.config);
                        workspace.apply_load(year, &data);
                        transition = Some(AppState::Ready(Box::new(workspace)));
                    }
                    Ok((year, Err(error))) => {
                        warn!(year, %error, "initial load failed");
                        transition = Some(AppState::Error {
                            year,
                            message: error.to_string(),
                        });
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error {
                            year: *year,
                            message: "Background load worker disconnected".to_owned(),
                        });
                    }
                }

                let year = *year;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading records for {year}..."));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error { year, message } => {
                let year = *year;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading(format!("Failed to load records for {year}"));
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        retry = Some(year);
                    }
                });
            }
            AppState::Ready(workspace) => workspace.show(ctx),
        }

        if let Some(year) = retry {
            transition = Some(self.start_load(year));
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl Workspace {
    fn new(ctx: &Context, source: Arc<dyn GraphDataSource>, config: &Config) -> Self {
        let mut engine = GraphEngine::new(EngineSettings {
            min_scale: config.min_zoom,
            max_scale: config.max_zoom,
            hidden: config.hidden.clone(),
            link_kind: config.link_kind,
        });
        let repaint = ctx.clone();
        engine.set_redraw_hook(move || repaint.request_repaint());

        let (mutation_tx, mutation_rx) = mpsc::channel();
        Self {
            source,
            engine,
            surface: EguiSurface::default(),
            palette: ThemePalette::new(config.theme),
            inspector: Inspector::default(),
            toasts: Toasts::default(),
            search: String::new(),
            year: config.year,
            reload: ReloadQueue::default(),
            mutation_tx,
            mutation_rx,
            mutations_in_flight: 0,
            pointer_captured: false,
        }
    }

    fn is_loading(&self) -> bool {
        self.reload.is_busy()
    }

    fn request_load(&mut self, year: i32) {
        let source = Arc::clone(&self.source);
        self.reload.request(year, move |year| spawn_load(source, year));
    }

    fn apply_load(&mut self, year: i32, data: &YearlyGraphData) {
        self.inspector.on_data_loaded(data);
        let stats = self.engine.load(data, year);
        self.year = year;
        if stats.skipped_undated > 0 {
            self.toasts.info(format!(
                "{} records without a usable date were skipped",
                stats.skipped_undated
            ));
        }
    }

    fn poll_background(&mut self) {
        let source = Arc::clone(&self.source);
        match self.reload.poll(move |year| spawn_load(source, year)) {
            Some(Ok((year, Ok(data)))) => self.apply_load(year, &data),
            Some(Ok((year, Err(error)))) => {
                warn!(year, %error, "reload failed, keeping the current graph");
                self.toasts.error(format!("Loading {year} failed: {error}"));
            }
            Some(Err(_)) => self.toasts.error("Background load worker disconnected"),
            None => {}
        }

        while let Ok(result) = self.mutation_rx.try_recv() {
            self.mutations_in_flight = self.mutations_in_flight.saturating_sub(1);
            match result {
                Ok(Mutation::Created(link)) => {
                    info!(link = %link.id, source = %link.source_id, target = %link.target_id, "knowledge link created");
                    let source = self.inspector.kb_label(&link.source_id, 24);
                    let target = self.inspector.kb_label(&link.target_id, 24);
                    self.toasts
                        .info(format!("Linked {source} → {target} ({})", link.link_type));
                    self.request_load(self.year);
                }
                Ok(Mutation::Deleted(link_id)) => {
                    info!(link = %link_id, "knowledge link deleted");
                    self.toasts.info("Knowledge link removed");
                    self.request_load(self.year);
                }
                Err(error) => {
                    warn!(%error, "knowledge link mutation failed");
                    self.toasts.error(format!("Link change failed: {error}"));
                    self.engine.clear_pending_link();
                }
            }
        }
    }

    fn spawn_mutation(
        &mut self,
        mutate: impl FnOnce(&dyn GraphDataSource) -> DataResult<Mutation> + Send + 'static,
    ) {
        let source = Arc::clone(&self.source);
        let tx = self.mutation_tx.clone();
        self.mutations_in_flight += 1;

        thread::spawn(move || {
            let _ = tx.send(mutate(source.as_ref()));
        });
    }

    fn create_link(&mut self, source_id: String, target_id: String, kind: KnowledgeLinkKind) {
        self.spawn_mutation(move |source| {
            source
                .create_knowledge_link(&source_id, &target_id, kind)
                .map(Mutation::Created)
        });
    }

    fn delete_link(&mut self, link_id: String) {
        self.spawn_mutation(move |source| {
            source
                .delete_knowledge_link(&link_id)
                .map(|()| Mutation::Deleted(link_id))
        });
    }

    fn show(&mut self, ctx: &Context) {
        self.poll_background();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui));

        for request in self.inspector.take_link_requests() {
            self.create_link(request.source_id, request.target_id, request.kind);
        }

        self.toasts.show(ctx);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.engine.dispose();
        self.surface.dispose();
    }
}
