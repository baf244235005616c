//! Deterministic stand-ins for the external dump tools, shared by the
//! route tests.

use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::{Router, middleware as axum_middleware};

use crate::{
    config::AppConfig,
    diagram::{
        DiagramPipeline, DiagramRenderer, DumpCommand, DumpError, DumpRunner, EngineRegistry,
        OutputFormat, RenderError, SchemaDescription, SqlImporter, SvgRenderer,
    },
    middleware::{catch_panic_layer, json_error_middleware},
    routes::router,
    state::AppState,
};

/// Returns a canned dump and counts how many processes would have started.
pub struct FakeDumpRunner {
    output: Result<String, DumpError>,
    spawns: AtomicUsize,
    commands: Mutex<Vec<DumpCommand>>,
}

impl FakeDumpRunner {
    pub fn succeeding(dump: impl Into<String>) -> Arc<Self> {
        Self::with_output(Ok(dump.into()))
    }

    pub fn failing(err: DumpError) -> Arc<Self> {
        Self::with_output(Err(err))
    }

    fn with_output(output: Result<String, DumpError>) -> Arc<Self> {
        Arc::new(Self {
            output,
            spawns: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        })
    }

    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<DumpCommand> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DumpRunner for FakeDumpRunner {
    async fn run(&self, command: &DumpCommand) -> Result<String, DumpError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        self.output.clone()
    }
}

/// `SvgRenderer` that counts its invocations.
#[derive(Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiagramRenderer for CountingRenderer {
    fn render(
        &self,
        schema: &SchemaDescription,
        format: OutputFormat,
    ) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SvgRenderer.render(schema, format)
    }
}

/// Config whose stores live under `root`.
pub fn test_config(root: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.files_dir = root.join("files_to_edit");
    cfg.storage.profiles_dir = root.join("database_configs");
    cfg
}

pub fn test_state(
    root: &Path,
    runner: Arc<dyn DumpRunner>,
    renderer: Arc<dyn DiagramRenderer>,
) -> Arc<AppState> {
    let cfg = test_config(root);
    let pipeline = DiagramPipeline::new(
        Arc::new(EngineRegistry::from_config(&cfg.dump)),
        runner,
        Arc::new(SqlImporter),
        renderer,
    );
    AppState::new(cfg, pipeline)
}

/// The application router with the same error layers as the binary.
pub fn test_router(state: Arc<AppState>) -> Router {
    router(state)
        .layer(axum_middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
}
