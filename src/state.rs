use std::sync::Arc;

use crate::{
    config::AppConfig,
    diagram::{DiagramPipeline, EngineRegistry, ProcessDumpRunner, SqlImporter, SvgRenderer},
    storage::{FileStore, ProfileStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub files: FileStore,
    pub profiles: ProfileStore,
    pub pipeline: DiagramPipeline,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: DiagramPipeline) -> Arc<Self> {
        Arc::new(Self {
            files: FileStore::new(&config.storage.files_dir),
            profiles: ProfileStore::new(&config.storage.profiles_dir),
            pipeline,
            config,
        })
    }

    /// State wired to the real dump tools, importer and renderer.
    pub fn from_config(config: AppConfig) -> Arc<Self> {
        let pipeline = DiagramPipeline::new(
            Arc::new(EngineRegistry::from_config(&config.dump)),
            Arc::new(ProcessDumpRunner::from_config(&config.dump)),
            Arc::new(SqlImporter),
            Arc::new(SvgRenderer),
        );
        Self::new(config, pipeline)
    }
}
