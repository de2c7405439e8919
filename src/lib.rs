pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use error::AppError;
use services::{file_processor::FileProcessor, file_store::FileStore, query_engine::QueryEngine};

// Application state
pub struct AppState {
    pub config: Config,
    pub store: FileStore,
    pub processor: FileProcessor,
    pub engine: QueryEngine,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let store = FileStore::open(&config.database_path, config.table_cache_capacity)?;
        Ok(Self {
            config,
            store,
            processor: FileProcessor::new(),
            engine: QueryEngine::new(),
        })
    }
}
