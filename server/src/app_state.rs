use std::sync::Arc;

use ddam_core::{config::Config, storage::MediaStorage, FileValidator, RenditionCache};

pub struct AppState {
    pub config: Arc<Config>,
    pub storage: MediaStorage,
    pub renditions: RenditionCache,
    pub validator: FileValidator,
}

impl AppState {
    pub fn new(config: Config) -> AppState {
        AppState {
            storage: config.media_storage(),
            renditions: config.rendition_cache(),
            validator: config.validator(),
            config: Arc::new(config),
        }
    }
}

pub type SharedState = Arc<AppState>;
