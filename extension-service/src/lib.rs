pub mod config;
pub mod extensions;
pub mod handlers;
pub mod services;
pub mod startup;

use crate::config::Settings;
use extensions::wikipedia::cleanup::CleanupPipeline;
use services::{ChatProvider, PageSource};
use std::sync::Arc;

/// Shared application state handed to every extension.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub chat_provider: Arc<dyn ChatProvider>,
    pub page_source: Arc<dyn PageSource>,
    pub cleanup: Arc<CleanupPipeline>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        chat_provider: Arc<dyn ChatProvider>,
        page_source: Arc<dyn PageSource>,
        cleanup: CleanupPipeline,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            chat_provider,
            page_source,
            cleanup: Arc::new(cleanup),
        }
    }
}
