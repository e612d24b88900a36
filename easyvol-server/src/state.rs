//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use easyvol_core::EasyvolConfig;

use crate::print::engine::{PdfEngine, WkhtmltopdfEngine};

/// State shared by every route handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EasyvolConfig,
    pub pdf_engine: Arc<dyn PdfEngine>,
}

impl AppState {
    /// Build state with the real PDF engine from config.
    pub fn new(pool: PgPool, config: EasyvolConfig) -> Self {
        let engine = WkhtmltopdfEngine::new(&config.pdf);
        Self {
            pool,
            config,
            pdf_engine: Arc::new(engine),
        }
    }

    /// Swap in a different PDF engine (tests use the mock).
    pub fn with_engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.pdf_engine = engine;
        self
    }
}
