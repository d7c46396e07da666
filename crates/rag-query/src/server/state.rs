//! Application state for the RAG query server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::retrieval::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Query pipeline over the shared providers
    pipeline: RagPipeline,
}

impl AppState {
    /// Create state with the HTTP-backed pipeline for `config`
    pub fn new(config: RagConfig) -> Result<Self> {
        let pipeline = RagPipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create state around an already-built pipeline
    pub fn with_pipeline(config: RagConfig, pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the query pipeline
    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }
}
