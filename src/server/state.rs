use std::sync::Arc;

use crate::Pipeline;
use crate::config::ServiceConfig;
use crate::server::error::{ServerError, ServerResult};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Service configuration
    pub config: Arc<ServiceConfig>,

    /// Item pipeline (shared across requests)
    pub pipeline: Arc<Pipeline>,
}

impl ServerState {
    /// Create new server state with the production pipeline
    pub fn new(config: ServiceConfig) -> ServerResult<Self> {
        let pipeline = Pipeline::from_config(&config)
            .map_err(|e| ServerError::Config(format!("failed to build pipeline: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }

    /// Create state around an existing pipeline. Used by embedders and tests
    /// that swap in their own fetcher or recognizer.
    pub fn with_pipeline(config: ServiceConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Name of the OCR engine behind the pipeline
    pub fn engine_name(&self) -> &'static str {
        self.pipeline.recognizer_name()
    }
}
