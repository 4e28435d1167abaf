use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::pipeline::batch::BatchRunner;
use crate::storage::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Backend chosen at startup: S3 bucket or local directory.
    pub store: Arc<dyn DocumentStore>,
    /// Holds the classifier and, when configured, the rate limiter shared by every run.
    pub runner: Arc<BatchRunner>,
    pub pipeline: PipelineConfig,
    pub function_key: Option<String>,
}
