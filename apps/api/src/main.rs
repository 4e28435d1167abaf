mod config;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, StoreConfig};
use crate::llm_client::LlmClient;
use crate::pipeline::batch::BatchRunner;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{DocumentStore, FsDocumentStore, S3DocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobtree API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config.store).await;

    let llm = LlmClient::new(&config.classifier)?;
    info!("Classifier client initialized (endpoint: {})", config.classifier.endpoint);

    let runner = BatchRunner::from_config(Arc::new(llm), &config.pipeline);
    info!(
        "Pipeline: batch_size={} max_concurrency={} rate_limit={:?} malformed_output={:?}",
        config.pipeline.batch_size,
        config.pipeline.max_concurrency,
        config.pipeline.rate_limit_per_sec,
        config.pipeline.malformed_output
    );

    let state = AppState {
        store,
        runner: Arc::new(runner),
        pipeline: config.pipeline.clone(),
        function_key: config.function_key.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &StoreConfig) -> Arc<dyn DocumentStore> {
    match config {
        StoreConfig::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => {
            let credentials =
                Credentials::new(access_key_id, secret_access_key, None, None, "jobtree-static");

            let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(Region::new(region.clone()))
                .credentials_provider(credentials)
                .endpoint_url(endpoint)
                .load()
                .await;

            info!("S3 document store initialized (bucket: {bucket})");
            Arc::new(S3DocumentStore::new(
                aws_sdk_s3::Client::new(&s3_config),
                bucket.clone(),
            ))
        }
        StoreConfig::Local { root } => {
            info!("Local document store initialized at {}", root.display());
            Arc::new(FsDocumentStore::new(root.clone()))
        }
    }
}
