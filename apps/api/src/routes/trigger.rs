//! HTTP trigger for a full extraction run.

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::errors::AppError;
use crate::models::posting::ExtractionResult;
use crate::pipeline::run_pipeline;
use crate::state::AppState;

const FUNCTION_KEY_HEADER: &str = "x-functions-key";

const NAMED_MESSAGE: &str = "Extracted information from jd";
const DEFAULT_MESSAGE: &str = "This HTTP triggered function executed successfully. \
    Pass a name in the query string or in the request body for a personalized response.";

#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerBody {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub message: String,
    pub postings: usize,
    pub extracted: usize,
    pub dropped: usize,
    pub batches: usize,
    pub leaves: usize,
    pub tree_document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_document: Option<String>,
    pub results: Vec<ExtractionResult>,
}

/// GET|POST /api/function
///
/// Reads the postings document, classifies every posting, writes the
/// taxonomy tree and returns the flat results. `name` is taken from the
/// query string first, then from a JSON body.
pub async fn handle_trigger(
    State(state): State<AppState>,
    Query(query): Query<TriggerQuery>,
    body: Option<Json<TriggerBody>>,
) -> Result<Json<TriggerResponse>, AppError> {
    info!("HTTP trigger processed a request.");

    let outcome = run_pipeline(state.store.as_ref(), &state.runner, &state.pipeline).await?;

    let name = query
        .name
        .or_else(|| body.and_then(|Json(b)| b.name))
        .filter(|n| !n.trim().is_empty());
    let message = match name {
        Some(_) => NAMED_MESSAGE,
        None => DEFAULT_MESSAGE,
    };

    let report = outcome.report;
    Ok(Json(TriggerResponse {
        message: message.to_string(),
        postings: report.postings,
        extracted: report.results.len(),
        dropped: report.dropped,
        batches: report.batches,
        leaves: outcome.tree.leaves().count(),
        tree_document: state.pipeline.tree_document.clone(),
        results_document: outcome.results_document,
        results: report.results,
    }))
}

/// Access-key gate: when a function key is configured, the request must carry
/// it in the `x-functions-key` header or the `code` query parameter.
pub async fn require_function_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.function_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let from_header = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let from_query = Query::<KeyQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.code);

    match from_header.or(from_query) {
        Some(key) if key_matches(&key, expected) => Ok(next.run(request).await),
        _ => Err(AppError::Unauthorized),
    }
}

/// Constant-time comparison for equal-length keys.
fn key_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
