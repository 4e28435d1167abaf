pub mod health;
pub mod trigger;

use axum::{middleware, routing::get, Router};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let trigger_routes = Router::new()
        .route(
            "/api/function",
            get(trigger::handle_trigger).post(trigger::handle_trigger),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            trigger::require_function_key,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(trigger_routes)
        .with_state(state)
}
