use api_state::ApiState;
use axum::{
    extract::FromRef, middleware::from_fn_with_state, routing::post, Router,
};
use middleware_api_auth::api_auth;
use routes::{forget::forget, recall::recall, remember::remember, status::status};

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod routes;

/// Router for the four RPC operations, version 1.
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/v1/remember", post(remember))
        .route("/v1/recall", post(recall))
        .route("/v1/forget", post(forget))
        .route("/v1/status", post(status))
        .route_layer(from_fn_with_state(app_state.clone(), api_auth))
}
