use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{api_state::ApiState, error::ApiError};

/// Bearer-token guard. A no-op when `api_auth_token` isn't configured, since
/// this service has no user/session model of its own to authenticate against.
pub async fn api_auth(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &state.config.api_auth_token else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented != Some(expected.as_str()) {
        return Err(ApiError::Validation("missing or invalid bearer token".into()));
    }

    Ok(next.run(request).await)
}
