use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Extract and validate the JWT from the Authorization header. On success
/// the decoded `Claims` are available to handlers as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        return Err(ApiError::Auth("Not authorized, no token".into()));
    };

    let claims = state.tokens.verify(bearer.token()).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Auth("Not authorized, token failed".into())
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
