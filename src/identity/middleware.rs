use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::coordinator::AccountName;
use crate::shared::{AppError, AppState};

/// Verified account of the chat user behind a request, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Actor(pub Option<AccountName>);

/// Resolves `Authorization: Bearer <token>` into an [`Actor`] extension.
/// A missing header yields an unauthenticated actor; a bad token is rejected.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), identity::resolve_actor))
#[instrument(skip(state, req, next))]
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .map(str::to_string);

    let actor = match header {
        None => {
            debug!("No Authorization header, actor is unauthenticated");
            Actor(None)
        }
        Some(header) => {
            let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                warn!("Invalid Authorization header format (expected Bearer token)");
                AppError::Unauthorized("Invalid authorization header format".to_string())
            })?;

            let account = state.identity.verify(token).await.map_err(|e| {
                warn!(error = %e, "Identity verification failed");
                AppError::Unauthorized(e.to_string())
            })?;

            debug!(account = %account, "Actor authenticated");
            Actor(Some(account))
        }
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
