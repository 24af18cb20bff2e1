use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::coordinator::CoordinatorError;
use crate::dispatch::Dispatcher;
use crate::identity::IdentityProvider;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            dispatcher,
            identity,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

fn coordinator_status(error: &CoordinatorError) -> StatusCode {
    match error {
        CoordinatorError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        CoordinatorError::PermissionDenied => StatusCode::FORBIDDEN,
        CoordinatorError::UnknownChannel(_) | CoordinatorError::UnknownServer(_) => {
            StatusCode::NOT_FOUND
        }
        CoordinatorError::NoServerAvailable => StatusCode::SERVICE_UNAVAILABLE,
        CoordinatorError::UnknownRole(_)
        | CoordinatorError::UnknownMap(_)
        | CoordinatorError::InvalidBanDuration => StatusCode::BAD_REQUEST,
        _ => StatusCode::CONFLICT,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, retryable) = match self {
            AppError::Coordinator(e) => (coordinator_status(&e), e.to_string(), e.is_retryable()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, false),
        };

        let body = Json(json!({
            "error": error_message,
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}
