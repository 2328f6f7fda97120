use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::services::matching_engine::EngineError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Wraps [`EngineError`] for HTTP responses and adds the transport-level failures that
/// have no counterpart in the engine's own error taxonomy (spec.md §7).
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Engine(EngineError::InvalidParams(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Engine(EngineError::PairUnknown(pair)) => {
                (StatusCode::NOT_FOUND, format!("pair {pair} is not known to the engine"))
            }
            ApiError::Engine(EngineError::NotFound(id)) => (StatusCode::NOT_FOUND, format!("order {id} not found")),
            ApiError::Engine(EngineError::Forbidden(_, id)) => {
                (StatusCode::FORBIDDEN, format!("not permitted to modify order {id}"))
            }
            ApiError::Engine(EngineError::AlreadyTerminal(id)) => {
                (StatusCode::CONFLICT, format!("order {id} is already in a terminal state"))
            }
            ApiError::Engine(EngineError::FokUnfillable(id)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, format!("order {id} could not be filled in full"))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({ "error": { "message": message, "code": status.as_u16() } }));
        (status, body).into_response()
    }
}
