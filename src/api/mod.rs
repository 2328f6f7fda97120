//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// REST + WebSocket transport surface over the matching engine (SPEC_FULL.md §13). Mirrors the
// teacher's `api/routes.rs` + `api/dto.rs` split (handlers vs. wire DTOs) and `ApiError` pattern.
//
// | Component   | Description                                                           |
// |-------------|-------------------------------------------------------------------------|
// | AppState    | Shared handle to the engine and event sink, attached via Extension      |
// | routes      | REST handlers for the six engine operations                             |
// | ws          | WebSocket duplex event stream                                           |
// | dto         | Wire request/response shapes                                            |
// | error       | ApiError -> HTTP status/body mapping                                    |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;
mod ws;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{delete, get, patch, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::domain::services::events::EventSink;
use crate::domain::services::matching_engine::MatchingEngine;

pub use dto::{BookResponse, CreateOrderRequest, ModifyOrderRequest, StatsResponse, SubmitResponse};
pub use error::{ApiError, ApiResult};

pub struct AppState {
    pub engine: Arc<MatchingEngine>,
    pub events: Arc<EventSink>,
}

impl AppState {
    pub fn new(engine: Arc<MatchingEngine>, events: Arc<EventSink>) -> Self {
        Self { engine, events }
    }
}

/// Builds the full axum router: REST operations plus the WebSocket stream endpoint.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/orders", post(routes::create_order))
        .route("/orders/:id", delete(routes::cancel_order))
        .route("/orders/:id", patch(routes::modify_order))
        .route("/pairs/:pair/book", get(routes::get_book))
        .route("/pairs/:pair/trades", get(routes::get_trades))
        .route("/accounts/:id/orders", get(routes::get_user_orders))
        .route("/stats", get(routes::get_stats))
        .route("/stream/:subscriber_id", get(ws::stream_handler))
        .layer(Extension(state))
        .layer(cors)
}
