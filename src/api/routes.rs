//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// HTTP handlers realizing spec.md §4.1's six engine operations over REST (SPEC_FULL.md §13).
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use uuid::Uuid;

use crate::domain::models::types::{Order, Trade};
use crate::domain::services::matching_engine::OrderDraft;

use super::dto::{
    BookQuery, BookResponse, CancelOrderQuery, CreateOrderRequest, ModifyOrderRequest,
    StatsResponse, SubmitResponse, TradesQuery,
};
use super::error::ApiResult;
use super::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let draft: OrderDraft = req.into();
    let outcome = state.engine.submit(draft)?;
    Ok(Json(SubmitResponse {
        order: outcome.order,
        trades: outcome.trades,
        warning: outcome.warning,
    }))
}

pub async fn cancel_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<u64>,
    Query(q): Query<CancelOrderQuery>,
) -> ApiResult<Json<Order>> {
    let order = state.engine.cancel(order_id, q.submitter_id)?;
    Ok(Json(order))
}

pub async fn modify_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<u64>,
    Json(req): Json<ModifyOrderRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let outcome = state.engine.modify(order_id, req.submitter_id, req.new_price, req.new_quantity)?;
    Ok(Json(SubmitResponse {
        order: outcome.order,
        trades: outcome.trades,
        warning: outcome.warning,
    }))
}

pub async fn get_book(
    Extension(state): Extension<Arc<AppState>>,
    Path(pair): Path<String>,
    Query(q): Query<BookQuery>,
) -> ApiResult<Json<BookResponse>> {
    let snapshot = state.engine.query_book(&pair, q.depth)?;
    Ok(Json(BookResponse { bids: snapshot.bids, asks: snapshot.asks, last_price: snapshot.last_price }))
}

pub async fn get_trades(
    Extension(state): Extension<Arc<AppState>>,
    Path(pair): Path<String>,
    Query(q): Query<TradesQuery>,
) -> ApiResult<Json<Vec<Trade>>> {
    Ok(Json(state.engine.query_trades(&pair, q.limit)?))
}

pub async fn get_user_orders(
    Extension(state): Extension<Arc<AppState>>,
    Path(submitter_id): Path<Uuid>,
) -> Json<Vec<Order>> {
    Json(state.engine.query_user_orders(submitter_id))
}

pub async fn get_stats(Extension(state): Extension<Arc<AppState>>) -> Json<StatsResponse> {
    let pairs = state.engine.query_market_stats();
    let total_pairs = pairs.len();
    let total_volume_24h = pairs.values().map(|s| s.volume_24h).sum();
    Json(StatsResponse { pairs, total_pairs, total_volume_24h })
}
