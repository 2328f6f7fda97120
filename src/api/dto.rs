//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Wire-format request/response DTOs for the REST surface (SPEC_FULL.md §13). Kept separate
// from the domain's `Order`/`Trade` types so the wire shape can evolve independently of the
// engine's internal model.
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::market::MarketStats;
use crate::domain::models::types::{Order, OrderType, Side, TimeInForce};
use crate::domain::services::matching_engine::OrderDraft;
use crate::domain::services::orderbook::AggregatedLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub submitter_id: Uuid,
    pub pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    #[serde(default = "default_tif")]
    pub time_in_force: TimeInForce,
}

fn default_tif() -> TimeInForce {
    TimeInForce::Gtc
}

impl From<CreateOrderRequest> for OrderDraft {
    fn from(req: CreateOrderRequest) -> Self {
        OrderDraft {
            submitter_id: req.submitter_id,
            pair: req.pair,
            side: req.side,
            order_type: req.order_type,
            quantity: req.quantity,
            limit_price: req.limit_price,
            stop_price: req.stop_price,
            time_in_force: req.time_in_force,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    pub submitter_id: Uuid,
    pub new_price: Option<Decimal>,
    pub new_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderQuery {
    pub submitter_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookQuery {
    pub depth: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradesQuery {
    #[serde(default = "default_trade_limit")]
    pub limit: usize,
}

fn default_trade_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub order: Order,
    pub trades: Vec<crate::domain::models::types::Trade>,
    pub warning: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub bids: Vec<AggregatedLevel>,
    pub asks: Vec<AggregatedLevel>,
    pub last_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub pairs: HashMap<String, MarketStats>,
    pub total_pairs: usize,
    pub total_volume_24h: Decimal,
}
