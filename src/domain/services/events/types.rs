//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The fixed set of events the matching engine emits (spec.md §4.3), and the envelope that
// carries a `type`, a per-channel monotonic `sequence`, and the channel name alongside the
// payload, as spec.md §6 requires of every message pushed to a subscriber.
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::market::MarketStats;
use crate::domain::models::types::{CancelReason, Order, OrderStatus, Trade};
use crate::domain::services::orderbook::AggregatedLevel;

/// A single engine-emitted event (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OrderAccepted {
        order: Order,
    },
    OrderUpdate {
        order_id: u64,
        status: OrderStatus,
        filled: Decimal,
    },
    TradeExecuted {
        trade: Trade,
    },
    OrderBookUpdate {
        pair: String,
        bids: Vec<AggregatedLevel>,
        asks: Vec<AggregatedLevel>,
        last_price: Option<Decimal>,
    },
    MarketStatsUpdate {
        pair: String,
        stats: MarketStats,
    },
    OrderCancelled {
        order_id: u64,
        reason: CancelReason,
    },
    /// Emitted on `trading_updates` once at shutdown (spec.md §6).
    EngineShutdown,
}

impl Event {
    /// The wire `type` tag, also used for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::OrderAccepted { .. } => "order_accepted",
            Event::OrderUpdate { .. } => "order_update",
            Event::TradeExecuted { .. } => "trade_executed",
            Event::OrderBookUpdate { .. } => "order_book_update",
            Event::MarketStatsUpdate { .. } => "market_stats_update",
            Event::OrderCancelled { .. } => "order_cancelled",
            Event::EngineShutdown => "engine_shutdown",
        }
    }
}

/// What is actually pushed down a subscriber's queue: the event plus the channel it was
/// delivered on and that channel's monotonic sequence number (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub channel: String,
    pub sequence: u64,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}
