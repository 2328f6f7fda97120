//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Core data types shared by the order book, matching engine, event sink and statistics
// services: orders, trades, and the enums that describe their lifecycle.
//
// | Section  | Description                                                        |
// |----------|--------------------------------------------------------------------|
// | ENUMS    | Side, OrderType, OrderStatus, TimeInForce, CancelReason             |
// | STRUCTS  | Order, Trade                                                       |
// | TESTS    | Unit tests for invariants on Order/Trade construction               |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposite side, used to find the book an incoming order matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// The type of an order, which determines how it is matched and whether it rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Executes immediately at the best available price(s); never rests.
    Market,
    /// Executes at a specified price or better; rests if not fully filled (GTC/GTD).
    Limit,
    /// Becomes a `Market` order once the trigger price is reached.
    Stop,
    /// Becomes a `Limit` order once the trigger price is reached.
    StopLimit,
}

impl OrderType {
    pub fn is_conditional(self) -> bool {
        matches!(self, OrderType::Stop | OrderType::StopLimit)
    }
}

/// Time-in-force policy. `Gtd` carries its own expiry since the field only makes
/// sense for that variant — spec.md requires "expiry time required iff GTD".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-till-cancelled: rests until matched or explicitly cancelled.
    Gtc,
    /// Immediate-or-cancel: fills what it can immediately, remainder is cancelled.
    Ioc,
    /// Fill-or-kill: fills completely immediately, or not at all.
    Fok,
    /// Good-till-date: behaves like GTC until `expires_at`, then the cleanup sweep cancels it.
    Gtd { expires_at: DateTime<Utc> },
}

/// Lifecycle status of an order. Terminal variants are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses are never re-entered once reached (spec.md §3 invariant).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired | OrderStatus::Rejected
        )
    }

    /// Whether an order in this status may still be resting in a book.
    pub fn is_resting(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PartiallyFilled)
    }
}

/// Reason attached to a cancellation or rejection, surfaced to callers and on the
/// `order_cancelled` / rejection events. Closed set per spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelReason {
    /// The submitter cancelled the order directly.
    Requested,
    /// `modify` superseded this order with a fresh one.
    Replaced,
    /// IOC/Market remainder had no further match available.
    IocUnfilled,
    /// FOK could not be filled in full at acceptance.
    FokUnfillable,
    /// GTD expiry passed and the cleanup sweep removed it.
    Expired,
}

impl CancelReason {
    /// The wire string used on events and in query responses.
    pub fn as_str(self) -> &'static str {
        match self {
            CancelReason::Requested => "requested",
            CancelReason::Replaced => "replaced",
            CancelReason::IocUnfilled => "ioc_unfilled",
            CancelReason::FokUnfillable => "fok_unfillable",
            CancelReason::Expired => "expired",
        }
    }
}

/// A trading order. Created on submission by [`crate::domain::services::matching_engine::engine::MatchingEngine::submit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Engine-assigned, unique, monotonic identifier.
    pub id: u64,
    /// Identifier of the account that submitted the order.
    pub submitter_id: Uuid,
    /// Opaque trading-pair identifier (the tokenized invoice this order trades).
    pub pair: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Original quantity. Strictly positive.
    pub quantity: Decimal,
    /// Quantity filled so far. `0 <= filled <= quantity`.
    pub filled: Decimal,
    /// Required iff `order_type` is `Limit` or `StopLimit`.
    pub limit_price: Option<Decimal>,
    /// Required iff `order_type` is `Stop` or `StopLimit`.
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    /// Engine-assigned monotonic sequence number; the tie-break for time priority
    /// within a price level (spec.md §3: "earliest creation timestamp first").
    pub sequence: u64,
    /// Set once the order leaves the book for a reason other than a full fill.
    pub cancel_reason: Option<CancelReason>,
}

impl Order {
    /// Remaining tradable quantity.
    pub fn remaining(&self) -> Decimal {
        self.quantity - self.filled
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }
}

/// An immutable record of a completed fill between a resting maker order and an
/// incoming taker order. Never mutated after creation (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub pair: String,
    pub maker_order_id: u64,
    pub taker_order_id: u64,
    pub price: Decimal,
    pub quantity: Decimal,
    pub executed_at: DateTime<Utc>,
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
