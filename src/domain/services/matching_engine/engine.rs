//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The central limit order-matching engine (spec.md §4.1). Owns one `OrderBook` per trading
// pair plus per-pair trade history, rolling statistics, and pending stop orders. All mutation
// goes through a single `parking_lot::Mutex` covering validation -> insert -> match loop ->
// event emission (spec.md §5 concurrency model, option (b)), so every `submit`/`cancel`/
// `modify` call is atomic with respect to every other.
//
// | Component      | Description                                                        |
// |----------------|---------------------------------------------------------------------|
// | MatchingEngine | Public entry point: submit/cancel/modify/query_*                   |
// | EngineState    | The mutex-guarded mutable state: pairs, order index, trade ring    |
// | PairState      | Per-pair book, pending stops, trade history, statistics             |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::models::market::{MarketStats, PairStatistics};
use crate::domain::models::types::{
    CancelReason, Order, OrderStatus, OrderType, Side, TimeInForce, Trade,
};
use crate::domain::services::events::{Event, EventSink};
use crate::domain::services::orderbook::{AggregatedLevel, OrderBook};

use super::clock::Clock;
use super::error::EngineError;

/// Unvalidated submission, as received from a caller (spec.md §4.1 `order_draft`).
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub submitter_id: Uuid,
    pub pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

/// Successful result of `submit` (spec.md §4.1, SPEC_FULL §12: non-fatal warnings travel
/// alongside a success rather than as an `Err`).
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub order: Order,
    pub trades: Vec<Trade>,
    /// Set to `Some("ioc_unfilled")` when an IOC/MARKET order rested no quantity and was
    /// cancelled, per spec.md §7: this is a warning, not a rejection.
    pub warning: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub bids: Vec<AggregatedLevel>,
    pub asks: Vec<AggregatedLevel>,
    pub last_price: Option<Decimal>,
}

/// Tunables pulled from `Config` (SPEC_FULL §11); never panics, every field has a default.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub order_book_depth_default: usize,
    pub trade_ring_size: usize,
    pub trade_retention_per_pair: usize,
    pub trade_retention_hours: i64,
    pub order_book_update_debounce_ms: i64,
    pub market_stats_update_interval_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_book_depth_default: 20,
            trade_ring_size: 1000,
            trade_retention_per_pair: 10_000,
            trade_retention_hours: 24,
            order_book_update_debounce_ms: 50,
            market_stats_update_interval_ms: 1000,
        }
    }
}

struct PairState {
    book: OrderBook,
    /// Resting STOP/STOP_LIMIT orders, not yet triggered (spec.md §4.1).
    stops: Vec<Order>,
    trades: VecDeque<Trade>,
    stats: PairStatistics,
    last_book_update_emit: Option<DateTime<Utc>>,
    last_stats_update_emit: Option<DateTime<Utc>>,
}

impl PairState {
    fn new(pair: &str) -> Self {
        Self {
            book: OrderBook::new(pair),
            stops: Vec::new(),
            trades: VecDeque::new(),
            stats: PairStatistics::new(),
            last_book_update_emit: None,
            last_stats_update_emit: None,
        }
    }
}

struct EngineState {
    pairs: HashMap<String, PairState>,
    /// Which pair's book an order id belongs to, set at creation and kept for the order's
    /// lifetime so cancel/modify/query can find it without scanning every pair.
    order_pair: HashMap<u64, String>,
    /// Orders that have left the book (terminal) but are still queryable by
    /// `query_user_orders`.
    archived_orders: HashMap<u64, Order>,
    submitter_orders: HashMap<Uuid, Vec<u64>>,
    recent_trades: VecDeque<Trade>,
    next_order_id: u64,
    next_trade_id: u64,
    next_sequence: u64,
}

impl EngineState {
    fn new() -> Self {
        Self {
            pairs: HashMap::new(),
            order_pair: HashMap::new(),
            archived_orders: HashMap::new(),
            submitter_orders: HashMap::new(),
            recent_trades: VecDeque::new(),
            next_order_id: 1,
            next_trade_id: 1,
            next_sequence: 1,
        }
    }

    fn next_order_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    fn next_trade_id(&mut self) -> u64 {
        let id = self.next_trade_id;
        self.next_trade_id += 1;
        id
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    fn record_submitter(&mut self, submitter: Uuid, order_id: u64) {
        self.submitter_orders.entry(submitter).or_default().push(order_id);
    }

    fn archive(&mut self, order: Order) {
        self.archived_orders.insert(order.id, order);
    }
}

pub struct MatchingEngine {
    state: Mutex<EngineState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventSink>,
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(clock: Arc<dyn Clock>, events: Arc<EventSink>, config: EngineConfig) -> Self {
        Self {
            state: Mutex::new(EngineState::new()),
            clock,
            events,
            config,
        }
    }

    //----------------------------------------------------------------------------------------
    // submit
    //----------------------------------------------------------------------------------------

    pub fn submit(&self, draft: OrderDraft) -> Result<SubmitOutcome, EngineError> {
        self.validate_draft(&draft)?;

        let mut state = self.state.lock();
        let now = self.clock.now();
        self.submit_locked(&mut state, draft, now)
    }

    /// The body of `submit` once the engine lock is already held, so `modify` can share one
    /// critical section across its read-validate-cancel-reinsert sequence (spec.md §5).
    fn submit_locked(&self, state: &mut EngineState, draft: OrderDraft, now: DateTime<Utc>) -> Result<SubmitOutcome, EngineError> {
        let id = state.next_order_id();
        let sequence = state.next_sequence();

        let order = Order {
            id,
            submitter_id: draft.submitter_id,
            pair: draft.pair.clone(),
            side: draft.side,
            order_type: draft.order_type,
            quantity: draft.quantity,
            filled: Decimal::ZERO,
            limit_price: draft.limit_price,
            stop_price: draft.stop_price,
            time_in_force: draft.time_in_force,
            created_at: now,
            status: OrderStatus::Pending,
            sequence,
            cancel_reason: None,
        };

        state.order_pair.insert(order.id, order.pair.clone());
        state.record_submitter(order.submitter_id, order.id);

        tracing::debug!(pair = %order.pair, order_id = order.id, "submit");
        self.emit_order_accepted(state, &order);

        let outcome = if order.order_type.is_conditional() {
            self.accept_conditional(state, order)
        } else {
            self.accept_and_match(state, order, now)?
        };

        Ok(outcome)
    }

    fn validate_draft(&self, draft: &OrderDraft) -> Result<(), EngineError> {
        if draft.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidParams("quantity must be positive".into()));
        }
        let needs_limit = matches!(draft.order_type, OrderType::Limit | OrderType::StopLimit);
        let needs_stop = matches!(draft.order_type, OrderType::Stop | OrderType::StopLimit);

        if needs_limit {
            match draft.limit_price {
                Some(p) if p > Decimal::ZERO => {}
                _ => return Err(EngineError::InvalidParams("limit price required and must be positive".into())),
            }
        }
        if needs_stop {
            match draft.stop_price {
                Some(p) if p > Decimal::ZERO => {}
                _ => return Err(EngineError::InvalidParams("stop price required and must be positive".into())),
            }
        }
        if let TimeInForce::Gtd { expires_at } = draft.time_in_force {
            if expires_at <= self.clock.now() {
                return Err(EngineError::InvalidParams("GTD expiry must be in the future".into()));
            }
        }
        Ok(())
    }

    /// STOP/STOP_LIMIT orders never match immediately; they wait in the pair's stop list
    /// until triggered by a subsequent trade (spec.md §4.1).
    fn accept_conditional(&self, state: &mut EngineState, order: Order) -> SubmitOutcome {
        let pair_state = state.pairs.entry(order.pair.clone()).or_insert_with(|| PairState::new(&order.pair));
        pair_state.stops.push(order.clone());
        SubmitOutcome { order, trades: Vec::new(), warning: None }
    }

    /// LIMIT/MARKET acceptance: insert into matching flow, run the loop, then dispose of
    /// whatever remains per spec.md §4.1's post-loop disposition rules.
    fn accept_and_match(
        &self,
        state: &mut EngineState,
        mut order: Order,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, EngineError> {
        let pair = order.pair.clone();

        if order.time_in_force == TimeInForce::Fok {
            let fillable = self.fok_fillable(state, &order);
            if !fillable {
                order.status = OrderStatus::Cancelled;
                order.cancel_reason = Some(CancelReason::FokUnfillable);
                let order_id = order.id;
                state.archive(order.clone());
                self.emit_order_update(state, &order);
                self.emit_order_cancelled(state, order_id, &order.pair, order.submitter_id, CancelReason::FokUnfillable);
                return Ok(SubmitOutcome { order, trades: Vec::new(), warning: None });
            }
        }

        let trades = self.run_match_loop(state, &mut order, now);

        let warning = self.dispose_after_match(state, &mut order);

        self.maybe_emit_book_update(state, &pair, now);
        if !trades.is_empty() {
            self.maybe_emit_stats_update(state, &pair, now);
            self.trigger_stops(state, &pair, now);
        }

        Ok(SubmitOutcome { order, trades, warning })
    }

    /// Non-destructive pre-match liquidity walk for FOK (spec.md §4.1 "FOK detection").
    fn fok_fillable(&self, state: &EngineState, order: &Order) -> bool {
        let Some(pair_state) = state.pairs.get(&order.pair) else {
            return false;
        };
        let opposite = order.side.opposite();
        let mut available = Decimal::ZERO;
        let needed = order.remaining();
        let limit = order.limit_price;

        pair_state.book.walk(opposite, |resting| {
            if !Self::price_compatible(order.side, order.order_type, limit, resting.limit_price.unwrap_or(Decimal::ZERO)) {
                return false;
            }
            available += resting.remaining();
            available < needed
        });
        available >= needed
    }

    fn price_compatible(taker_side: Side, taker_type: OrderType, taker_limit: Option<Decimal>, resting_price: Decimal) -> bool {
        if taker_type == OrderType::Market {
            return true;
        }
        match (taker_side, taker_limit) {
            (Side::Buy, Some(limit)) => resting_price <= limit,
            (Side::Sell, Some(limit)) => resting_price >= limit,
            _ => true,
        }
    }

    /// The core matching loop shared by LIMIT and MARKET takers (spec.md §4.1).
    fn run_match_loop(&self, state: &mut EngineState, taker: &mut Order, now: DateTime<Utc>) -> Vec<Trade> {
        let mut trades = Vec::new();
        let opposite = taker.side.opposite();
        let pair = taker.pair.clone();

        loop {
            if taker.remaining().is_zero() {
                break;
            }
            let Some(pair_state) = state.pairs.get_mut(&pair) else { break };

            let Some(maker) = pair_state.book.peek_head_mut(opposite) else { break };
            let maker_price = maker.limit_price.expect("resting order always has a limit price");

            if !Self::price_compatible(taker.side, taker.order_type, taker.limit_price, maker_price) {
                break;
            }

            let trade_qty = taker.remaining().min(maker.remaining());
            maker.filled += trade_qty;
            let maker_filled_now = maker.filled;
            let maker_id = maker.id;
            let maker_created_at = maker.created_at;
            let maker_submitter = maker.submitter_id;
            if maker.filled >= maker.quantity {
                maker.status = OrderStatus::Filled;
            } else {
                maker.status = OrderStatus::PartiallyFilled;
            }
            let maker_status = maker.status;

            pair_state.book.record_fill_at_best(opposite, trade_qty);

            taker.filled += trade_qty;
            taker.status = if taker.filled >= taker.quantity {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };

            debug_assert!(maker_created_at <= now, "maker must predate this match");

            let trade = Trade {
                id: state.next_trade_id(),
                pair: pair.clone(),
                maker_order_id: maker_id,
                taker_order_id: taker.id,
                price: maker_price,
                quantity: trade_qty,
                executed_at: now,
            };

            tracing::trace!(pair = %pair, maker_order_id = maker_id, taker_order_id = taker.id, price = %maker_price, quantity = %trade_qty, "fill");

            self.emit_trade(state, &trade);
            self.emit_order_update_direct(state, maker_id, maker_status, maker_filled_now, maker_submitter);

            if let Some(pair_state) = state.pairs.get_mut(&pair) {
                pair_state.stats.record_trade(trade.price, trade.quantity, now);
                pair_state.trades.push_back(trade.clone());
                Self::enforce_retention(pair_state, self.config.trade_retention_per_pair, self.config.trade_retention_hours, now);
            }
            state.recent_trades.push_back(trade.clone());
            while state.recent_trades.len() > self.config.trade_ring_size {
                state.recent_trades.pop_front();
            }

            trades.push(trade);

            if let Some(pair_state) = state.pairs.get_mut(&pair) {
                if let Some(filled_maker) = pair_state.book.pop_head_if_filled(opposite) {
                    state.archive(filled_maker);
                }
            }
        }

        trades
    }

    fn enforce_retention(pair_state: &mut PairState, cap: usize, hours: i64, now: DateTime<Utc>) {
        while pair_state.trades.len() > cap {
            pair_state.trades.pop_front();
        }
        let cutoff = now - chrono::Duration::hours(hours);
        while matches!(pair_state.trades.front(), Some(t) if t.executed_at < cutoff) {
            pair_state.trades.pop_front();
        }
    }

    /// Applies spec.md §4.1's post-match-loop disposition rules to the taker.
    fn dispose_after_match(&self, state: &mut EngineState, order: &mut Order) -> Option<&'static str> {
        if order.remaining().is_zero() {
            order.status = OrderStatus::Filled;
            state.archive(order.clone());
            self.emit_order_update(state, order);
            return None;
        }

        match (order.order_type, order.time_in_force) {
            (OrderType::Limit, TimeInForce::Gtc) | (OrderType::Limit, TimeInForce::Gtd { .. }) => {
                let pair_state = state.pairs.entry(order.pair.clone()).or_insert_with(|| PairState::new(&order.pair));
                pair_state.book.insert(order.clone()).expect("freshly built order always matches its own pair");
                self.emit_order_update(state, order);
                None
            }
            _ => {
                // MARKET, IOC, or an FOK that somehow fell through after a partial loop
                // iteration (should not happen given the pre-match check, but the
                // remainder is still disposed of safely rather than left dangling).
                let had_fill = order.filled > Decimal::ZERO;
                order.status = if had_fill { OrderStatus::PartiallyFilled } else { OrderStatus::Cancelled };
                order.cancel_reason = Some(CancelReason::IocUnfilled);
                state.archive(order.clone());
                self.emit_order_update(state, order);
                self.emit_order_cancelled(state, order.id, &order.pair, order.submitter_id, CancelReason::IocUnfilled);
                Some("ioc_unfilled")
            }
        }
    }

    /// Evaluates pending stop orders against the last trade price on `pair`, next-tick
    /// (after the triggering match's events have been emitted), per spec.md §9's chosen
    /// resolution of the STOP-ordering open question.
    fn trigger_stops(&self, state: &mut EngineState, pair: &str, now: DateTime<Utc>) {
        let Some(last_price) = state.pairs.get(pair).and_then(|p| p.stats.snapshot_last_price()) else {
            return;
        };

        let Some(pair_state) = state.pairs.get_mut(pair) else { return };
        let mut triggered = Vec::new();
        let mut remaining_stops = Vec::new();
        for stop in pair_state.stops.drain(..) {
            let should_trigger = match stop.side {
                Side::Buy => stop.stop_price.map(|sp| last_price >= sp).unwrap_or(false),
                Side::Sell => stop.stop_price.map(|sp| last_price <= sp).unwrap_or(false),
            };
            if should_trigger {
                triggered.push(stop);
            } else {
                remaining_stops.push(stop);
            }
        }
        pair_state.stops = remaining_stops;

        for mut stop in triggered {
            let sequence = state.next_sequence();
            stop.sequence = sequence;
            stop.created_at = now;
            stop.order_type = if stop.order_type == OrderType::Stop { OrderType::Market } else { OrderType::Limit };
            tracing::debug!(pair, order_id = stop.id, "stop triggered");

            let trades = self.run_match_loop(state, &mut stop, now);
            let _ = self.dispose_after_match(state, &mut stop);
            if !trades.is_empty() {
                self.maybe_emit_stats_update(state, pair, now);
            }
            self.maybe_emit_book_update(state, pair, now);
        }
    }

    //----------------------------------------------------------------------------------------
    // cancel / modify
    //----------------------------------------------------------------------------------------

    pub fn cancel(&self, order_id: u64, submitter_id: Uuid) -> Result<Order, EngineError> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        self.cancel_locked(&mut state, now, order_id, submitter_id)
    }

    /// The body of `cancel` once the engine lock is already held, so `modify` can share one
    /// critical section across its read-validate-cancel-reinsert sequence (spec.md §5).
    fn cancel_locked(&self, state: &mut EngineState, now: DateTime<Utc>, order_id: u64, submitter_id: Uuid) -> Result<Order, EngineError> {
        if let Some(archived) = state.archived_orders.get(&order_id) {
            if archived.status.is_terminal() {
                return Err(EngineError::AlreadyTerminal(order_id));
            }
        }

        let pair = state
            .order_pair
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))?;

        // Conditional (not-yet-triggered) stop orders live outside the book.
        if let Some(pair_state) = state.pairs.get_mut(&pair) {
            if let Some(pos) = pair_state.stops.iter().position(|o| o.id == order_id) {
                let mut stop = pair_state.stops.remove(pos);
                if stop.submitter_id != submitter_id {
                    pair_state.stops.insert(pos, stop);
                    return Err(EngineError::Forbidden(submitter_id, order_id));
                }
                stop.status = OrderStatus::Cancelled;
                stop.cancel_reason = Some(CancelReason::Requested);
                state.archive(stop.clone());
                self.emit_order_cancelled(state, order_id, &pair, submitter_id, CancelReason::Requested);
                return Ok(stop);
            }
        }

        let Some(pair_state) = state.pairs.get_mut(&pair) else {
            return Err(EngineError::NotFound(order_id));
        };
        if !pair_state.book.contains(order_id) {
            return Err(EngineError::AlreadyTerminal(order_id));
        }
        let existing_submitter = pair_state.book.get(order_id).map(|o| o.submitter_id);
        if existing_submitter != Some(submitter_id) {
            return Err(EngineError::Forbidden(submitter_id, order_id));
        }

        let mut order = pair_state.book.remove(order_id).map_err(|_| EngineError::NotFound(order_id))?;
        order.status = OrderStatus::Cancelled;
        order.cancel_reason = Some(CancelReason::Requested);
        state.archive(order.clone());

        self.maybe_emit_book_update(state, &pair, now);
        self.emit_order_cancelled(state, order_id, &pair, submitter_id, CancelReason::Requested);
        Ok(order)
    }

    /// Equivalent to cancel + resubmit: the replacement gets a fresh id, timestamp, and
    /// time priority (spec.md §4.1). Runs under a single lock acquisition spanning the
    /// read, validation, cancel, and reinsertion so a concurrent `submit` cannot change
    /// `existing.filled` between the validation check and the actual cancel.
    pub fn modify(
        &self,
        order_id: u64,
        submitter_id: Uuid,
        new_price: Option<Decimal>,
        new_quantity: Option<Decimal>,
    ) -> Result<SubmitOutcome, EngineError> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let pair = state.order_pair.get(&order_id).cloned().ok_or(EngineError::NotFound(order_id))?;
        let pair_state = state.pairs.get(&pair).ok_or(EngineError::NotFound(order_id))?;
        let existing = pair_state.book.get(order_id).cloned().ok_or(EngineError::AlreadyTerminal(order_id))?;

        if existing.submitter_id != submitter_id {
            return Err(EngineError::Forbidden(submitter_id, order_id));
        }
        let quantity = new_quantity.unwrap_or(existing.quantity);
        if quantity <= existing.filled {
            return Err(EngineError::InvalidParams("reduced quantity must exceed already-filled amount".into()));
        }

        let draft = OrderDraft {
            submitter_id,
            pair: existing.pair,
            side: existing.side,
            order_type: existing.order_type,
            quantity,
            limit_price: new_price.or(existing.limit_price),
            stop_price: existing.stop_price,
            time_in_force: existing.time_in_force,
        };
        self.validate_draft(&draft)?;

        self.cancel_locked(&mut state, now, order_id, submitter_id)?;
        self.submit_locked(&mut state, draft, now)
    }

    //----------------------------------------------------------------------------------------
    // queries
    //----------------------------------------------------------------------------------------

    pub fn query_book(&self, pair: &str, depth: Option<usize>) -> Result<BookSnapshot, EngineError> {
        let state = self.state.lock();
        let depth = depth.unwrap_or(self.config.order_book_depth_default);
        let pair_state = state.pairs.get(pair).ok_or_else(|| EngineError::PairUnknown(pair.to_string()))?;
        Ok(BookSnapshot {
            bids: pair_state.book.aggregate(Side::Buy, depth),
            asks: pair_state.book.aggregate(Side::Sell, depth),
            last_price: pair_state.stats.snapshot_last_price(),
        })
    }

    pub fn query_trades(&self, pair: &str, limit: usize) -> Result<Vec<Trade>, EngineError> {
        let state = self.state.lock();
        let pair_state = state.pairs.get(pair).ok_or_else(|| EngineError::PairUnknown(pair.to_string()))?;
        Ok(pair_state.trades.iter().rev().take(limit).cloned().collect())
    }

    pub fn query_user_orders(&self, submitter_id: Uuid) -> Vec<Order> {
        let state = self.state.lock();
        let Some(ids) = state.submitter_orders.get(&submitter_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.find_order(&state, *id))
            .collect()
    }

    fn find_order(&self, state: &EngineState, order_id: u64) -> Option<Order> {
        if let Some(order) = state.archived_orders.get(&order_id) {
            return Some(order.clone());
        }
        let pair = state.order_pair.get(&order_id)?;
        let pair_state = state.pairs.get(pair)?;
        if let Some(order) = pair_state.book.get(order_id) {
            return Some(order.clone());
        }
        pair_state.stops.iter().find(|o| o.id == order_id).cloned()
    }

    pub fn query_market_stats(&self) -> HashMap<String, MarketStats> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state
            .pairs
            .iter_mut()
            .map(|(pair, pair_state)| (pair.clone(), pair_state.stats.snapshot(now)))
            .collect()
    }

    //----------------------------------------------------------------------------------------
    // periodic sweep (spec.md §4.1 Expiry, §5 Timers)
    //----------------------------------------------------------------------------------------

    /// Removes resting orders whose GTD expiry has passed and evicts stale trade history.
    /// Invoked by the host binary on a `SWEEP_INTERVAL_SECS` timer; takes the same lock as
    /// submissions so the book is never observed mid-sweep.
    pub fn run_sweep(&self) {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let mut expired_count = 0;

        let pairs: Vec<String> = state.pairs.keys().cloned().collect();
        for pair in &pairs {
            let expired_ids: Vec<u64> = {
                let pair_state = state.pairs.get(pair).expect("pair listed above");
                let mut ids = Vec::new();
                for side in [Side::Buy, Side::Sell] {
                    pair_state.book.walk(side, |order| {
                        if let TimeInForce::Gtd { expires_at } = order.time_in_force {
                            if expires_at <= now {
                                ids.push(order.id);
                            }
                        }
                        true
                    });
                }
                ids
            };

            for id in expired_ids {
                let pair_state = state.pairs.get_mut(pair).expect("pair listed above");
                if let Ok(mut order) = pair_state.book.remove(id) {
                    order.status = OrderStatus::Expired;
                    order.cancel_reason = Some(CancelReason::Expired);
                    let submitter = order.submitter_id;
                    state.archive(order);
                    expired_count += 1;
                    self.emit_order_cancelled(&mut state, id, pair, submitter, CancelReason::Expired);
                }
            }

            if let Some(pair_state) = state.pairs.get_mut(pair) {
                Self::enforce_retention(pair_state, self.config.trade_retention_per_pair, self.config.trade_retention_hours, now);
            }
            self.maybe_emit_book_update(&mut state, pair, now);
        }

        tracing::info!(expired_count, pairs_swept = pairs.len(), "sweep complete");
    }

    pub fn shutdown(&self) {
        self.events.broadcast("trading_updates", Event::EngineShutdown);
    }

    //----------------------------------------------------------------------------------------
    // event emission helpers
    //----------------------------------------------------------------------------------------

    fn emit_order_accepted(&self, _state: &mut EngineState, order: &Order) {
        let channel = format!("user:{}", order.submitter_id);
        self.events.broadcast(&channel, Event::OrderAccepted { order: order.clone() });
        let orders_channel = format!("user_orders:{}", order.submitter_id);
        self.events.broadcast(&orders_channel, Event::OrderAccepted { order: order.clone() });
    }

    fn emit_order_update(&self, state: &mut EngineState, order: &Order) {
        self.emit_order_update_direct(state, order.id, order.status, order.filled, order.submitter_id);
    }

    fn emit_order_update_direct(&self, _state: &mut EngineState, order_id: u64, status: OrderStatus, filled: Decimal, submitter_id: Uuid) {
        let channel = format!("user:{submitter_id}");
        self.events.broadcast(&channel, Event::OrderUpdate { order_id, status, filled });
    }

    fn emit_order_cancelled(&self, _state: &mut EngineState, order_id: u64, _pair: &str, submitter_id: Uuid, reason: CancelReason) {
        let channel = format!("user:{submitter_id}");
        self.events.broadcast(&channel, Event::OrderCancelled { order_id, reason });
    }

    fn emit_trade(&self, _state: &mut EngineState, trade: &Trade) {
        let pair_channel = format!("trades:{}", trade.pair);
        self.events.broadcast(&pair_channel, Event::TradeExecuted { trade: trade.clone() });
        self.events.broadcast("trading_updates", Event::TradeExecuted { trade: trade.clone() });
    }

    /// Debounced book-update emission: at most one per pair per `ORDER_BOOK_UPDATE_DEBOUNCE_MS`
    /// burst, leading-edge (spec.md §4.3). A trailing emission on the next mutation after the
    /// window closes is guaranteed since every book-mutating call re-checks this gate.
    fn maybe_emit_book_update(&self, state: &mut EngineState, pair: &str, now: DateTime<Utc>) {
        let debounce = chrono::Duration::milliseconds(self.config.order_book_update_debounce_ms);
        let Some(pair_state) = state.pairs.get_mut(pair) else { return };
        if let Some(last) = pair_state.last_book_update_emit {
            if now - last < debounce {
                return;
            }
        }
        pair_state.last_book_update_emit = Some(now);

        let bids = pair_state.book.aggregate(Side::Buy, 20);
        let asks = pair_state.book.aggregate(Side::Sell, 20);
        let last_price = pair_state.stats.snapshot_last_price();
        let channel = format!("orderbook:{pair}");
        self.events.broadcast(&channel, Event::OrderBookUpdate { pair: pair.to_string(), bids, asks, last_price });
    }

    /// Throttled stats emission: at most once per `MARKET_STATS_UPDATE_INTERVAL_MS` per pair.
    fn maybe_emit_stats_update(&self, state: &mut EngineState, pair: &str, now: DateTime<Utc>) {
        let throttle = chrono::Duration::milliseconds(self.config.market_stats_update_interval_ms);
        let Some(pair_state) = state.pairs.get_mut(pair) else { return };
        if let Some(last) = pair_state.last_stats_update_emit {
            if now - last < throttle {
                return;
            }
        }
        pair_state.last_stats_update_emit = Some(now);
        let stats = pair_state.stats.snapshot(now);
        self.events.broadcast("trading_updates", Event::MarketStatsUpdate { pair: pair.to_string(), stats });
    }
}
