//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Limit order book for a single trading pair. Maintains bid and ask sides in strict
// price-time priority: best price first, and within a price level, earliest arrival
// first (FIFO) — spec.md §3, §4.2.
//
// | Component  | Description                                                        |
// |------------|---------------------------------------------------------------------|
// | PriceLevel | FIFO queue of resting orders at one price, plus their summed qty    |
// | OrderBook  | Bid/ask sides plus an id -> (side, price) index for O(log n) lookup|
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::types::{Order, Side};

use super::error::OrderBookError;

/// A FIFO queue of orders resting at a single price.
#[derive(Debug, Clone)]
struct PriceLevel {
    orders: VecDeque<Order>,
    total_remaining: Decimal,
}

impl PriceLevel {
    fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_remaining: Decimal::ZERO,
        }
    }

    fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// One price level aggregated for depth queries: price, total quantity across all
/// resting orders at that price, and how many orders make it up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: usize,
}

/// A single trading pair's order book.
#[derive(Debug)]
pub struct OrderBook {
    pair: String,
    bids: BTreeMap<Decimal, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    /// O(log n) lookup of which side/price an order id rests at.
    index: HashMap<u64, (Side, Decimal)>,
}

impl OrderBook {
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    fn levels(&self, side: Side) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Inserts a resting order in price-time priority. The caller is responsible
    /// for having already validated the order (limit price present, correct pair).
    pub fn insert(&mut self, order: Order) -> Result<(), OrderBookError> {
        if order.pair != self.pair {
            return Err(OrderBookError::WrongPair {
                expected: self.pair.clone(),
                got: order.pair.clone(),
            });
        }
        let price = order
            .limit_price
            .ok_or(OrderBookError::NoLimitPrice)?;
        if self.index.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrder(order.id));
        }

        let side = order.side;
        let remaining = order.remaining();
        self.index.insert(order.id, (side, price));

        let level = self.levels_mut(side).entry(price).or_insert_with(PriceLevel::new);
        level.total_remaining += remaining;
        level.orders.push_back(order);
        Ok(())
    }

    /// Removes an order by id, wherever it rests.
    pub fn remove(&mut self, order_id: u64) -> Result<Order, OrderBookError> {
        let (side, price) = self
            .index
            .remove(&order_id)
            .ok_or(OrderBookError::OrderNotFound(order_id))?;

        let levels = self.levels_mut(side);
        let level = levels.get_mut(&price).ok_or(OrderBookError::OrderNotFound(order_id))?;
        let pos = level
            .orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or(OrderBookError::OrderNotFound(order_id))?;
        let order = level.orders.remove(pos).expect("position just found");
        level.total_remaining -= order.remaining();

        if level.is_empty() {
            levels.remove(&price);
        }
        Ok(order)
    }

    /// Mutable reference to the best (price, then time) resting order on `side`.
    pub fn peek_head_mut(&mut self, side: Side) -> Option<&mut Order> {
        let price = self.best_price(side)?;
        self.levels_mut(side).get_mut(&price)?.orders.front_mut()
    }

    pub fn peek_head(&self, side: Side) -> Option<&Order> {
        let price = self.best_price(side)?;
        self.levels(side).get(&price)?.orders.front()
    }

    /// Removes and returns the head order of `side`'s best level iff it is
    /// fully filled. Keeps the level's aggregate quantity in sync.
    pub fn pop_head_if_filled(&mut self, side: Side) -> Option<Order> {
        let price = self.best_price(side)?;
        let levels = self.levels_mut(side);
        let level = levels.get_mut(&price)?;
        if !level.orders.front()?.remaining().is_zero() {
            return None;
        }
        let order = level.orders.pop_front()?;
        if level.is_empty() {
            levels.remove(&price);
        }
        self.index.remove(&order.id);
        Some(order)
    }

    fn best_price(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Buy => self.bids.keys().next_back().copied(),
            Side::Sell => self.asks.keys().next().copied(),
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.best_price(Side::Buy)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.best_price(Side::Sell)
    }

    /// True iff the book is not crossed: either one side is empty, or the best
    /// bid is strictly below the best ask (spec.md §3, §8 invariant 5).
    pub fn is_uncrossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid < ask,
            _ => true,
        }
    }

    pub fn contains(&self, order_id: u64) -> bool {
        self.index.contains_key(&order_id)
    }

    pub fn order_count(&self, side: Side) -> usize {
        self.levels(side).values().map(|l| l.orders.len()).sum()
    }

    /// Aggregates resting quantity by price level, best price first, truncated
    /// to `depth` distinct price levels (spec.md §4.1 `query_book`).
    pub fn aggregate(&self, side: Side, depth: usize) -> Vec<AggregatedLevel> {
        let levels = self.levels(side);
        let iter: Box<dyn Iterator<Item = (&Decimal, &PriceLevel)>> = match side {
            Side::Buy => Box::new(levels.iter().rev()),
            Side::Sell => Box::new(levels.iter()),
        };
        iter.take(depth)
            .map(|(price, level)| AggregatedLevel {
                price: *price,
                quantity: level.total_remaining,
                order_count: level.orders.len(),
            })
            .collect()
    }

    /// Sum of remaining quantity across every resting order on `side`, used by
    /// the book-aggregate-consistency law (spec.md §8) and by FOK's pre-match walk.
    pub fn total_remaining(&self, side: Side) -> Decimal {
        self.levels(side).values().map(|l| l.total_remaining).sum()
    }

    /// Walks resting orders on `side` best-first, calling `f` with each order
    /// until it returns `false` or the book is exhausted. Used for the
    /// non-destructive FOK liquidity check (spec.md §4.1) and for market-order
    /// matching against multiple price levels.
    pub fn walk<'a>(&'a self, side: Side, mut f: impl FnMut(&'a Order) -> bool) {
        let levels = self.levels(side);
        let prices: Vec<Decimal> = match side {
            Side::Buy => levels.keys().rev().copied().collect(),
            Side::Sell => levels.keys().copied().collect(),
        };
        for price in prices {
            if let Some(level) = levels.get(&price) {
                for order in &level.orders {
                    if !f(order) {
                        return;
                    }
                }
            }
        }
    }

    /// Decrements the aggregate cache for `side`/`price` by `qty`. Called by the
    /// matching loop after mutating a maker order's `filled` field directly
    /// through [`Self::peek_head_mut`].
    pub fn record_fill_at_best(&mut self, side: Side, qty: Decimal) {
        if let Some(price) = self.best_price(side) {
            if let Some(level) = self.levels_mut(side).get_mut(&price) {
                level.total_remaining -= qty;
            }
        }
    }

    pub fn get(&self, order_id: u64) -> Option<&Order> {
        let (side, price) = self.index.get(&order_id)?;
        self.levels(*side).get(price)?.orders.iter().find(|o| o.id == order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{OrderStatus, OrderType, TimeInForce};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn make_order(id: u64, side: Side, price: Decimal, qty: Decimal, sequence: u64) -> Order {
        Order {
            id,
            submitter_id: Uuid::new_v4(),
            pair: "pair-1".to_string(),
            side,
            order_type: OrderType::Limit,
            quantity: qty,
            filled: Decimal::ZERO,
            limit_price: Some(price),
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            created_at: Utc::now(),
            status: OrderStatus::Pending,
            sequence,
            cancel_reason: None,
        }
    }

    #[test]
    fn empty_book_has_no_best_prices() {
        let book = OrderBook::new("pair-1");
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert!(book.is_uncrossed());
    }

    #[test]
    fn insert_updates_best_price_and_index() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Buy, dec!(100), dec!(5), 1)).unwrap();
        book.insert(make_order(2, Side::Buy, dec!(101), dec!(5), 2)).unwrap();
        assert_eq!(book.best_bid(), Some(dec!(101)));
        assert!(book.contains(1));
        assert!(book.contains(2));
    }

    #[test]
    fn fifo_within_price_level() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Sell, dec!(100), dec!(5), 1)).unwrap();
        book.insert(make_order(2, Side::Sell, dec!(100), dec!(5), 2)).unwrap();
        let head = book.peek_head(Side::Sell).unwrap();
        assert_eq!(head.id, 1);
        book.remove(1).unwrap();
        assert_eq!(book.peek_head(Side::Sell).unwrap().id, 2);
    }

    #[test]
    fn remove_cleans_up_empty_level() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Buy, dec!(100), dec!(5), 1)).unwrap();
        book.remove(1).unwrap();
        assert_eq!(book.best_bid(), None);
        assert!(!book.contains(1));
    }

    #[test]
    fn remove_unknown_order_errors() {
        let mut book = OrderBook::new("pair-1");
        assert!(matches!(book.remove(42), Err(OrderBookError::OrderNotFound(42))));
    }

    #[test]
    fn wrong_pair_is_rejected() {
        let mut book = OrderBook::new("pair-1");
        let mut order = make_order(1, Side::Buy, dec!(100), dec!(5), 1);
        order.pair = "pair-2".to_string();
        assert!(matches!(book.insert(order), Err(OrderBookError::WrongPair { .. })));
    }

    #[test]
    fn aggregate_sums_quantity_per_level_and_respects_depth() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Buy, dec!(100), dec!(5), 1)).unwrap();
        book.insert(make_order(2, Side::Buy, dec!(100), dec!(3), 2)).unwrap();
        book.insert(make_order(3, Side::Buy, dec!(99), dec!(10), 3)).unwrap();

        let levels = book.aggregate(Side::Buy, 1);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, dec!(100));
        assert_eq!(levels[0].quantity, dec!(8));
        assert_eq!(levels[0].order_count, 2);

        let all = book.aggregate(Side::Buy, 10);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].price, dec!(99));
    }

    #[test]
    fn aggregate_consistency_law() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Sell, dec!(100), dec!(5), 1)).unwrap();
        book.insert(make_order(2, Side::Sell, dec!(101), dec!(7), 2)).unwrap();
        let sum: Decimal = book.aggregate(Side::Sell, usize::MAX).iter().map(|l| l.quantity).sum();
        assert_eq!(sum, book.total_remaining(Side::Sell));
    }

    #[test]
    fn zero_depth_query_returns_empty() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Buy, dec!(100), dec!(5), 1)).unwrap();
        assert!(book.aggregate(Side::Buy, 0).is_empty());
    }

    #[test]
    fn walk_visits_best_price_first() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Sell, dec!(102), dec!(1), 1)).unwrap();
        book.insert(make_order(2, Side::Sell, dec!(100), dec!(1), 2)).unwrap();
        book.insert(make_order(3, Side::Sell, dec!(101), dec!(1), 3)).unwrap();

        let mut seen = Vec::new();
        book.walk(Side::Sell, |o| {
            seen.push(o.limit_price.unwrap());
            true
        });
        assert_eq!(seen, vec![dec!(100), dec!(101), dec!(102)]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut book = OrderBook::new("pair-1");
        book.insert(make_order(1, Side::Buy, dec!(100), dec!(5), 1)).unwrap();
        let dup = make_order(1, Side::Buy, dec!(99), dec!(1), 2);
        assert!(matches!(book.insert(dup), Err(OrderBookError::DuplicateOrder(1))));
    }
}
