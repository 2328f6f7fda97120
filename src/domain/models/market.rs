//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Rolling 24h market statistics per trading pair (spec.md §3, §4.4): last price,
// volume/high/low, percent change, trade count. A `PairStatistics` owns the raw
// trade samples for its rolling window; eviction of stale samples happens lazily,
// on read or during the periodic cleanup sweep, per spec.md §4.4.
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single trade sample feeding the rolling window.
#[derive(Debug, Clone, Copy)]
struct Sample {
    at: DateTime<Utc>,
    price: Decimal,
    quantity: Decimal,
}

/// Snapshot of a pair's market statistics, as returned by `query_market_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub last_price: Option<Decimal>,
    pub volume_24h: Decimal,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub change_24h_abs: Decimal,
    pub change_24h_pct: Decimal,
    pub trade_count_24h: u64,
}

impl Default for MarketStats {
    fn default() -> Self {
        Self {
            last_price: None,
            volume_24h: Decimal::ZERO,
            high_24h: None,
            low_24h: None,
            change_24h_abs: Decimal::ZERO,
            change_24h_pct: Decimal::ZERO,
            trade_count_24h: 0,
        }
    }
}

/// Rolling 24h statistics tracker for a single trading pair.
#[derive(Debug, Clone)]
pub struct PairStatistics {
    window: VecDeque<Sample>,
    last_price: Option<Decimal>,
}

impl PairStatistics {
    pub fn new() -> Self {
        Self {
            window: VecDeque::new(),
            last_price: None,
        }
    }

    /// Records a trade. Called synchronously on every fill (spec.md §4.4).
    pub fn record_trade(&mut self, price: Decimal, quantity: Decimal, at: DateTime<Utc>) {
        self.window.push_back(Sample { at, price, quantity });
        self.last_price = Some(price);
    }

    /// Evicts samples older than 24h. Returns true if anything was evicted.
    pub fn evict_stale(&mut self, now: DateTime<Utc>) -> bool {
        let cutoff = now - Duration::hours(24);
        let mut evicted = false;
        while matches!(self.window.front(), Some(s) if s.at < cutoff) {
            self.window.pop_front();
            evicted = true;
        }
        evicted
    }

    /// Computes the current snapshot, evicting stale samples first.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> MarketStats {
        self.evict_stale(now);

        if self.window.is_empty() {
            return MarketStats {
                last_price: self.last_price,
                ..Default::default()
            };
        }

        let mut high = self.window[0].price;
        let mut low = self.window[0].price;
        let mut volume = Decimal::ZERO;
        for s in &self.window {
            if s.price > high {
                high = s.price;
            }
            if s.price < low {
                low = s.price;
            }
            volume += s.quantity;
        }

        let price_24h_ago = self.price_at_or_before(now - Duration::hours(24));
        let last = self.last_price.unwrap_or(high);
        let (change_abs, change_pct) = match price_24h_ago {
            Some(p) if p != Decimal::ZERO => (last - p, (last - p) / p),
            _ => (Decimal::ZERO, Decimal::ZERO),
        };

        MarketStats {
            last_price: self.last_price,
            volume_24h: volume,
            high_24h: Some(high),
            low_24h: Some(low),
            change_24h_abs: change_abs,
            change_24h_pct: change_pct,
            trade_count_24h: self.window.len() as u64,
        }
    }

    /// Price of the most recent trade at or before `cutoff`, per spec.md §4.4's
    /// definition of `price_24h_ago`. `None` if no such trade exists — per spec.md
    /// §4.4, that means "change is 0," not "use the oldest trade we happen to have."
    fn price_at_or_before(&self, cutoff: DateTime<Utc>) -> Option<Decimal> {
        self.window
            .iter()
            .filter(|s| s.at <= cutoff)
            .last()
            .map(|s| s.price)
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// The most recent trade price ever recorded, independent of window eviction.
    pub fn snapshot_last_price(&self) -> Option<Decimal> {
        self.last_price
    }
}

impl Default for PairStatistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_window_has_zero_change() {
        let mut stats = PairStatistics::new();
        let snap = stats.snapshot(Utc::now());
        assert_eq!(snap.change_24h_pct, Decimal::ZERO);
        assert_eq!(snap.trade_count_24h, 0);
        assert!(snap.last_price.is_none());
    }

    #[test]
    fn records_high_low_and_volume() {
        let mut stats = PairStatistics::new();
        let now = Utc::now();
        stats.record_trade(dec!(100), dec!(1), now);
        stats.record_trade(dec!(105), dec!(2), now);
        stats.record_trade(dec!(95), dec!(3), now);

        let snap = stats.snapshot(now);
        assert_eq!(snap.high_24h, Some(dec!(105)));
        assert_eq!(snap.low_24h, Some(dec!(95)));
        assert_eq!(snap.volume_24h, dec!(6));
        assert_eq!(snap.last_price, Some(dec!(95)));
        assert_eq!(snap.trade_count_24h, 3);
    }

    #[test]
    fn change_is_zero_when_no_sample_reaches_back_24h() {
        let mut stats = PairStatistics::new();
        let now = Utc::now();
        stats.record_trade(dec!(100), dec!(1), now - Duration::hours(23));
        stats.record_trade(dec!(200), dec!(1), now);

        let snap = stats.snapshot(now);
        assert_eq!(snap.change_24h_abs, Decimal::ZERO);
        assert_eq!(snap.change_24h_pct, Decimal::ZERO);
    }

    #[test]
    fn stale_samples_are_evicted_on_read() {
        let mut stats = PairStatistics::new();
        let old = Utc::now() - Duration::hours(25);
        stats.record_trade(dec!(50), dec!(1), old);
        let snap = stats.snapshot(Utc::now());
        assert!(snap.high_24h.is_none());
        assert_eq!(snap.trade_count_24h, 0);
        // last_price survives eviction of the underlying sample — it tracks the
        // most recent trade ever seen, not just trades within the window.
        assert_eq!(snap.last_price, Some(dec!(50)));
    }
}
