//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Process configuration, loaded from the environment (SPEC_FULL.md §11). Unlike the rest of
// this crate's Rust-native error handling, every field here has a typed default so the engine
// never fails to start over a missing optional variable; only a genuinely required-with-no-
// sane-default setting would panic, and there are none in this engine's configuration surface.
//--------------------------------------------------------------------------------------------------

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub order_book_depth_default: usize,
    pub trade_history_ring_size: usize,
    pub trade_retention_per_pair: usize,
    pub trade_retention_hours: i64,
    pub sweep_interval_secs: u64,
    pub subscriber_queue_capacity: usize,
    pub order_book_update_debounce_ms: u64,
    pub market_stats_update_interval_ms: u64,
}

impl Config {
    /// Loads configuration from the environment, falling back to `.env` if present
    /// (matching the teacher's `dotenv().ok()` idiom), then typed defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:8080"),
            order_book_depth_default: env_or_parsed("ORDER_BOOK_DEPTH_DEFAULT", 20),
            trade_history_ring_size: env_or_parsed("TRADE_HISTORY_RING_SIZE", 1000),
            trade_retention_per_pair: env_or_parsed("TRADE_RETENTION_PER_PAIR", 10_000),
            trade_retention_hours: env_or_parsed("TRADE_RETENTION_HOURS", 24),
            sweep_interval_secs: env_or_parsed("SWEEP_INTERVAL_SECS", 60),
            subscriber_queue_capacity: env_or_parsed("SUBSCRIBER_QUEUE_CAPACITY", 256),
            order_book_update_debounce_ms: env_or_parsed("ORDER_BOOK_UPDATE_DEBOUNCE_MS", 50),
            market_stats_update_interval_ms: env_or_parsed("MARKET_STATS_UPDATE_INTERVAL_MS", 1000),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
