// Expose the modules.
pub mod api;
pub mod config;
pub mod domain;

// Re-export key types for easier usage.
pub use domain::models::market::{MarketStats, PairStatistics};
pub use domain::models::types::{CancelReason, Order, OrderStatus, OrderType, Side, TimeInForce, Trade};
pub use domain::services::events::{Event, EventError, EventSink};
pub use domain::services::matching_engine::{
    BookSnapshot, Clock, EngineConfig, EngineError, FixedClock, MatchingEngine, OrderDraft,
    SubmitOutcome, SystemClock,
};
pub use domain::services::orderbook::{AggregatedLevel, OrderBook, OrderBookError};
