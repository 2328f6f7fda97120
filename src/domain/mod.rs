//! Domain layer: models (core data types) and services (order book, matching
//! engine, event sink) that implement the trading-pair matching engine.

pub mod models;
pub mod services;
