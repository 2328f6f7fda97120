use thiserror::Error;

/// Errors raised by [`super::orderbook::OrderBook`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderBookError {
    /// The order is for a different pair than this book manages.
    #[error("order is for wrong pair (expected {expected}, got {got})")]
    WrongPair { expected: String, got: String },

    /// Only orders carrying a limit price can rest in a book.
    #[error("order has no limit price and cannot rest in the book")]
    NoLimitPrice,

    /// The order id does not exist in this book.
    #[error("order {0} not found in the book")]
    OrderNotFound(u64),

    /// A duplicate id was inserted (would violate the no-duplicate-ids invariant).
    #[error("order {0} already present in the book")]
    DuplicateOrder(u64),
}
