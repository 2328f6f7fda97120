use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::CancelReason;

/// The closed error taxonomy for `submit`/`cancel`/`modify`/queries (spec.md §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// quantity/price/stop/expiry failed validation at acceptance.
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    /// cancel/query against a pair the engine has never seen a valid submission for.
    #[error("pair {0} is not known to the engine")]
    PairUnknown(String),

    /// order id does not exist.
    #[error("order {0} not found")]
    NotFound(u64),

    /// cancel/modify requested by someone other than the order's submitter.
    #[error("submitter {0} is not permitted to modify order {1}")]
    Forbidden(Uuid, u64),

    /// cancel/modify requested on an order already in a terminal state.
    #[error("order {0} is already in a terminal state")]
    AlreadyTerminal(u64),

    /// FOK could not be fully matched at acceptance; the order was entered then
    /// immediately cancelled rather than rejected outright (spec.md §4.1).
    #[error("order {0} could not be filled in full and was cancelled")]
    FokUnfillable(u64),
}

impl EngineError {
    /// Maps an error to the `CancelReason` it corresponds to, where applicable —
    /// used when emitting `order_cancelled` events for engine-initiated cancellations.
    pub fn as_cancel_reason(&self) -> Option<CancelReason> {
        match self {
            EngineError::FokUnfillable(_) => Some(CancelReason::FokUnfillable),
            _ => None,
        }
    }
}
