use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The subscriber's bounded queue was full; it has been dropped and must re-subscribe
    /// (spec.md §4.3, §7 `slow_consumer`).
    #[error("subscriber {0} is a slow consumer and was dropped")]
    SlowConsumer(Uuid),

    /// `send`/`subscribe`/`unsubscribe` referenced a subscriber that never registered or
    /// has already been closed.
    #[error("subscriber {0} is not registered")]
    UnknownSubscriber(Uuid),
}
