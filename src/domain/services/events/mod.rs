//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Event-driven fan-out for the matching engine: channel-scoped subscriptions, bounded
// per-subscriber delivery, and the fixed event taxonomy the engine emits.
//
// | Component     | Description                                                    |
// |---------------|-----------------------------------------------------------------|
// | Event         | Tagged enum of every event kind the engine emits                |
// | EventEnvelope | What is actually queued: event + channel + per-channel sequence |
// | EventSink     | Central hub for subscribe/unsubscribe/broadcast/send/close      |
//--------------------------------------------------------------------------------------------------

mod error;
mod sink;
mod types;

pub use error::EventError;
pub use sink::EventSink;
pub use types::{Event, EventEnvelope};
