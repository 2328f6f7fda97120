//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Channel-scoped event broadcaster (spec.md §4.3). A channel is an opaque string
// (`trading_updates`, `orderbook:<pair>`, `trades:<pair>`, `user:<id>`, ...). Subscribers
// register once to obtain a bounded mpsc receiver, then subscribe/unsubscribe to any number
// of channels. Delivery never blocks the producer: a full queue drops the subscriber instead
// (spec.md §4.3 "slow consumer").
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::EventError;
use super::types::{Event, EventEnvelope};

struct SinkState {
    subscribers: HashMap<Uuid, mpsc::Sender<EventEnvelope>>,
    /// channel -> set of subscriber ids currently listening.
    subscriptions: HashMap<String, HashSet<Uuid>>,
    /// channel -> monotonic sequence counter, per spec.md §6.
    sequences: HashMap<String, u64>,
}

pub struct EventSink {
    state: Mutex<SinkState>,
    queue_capacity: usize,
}

impl EventSink {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(SinkState {
                subscribers: HashMap::new(),
                subscriptions: HashMap::new(),
                sequences: HashMap::new(),
            }),
            queue_capacity,
        }
    }

    /// Registers a new subscriber and returns its receiving end. Must be called once
    /// before `subscribe`/`send` will have anywhere to deliver to.
    pub fn register(&self, subscriber_id: Uuid) -> mpsc::Receiver<EventEnvelope> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut state = self.state.lock();
        state.subscribers.insert(subscriber_id, tx);
        rx
    }

    pub fn subscribe(&self, subscriber_id: Uuid, channel: &str) -> Result<(), EventError> {
        let mut state = self.state.lock();
        if !state.subscribers.contains_key(&subscriber_id) {
            return Err(EventError::UnknownSubscriber(subscriber_id));
        }
        state
            .subscriptions
            .entry(channel.to_string())
            .or_default()
            .insert(subscriber_id);
        Ok(())
    }

    pub fn unsubscribe(&self, subscriber_id: Uuid, channel: &str) {
        let mut state = self.state.lock();
        if let Some(subs) = state.subscriptions.get_mut(channel) {
            subs.remove(&subscriber_id);
        }
    }

    /// Drops all of a subscriber's subscriptions and its registration (spec.md §4.3 `close`).
    pub fn close(&self, subscriber_id: Uuid) {
        let mut state = self.state.lock();
        state.subscribers.remove(&subscriber_id);
        for subs in state.subscriptions.values_mut() {
            subs.remove(&subscriber_id);
        }
    }

    /// Delivers `event` to every current subscriber of `channel`. Subscribers whose queue
    /// is full are dropped (spec.md §4.3); the producer never blocks.
    pub fn broadcast(&self, channel: &str, event: Event) {
        let mut state = self.state.lock();
        let sequence = {
            let seq = state.sequences.entry(channel.to_string()).or_insert(0);
            *seq += 1;
            *seq
        };
        let Some(subscriber_ids) = state.subscriptions.get(channel).cloned() else {
            return;
        };

        let envelope = EventEnvelope {
            channel: channel.to_string(),
            sequence,
            emitted_at: chrono::Utc::now(),
            event,
        };

        let mut slow = Vec::new();
        for id in &subscriber_ids {
            if let Some(tx) = state.subscribers.get(id) {
                if tx.try_send(envelope.clone()).is_err() {
                    slow.push(*id);
                }
            }
        }
        drop(state);

        for id in slow {
            tracing::warn!(subscriber_id = %id, channel, "slow consumer, dropping subscription");
            self.close(id);
        }
    }

    /// Directed send to a single subscriber, bypassing channel subscription (spec.md §4.3
    /// `send`). Used for `order_accepted`/`order_update`/`order_cancelled` on `user:<id>`.
    pub fn send(&self, subscriber_id: Uuid, channel: &str, event: Event) -> Result<(), EventError> {
        let mut state = self.state.lock();
        let Some(tx) = state.subscribers.get(&subscriber_id).cloned() else {
            return Err(EventError::UnknownSubscriber(subscriber_id));
        };
        let sequence = {
            let seq = state.sequences.entry(channel.to_string()).or_insert(0);
            *seq += 1;
            *seq
        };
        drop(state);

        let envelope = EventEnvelope {
            channel: channel.to_string(),
            sequence,
            emitted_at: chrono::Utc::now(),
            event,
        };
        if tx.try_send(envelope).is_err() {
            tracing::warn!(subscriber_id = %subscriber_id, channel, "slow consumer, dropping subscription");
            self.close(subscriber_id);
            return Err(EventError::SlowConsumer(subscriber_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::OrderStatus;

    #[test]
    fn broadcast_delivers_to_subscribers_in_order() {
        let sink = EventSink::new(8);
        let sub = Uuid::new_v4();
        let mut rx = sink.register(sub);
        sink.subscribe(sub, "trading_updates").unwrap();

        sink.broadcast(
            "trading_updates",
            Event::OrderUpdate { order_id: 1, status: OrderStatus::Filled, filled: Default::default() },
        );
        sink.broadcast(
            "trading_updates",
            Event::OrderUpdate { order_id: 2, status: OrderStatus::Filled, filled: Default::default() },
        );

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn unsubscribed_channels_receive_nothing() {
        let sink = EventSink::new(8);
        let sub = Uuid::new_v4();
        let mut rx = sink.register(sub);
        sink.broadcast("trading_updates", Event::EngineShutdown);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_subscriber() {
        let sink = EventSink::new(1);
        let sub = Uuid::new_v4();
        let _rx = sink.register(sub);
        sink.subscribe(sub, "trading_updates").unwrap();

        sink.broadcast("trading_updates", Event::EngineShutdown);
        sink.broadcast("trading_updates", Event::EngineShutdown);

        assert!(sink.send(sub, "trading_updates", Event::EngineShutdown).is_err());
    }

    #[test]
    fn close_removes_all_subscriptions() {
        let sink = EventSink::new(8);
        let sub = Uuid::new_v4();
        let _rx = sink.register(sub);
        sink.subscribe(sub, "trading_updates").unwrap();
        sink.close(sub);
        assert!(matches!(
            sink.send(sub, "trading_updates", Event::EngineShutdown),
            Err(EventError::UnknownSubscriber(_))
        ));
    }

    #[test]
    fn directed_send_requires_registration() {
        let sink = EventSink::new(8);
        let unregistered = Uuid::new_v4();
        assert!(matches!(
            sink.send(unregistered, "user:1", Event::EngineShutdown),
            Err(EventError::UnknownSubscriber(_))
        ));
    }
}
