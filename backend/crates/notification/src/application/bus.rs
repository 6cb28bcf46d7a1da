//! Event Bus
//!
//! A single `tokio::sync::broadcast` channel carries every event. Sequence
//! numbers are assigned and the event is sent while holding one lock, so the
//! order on the channel is the sequence order and every subscriber observes
//! the same total order.
//!
//! The last `replay_capacity` events are also kept in a ring. A client that
//! reconnects with `since = n` is handed the ring entries after `n` before
//! live events; if `n` already fell out of the ring it is told to resync.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::application::config::EventBusConfig;
use crate::domain::event::{Audience, EventEnvelope, SequencedEvent};

struct Ring {
    next_seq: u64,
    events: VecDeque<Arc<SequencedEvent>>,
    capacity: usize,
}

struct Inner {
    tx: broadcast::Sender<Arc<SequencedEvent>>,
    ring: Mutex<Ring>,
}

/// Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

/// Result of subscribing with a resume point
pub struct Subscription {
    /// Events after `since` still held in the ring, oldest first
    pub backlog: Vec<Arc<SequencedEvent>>,
    /// Set when events between `since` and the oldest ring entry were lost;
    /// holds the oldest sequence still available.
    pub resync_from: Option<u64>,
    pub receiver: broadcast::Receiver<Arc<SequencedEvent>>,
}

impl EventBus {
    pub fn new(config: &EventBusConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity.max(1));
        let capacity = config.replay_capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                tx,
                ring: Mutex::new(Ring {
                    next_seq: 1,
                    events: VecDeque::with_capacity(capacity),
                    capacity,
                }),
            }),
        }
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        // The ring is always left consistent; a poisoned lock is still usable.
        self.inner.ring.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stamp and broadcast. Returns the assigned sequence number.
    pub fn publish(&self, envelope: EventEnvelope, audience: Audience) -> u64 {
        let mut ring = self.ring();
        let seq = ring.next_seq;
        ring.next_seq += 1;

        let event = Arc::new(SequencedEvent {
            seq,
            audience,
            envelope,
        });

        if ring.events.len() == ring.capacity {
            ring.events.pop_front();
        }
        ring.events.push_back(event.clone());

        // Err only means nobody is listening right now
        let receivers = self.inner.tx.send(event.clone()).unwrap_or(0);
        tracing::debug!(
            seq,
            event_type = %event.envelope.event_type,
            receivers,
            "Event published"
        );
        seq
    }

    /// Live events only
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SequencedEvent>> {
        self.inner.tx.subscribe()
    }

    /// Live events, preceded by whatever the ring still holds after `since`.
    ///
    /// The receiver is created under the ring lock, so no event is both in
    /// the backlog and on the receiver, and none falls between the two.
    pub fn subscribe_since(&self, since: Option<u64>) -> Subscription {
        let ring = self.ring();
        let receiver = self.inner.tx.subscribe();

        let Some(since) = since else {
            return Subscription {
                backlog: Vec::new(),
                resync_from: None,
                receiver,
            };
        };

        let latest = ring.next_seq - 1;
        let oldest = ring.events.front().map(|e| e.seq).unwrap_or(ring.next_seq);

        // A sequence from the future comes from before a restart
        let resync_from = (since.saturating_add(1) < oldest || since > latest).then_some(oldest);

        let backlog = ring
            .events
            .iter()
            .filter(|e| resync_from.is_some() || e.seq > since)
            .cloned()
            .collect();

        Subscription {
            backlog,
            resync_from,
            receiver,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// Sequence number of the most recent event (0 before the first)
    pub fn last_seq(&self) -> u64 {
        self.ring().next_seq - 1
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&EventBusConfig::default())
    }
}
