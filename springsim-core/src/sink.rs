//! Delivery of run events to subscribers
//!
//! The sampling loop only knows [`Sink::deliver`]. [`Broadcaster`] fans each
//! event out to any number of subscribers without ever blocking: a full
//! subscriber misses that frame, a disconnected one is dropped.

use crate::protocol::{encode, RunEvent};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Receives every event produced by the active run
pub trait Sink: Send + Sync {
    fn deliver(&self, event: &RunEvent);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn deliver(&self, event: &RunEvent) {
        (**self).deliver(event)
    }
}

/// Adapts a closure into a [`Sink`]
pub struct FnSink<F>(pub F);

impl<F> Sink for FnSink<F>
where
    F: Fn(&RunEvent) + Send + Sync,
{
    fn deliver(&self, event: &RunEvent) {
        (self.0)(event)
    }
}

/// One encoded JSON message, shared by every subscriber it is sent to
pub type Frame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("subscriber queue is full")]
    Full,
    #[error("subscriber disconnected")]
    Disconnected,
}

/// Non-blocking endpoint of a single subscriber
pub trait Subscriber: Send {
    fn try_send(&self, frame: Frame) -> Result<(), DeliveryError>;
}

impl Subscriber for SyncSender<Frame> {
    fn try_send(&self, frame: Frame) -> Result<(), DeliveryError> {
        SyncSender::try_send(self, frame).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Disconnected(_) => DeliveryError::Disconnected,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Box<dyn Subscriber>)>,
}

/// Fan-out sink with best-effort, drop-and-continue delivery
pub struct Broadcaster {
    registry: Mutex<Registry>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn subscribe(&self, subscriber: Box<dyn Subscriber>) -> SubscriberId {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push((id, subscriber));
        info!(
            subscriber = id.0,
            total = registry.subscribers.len(),
            "subscriber added"
        );
        id
    }

    /// Subscribe through a bounded channel holding at most `capacity` frames
    pub fn subscribe_channel(&self, capacity: usize) -> (SubscriberId, Receiver<Frame>) {
        let (tx, rx) = sync_channel(capacity);
        (self.subscribe(Box::new(tx)), rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(sid, _)| *sid != id);
        before != registry.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }

    /// Offer an already encoded frame to every subscriber
    pub fn broadcast(&self, frame: Frame) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry
            .subscribers
            .retain(|(id, subscriber)| match subscriber.try_send(Arc::clone(&frame)) {
                Ok(()) => true,
                Err(DeliveryError::Full) => {
                    debug!(subscriber = id.0, "subscriber queue full, frame dropped");
                    true
                }
                Err(DeliveryError::Disconnected) => {
                    info!(subscriber = id.0, "subscriber disconnected, removing");
                    false
                }
            });
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for Broadcaster {
    fn deliver(&self, event: &RunEvent) {
        match encode(event) {
            Ok(text) => self.broadcast(Frame::from(text)),
            Err(err) => warn!(run = %event.run(), error = %err, "dropping unencodable event"),
        }
    }
}
