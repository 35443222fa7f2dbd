//! Synchronous, in-process publish/subscribe for a single job.
//!
//! Callbacks run inline on the publishing task. A slow listener delays the
//! publisher, so anything feeding a network stream should go through
//! [`EventBus::channel`].
//!
//! Deregistration only sets a flag. Flagged listeners are pruned at the start
//! of the next publish, which keeps removal safe while a publish is iterating.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use super::{EventKind, JobEvent};

type Callback = dyn Fn(&JobEvent, &Listener) + Send + Sync;

/// A registered callback with an optional event-type filter.
///
/// The callback receives the listener itself alongside the event so it can
/// deregister from inside the dispatch.
pub struct Listener {
    callback: Box<Callback>,
    filter: Option<EventKind>,
    registered: AtomicBool,
}

impl Listener {
    /// Stop receiving events, starting with the bus's next publish.
    pub fn deregister(&self) {
        self.registered.store(false, Ordering::SeqCst);
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub const fn filter(&self) -> Option<EventKind> {
        self.filter
    }

    fn call(&self, event: &JobEvent) {
        if let Some(filter) = self.filter
            && filter != event.kind()
        {
            return;
        }
        (self.callback)(event, self);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("filter", &self.filter)
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}

/// Per-job event bus. Clones share the same listener set.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Arc<Listener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Arc<Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback, optionally restricted to one event type.
    pub fn subscribe<F>(&self, callback: F, filter: Option<EventKind>) -> Arc<Listener>
    where
        F: Fn(&JobEvent, &Listener) + Send + Sync + 'static,
    {
        let listener = Arc::new(Listener {
            callback: Box::new(callback),
            filter,
            registered: AtomicBool::new(true),
        });
        self.guard().push(Arc::clone(&listener));
        listener
    }

    /// Forward matching events into an unbounded channel.
    ///
    /// The listener deregisters itself once the receiver is dropped.
    pub fn channel(&self, filter: Option<EventKind>) -> mpsc::UnboundedReceiver<JobEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(
            move |event, listener| {
                if tx.send(event.clone()).is_err() {
                    listener.deregister();
                }
            },
            filter,
        );
        rx
    }

    /// Deliver `event` to every registered listener whose filter matches.
    ///
    /// Iterates over a snapshot, so callbacks may subscribe, deregister or
    /// publish again without deadlocking.
    pub fn publish(&self, event: &JobEvent) {
        let snapshot: Vec<Arc<Listener>> = {
            let mut listeners = self.guard();
            listeners.retain(|l| l.is_registered());
            listeners.clone()
        };
        for listener in &snapshot {
            listener.call(event);
        }
    }

    /// Number of listeners currently held, including flagged ones not yet pruned.
    pub fn listener_count(&self) -> usize {
        self.guard().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConsoleLine, JobStatus};
    use std::sync::atomic::AtomicUsize;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn filter_skips_other_event_types() {
        let bus = EventBus::new();
        let statuses = counter();
        let all = counter();

        let s = Arc::clone(&statuses);
        bus.subscribe(
            move |_, _| {
                s.fetch_add(1, Ordering::SeqCst);
            },
            Some(EventKind::Status),
        );
        let a = Arc::clone(&all);
        bus.subscribe(
            move |_, _| {
                a.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );

        bus.publish(&JobEvent::status(JobStatus::Running));
        bus.publish(&JobEvent::ConsoleLine(ConsoleLine::new("hello", false)));

        assert_eq!(statuses.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn deregister_takes_effect_on_next_publish() {
        let bus = EventBus::new();
        let calls = counter();

        let c = Arc::clone(&calls);
        bus.subscribe(
            move |_, listener| {
                c.fetch_add(1, Ordering::SeqCst);
                listener.deregister();
            },
            None,
        );

        bus.publish(&JobEvent::status(JobStatus::Starting));
        assert_eq!(bus.listener_count(), 1);
        bus.publish(&JobEvent::status(JobStatus::Running));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn deregistered_mid_iteration_still_sees_current_event() {
        let bus = EventBus::new();
        let second_calls = counter();

        let second_slot: Arc<Mutex<Option<Arc<Listener>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&second_slot);
        bus.subscribe(
            move |_, _| {
                if let Some(l) = slot.lock().unwrap().as_ref() {
                    l.deregister();
                }
            },
            None,
        );
        let c = Arc::clone(&second_calls);
        let second = bus.subscribe(
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );
        *second_slot.lock().unwrap() = Some(second);

        bus.publish(&JobEvent::Custom(serde_json::Value::Null));
        bus.publish(&JobEvent::Custom(serde_json::Value::Null));

        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_can_publish_reentrantly() {
        let bus = EventBus::new();
        let seen = counter();

        let inner_bus = bus.clone();
        bus.subscribe(
            move |_, _| {
                inner_bus.publish(&JobEvent::status(JobStatus::Running));
            },
            Some(EventKind::ConsoleLine),
        );
        let s = Arc::clone(&seen);
        bus.subscribe(
            move |_, _| {
                s.fetch_add(1, Ordering::SeqCst);
            },
            Some(EventKind::Status),
        );

        bus.publish(&JobEvent::ConsoleLine(ConsoleLine::new("Ready", false)));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_forwards_and_deregisters_when_dropped() {
        let bus = EventBus::new();
        let mut rx = bus.channel(Some(EventKind::Status));

        bus.publish(&JobEvent::status(JobStatus::Running));
        bus.publish(&JobEvent::ConsoleLine(ConsoleLine::new("ignored", false)));
        assert_eq!(
            rx.recv().await,
            Some(JobEvent::status(JobStatus::Running))
        );
        assert!(rx.try_recv().is_err());

        drop(rx);
        bus.publish(&JobEvent::status(JobStatus::Stopped));
        bus.publish(&JobEvent::status(JobStatus::Stopped));
        assert_eq!(bus.listener_count(), 0);
    }
}
