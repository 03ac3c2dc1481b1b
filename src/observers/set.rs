//! # Non-blocking event fan-out to observers.
//!
//! Provides [`ObserverSet`], which distributes events to multiple observers
//! concurrently without blocking the bus.
//!
//! ## Architecture
//! ```text
//! emit_arc(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► observer1.on_event()
//!     │    (bounded)         └──────► panic → error!(..)
//!     └──► [queue N] ──► worker N ──► observerN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-observer ordering**: observer A may process event N while B processes N+5
//! - **Overflow**: event dropped for that observer only (warn)
//! - **Non-blocking**: `emit_arc()` returns immediately (uses `try_send`)
//! - **Isolation**: a slow or panicking observer doesn't affect others
//! - **Per-observer FIFO**: each observer sees events in order

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, warn};

use crate::error::panic_message;
use crate::events::Event;
use crate::observers::Observe;

/// Per-observer channel metadata.
struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for bus observers.
pub struct ObserverSet {
    channels: Mutex<Vec<ObserverChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ObserverSet {
    /// Creates a new set and spawns one worker task per observer.
    ///
    /// Must be called from within a Tokio runtime when `observers` is non-empty.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observe>>) -> Self {
        let mut channels = Vec::with_capacity(observers.len());
        let mut workers = Vec::with_capacity(observers.len());

        for obs in observers {
            let cap = obs.queue_capacity().max(1);
            let name = obs.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = obs.on_event(ev.as_ref());
                    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                        error!(
                            observer = obs.name(),
                            info = %panic_message(panic.as_ref()),
                            "observer panicked"
                        );
                    }
                }
            });
            channels.push(ObserverChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels: Mutex::new(channels),
            workers: Mutex::new(workers),
        }
    }

    /// A set with no observers.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Emits a pre-allocated `Arc<Event>` to all observers.
    ///
    /// On a full or closed queue the event is dropped for that observer only.
    pub fn emit_arc(&self, event: Arc<Event>) {
        for channel in self.channels.lock().iter() {
            match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(observer = channel.name, event = event.name(), "observer queue full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(observer = channel.name, event = event.name(), "observer worker closed, event dropped");
                }
            }
        }
    }

    /// Gracefully shuts down all observer workers.
    ///
    /// 1. Drops all channel senders (workers drain their queue and see it closed)
    /// 2. Awaits all worker tasks to finish
    pub async fn shutdown(&self) {
        self.channels.lock().clear();
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for h in workers {
            let _ = h.await;
        }
    }

    /// True if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }

    /// Number of observers still attached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl Observe for Collect {
        async fn on_event(&self, event: &Event) {
            self.0.lock().push(event.name().to_string());
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Observe for Explode {
        async fn on_event(&self, _event: &Event) {
            panic!("observer exploded");
        }
    }

    #[tokio::test]
    async fn observers_see_events_in_order_and_survive_panics() {
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        let set = ObserverSet::new(vec![Arc::new(Explode), collect.clone()]);
        assert_eq!(set.len(), 2);

        for name in ["a", "b", "c"] {
            set.emit_arc(Arc::new(Event::new(name)));
        }
        set.shutdown().await;

        assert_eq!(*collect.0.lock(), vec!["a", "b", "c"]);
        assert!(set.is_empty());
    }
}
