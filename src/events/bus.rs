//! # Event bus: subscriptions plus synchronous and asynchronous delivery.
//!
//! [`Bus`] owns the [`HandlerTable`] (event name → ordered handlers) and a
//! single dispatcher worker fed by an unbounded FIFO queue.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                                    Consumers:
//!   supervisor  ──┐  publish(ev).await ───────────────► HandlerTable::dispatch (inline)
//!   ability 1   ──┤
//!   ability N   ──┤  emit(ev) ──► [FIFO] ──► worker ──► HandlerTable::dispatch
//!   handler     ──┘       │
//!                         └────────────────────────────► ObserverSet (fire-and-forget)
//! ```
//!
//! ## Rules
//! - **Per-name order**: handlers fire in subscription order for every event.
//! - **Emit order**: emitted events are dispatched one at a time in emission
//!   order, so two emits of the same name reach each handler in that order.
//! - **No cross-path order**: an inline `publish` may overtake earlier queued emits.
//! - **No persistence**: events with no subscriber are dropped; nothing is replayed.
//! - **Release**: after [`Bus::release`] emits are refused, queued events are
//!   discarded and every subscription is deactivated.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::events::dispatcher::{Delivery, HandlerTable, Subscription};
use crate::events::{Event, Handler};
use crate::observers::ObserverSet;

struct Inner {
    table: Arc<HandlerTable>,
    observers: ObserverSet,
    queue: mpsc::UnboundedSender<Event>,
    closed: CancellationToken,
}

/// Publish/subscribe hub shared by the supervisor, abilities and handlers.
///
/// Cheap to clone; all clones share the same table and worker.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<Inner>,
}

impl Bus {
    /// Creates a bus without observers and spawns its dispatcher worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_observers(ObserverSet::empty())
    }

    /// Creates a bus that also fans every event out to `observers`.
    pub fn with_observers(observers: ObserverSet) -> Self {
        let table = Arc::new(HandlerTable::default());
        let closed = CancellationToken::new();
        let (queue, rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch_loop(Arc::clone(&table), rx, closed.clone()));

        Self {
            inner: Arc::new(Inner {
                table,
                observers,
                queue,
                closed,
            }),
        }
    }

    /// Registers `handler` at the end of the handler list for `event`.
    pub fn subscribe(
        &self,
        event: impl Into<Arc<str>>,
        handler: Arc<dyn Handler>,
    ) -> Result<Subscription, RuntimeError> {
        let event = event.into();
        if event.is_empty() {
            return Err(RuntimeError::InvalidName { kind: "event" });
        }
        Ok(self.inner.table.subscribe(event, handler))
    }

    /// Delivers `event` to its handlers on the calling task and reports the outcome.
    ///
    /// Returns an empty [`Delivery`] once the bus has been released.
    pub async fn publish(&self, event: Event) -> Delivery {
        if self.is_released() {
            debug!(event = event.name(), "bus released, event dropped");
            return Delivery::default();
        }
        let event = Arc::new(event);
        self.inner.observers.emit_arc(Arc::clone(&event));
        self.inner.table.dispatch(&event).await
    }

    /// Enqueues `event` for the dispatcher worker and returns immediately.
    ///
    /// Returns `false` if the bus has been released.
    pub fn emit(&self, event: Event) -> bool {
        if event.name().is_empty() {
            warn!("event with empty name dropped");
            return false;
        }
        if self.is_released() {
            debug!(event = event.name(), "bus released, event dropped");
            return false;
        }
        self.inner.observers.emit_arc(Arc::new(event.clone()));
        self.inner.queue.send(event).is_ok()
    }

    /// Active handler count per event name, sorted by name.
    ///
    /// Enumerating subscriptions is the only way to discover the reactive graph.
    pub fn subscriptions(&self) -> Vec<(String, usize)> {
        self.inner.table.counts()
    }

    /// True once [`Bus::release`] was called.
    pub fn is_released(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Stops the worker, drops every subscription and drains the observers.
    ///
    /// Idempotent.
    pub async fn release(&self) {
        if self.inner.closed.is_cancelled() {
            return;
        }
        self.inner.closed.cancel();
        self.inner.table.clear();
        self.inner.observers.shutdown().await;
        debug!("bus released");
    }
}

/// Single consumer of the emit queue.
async fn dispatch_loop(
    table: Arc<HandlerTable>,
    mut rx: mpsc::UnboundedReceiver<Event>,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(ev) => {
                    table.dispatch(&ev).await;
                }
                None => break,
            }
        }
    }

    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "queued events discarded on release");
    }
}
