//! # Handler table and ordered delivery.
//!
//! [`HandlerTable`] maps an event name to the ordered list of its handlers and
//! walks that list for each delivered event.
//!
//! ## Rules
//! - **Registration order**: handlers for one name are invoked in the order they subscribed.
//! - **Snapshot delivery**: a delivery walks a copy of the list taken under a
//!   short read lock, so handlers may subscribe or unsubscribe mid-dispatch
//!   without corrupting the walk. Handlers added during a delivery see the next event.
//! - **Stop semantics**: a handler returning [`Flow::Stop`] is deactivated at
//!   once (no invocation starting afterwards will reach it) and its entry is
//!   removed after the full list has been walked.
//! - **Isolation**: errors and panics are logged and counted; the walk continues.
//!
//! ```text
//! dispatch(ev)
//!   ├─► snapshot(ev.name)          (read lock, clone Vec<Arc<Slot>>)
//!   ├─► for slot in snapshot (order = subscription order)
//!   │     ├─ inactive?  → skip
//!   │     ├─ Ok(Continue)
//!   │     ├─ Ok(Stop)   → deactivate, remember id
//!   │     └─ Err/panic  → error!(..), keep subscribed
//!   └─► remove(remembered ids)     (write lock)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::RwLock;
use tracing::error;

use crate::error::{HandlerError, panic_message};
use crate::events::{Event, Flow, Handler};

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Handlers invoked.
    pub delivered: usize,
    /// Handlers that failed or panicked.
    pub failed: usize,
    /// Handlers that asked to stop and were removed.
    pub unsubscribed: usize,
}

/// One registered handler.
pub(crate) struct Slot {
    id: u64,
    handler: Arc<dyn Handler>,
    active: AtomicBool,
}

impl Slot {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Returns true for the caller that actually flipped the flag.
    fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

/// Event name → ordered handler list.
#[derive(Default)]
pub(crate) struct HandlerTable {
    lists: RwLock<HashMap<Arc<str>, Vec<Arc<Slot>>>>,
    next_id: AtomicU64,
}

impl HandlerTable {
    /// Appends `handler` to the list for `event`.
    pub(crate) fn subscribe(
        self: &Arc<Self>,
        event: Arc<str>,
        handler: Arc<dyn Handler>,
    ) -> Subscription {
        let slot = Arc::new(Slot {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            handler,
            active: AtomicBool::new(true),
        });
        let sub = Subscription {
            id: slot.id,
            event: Arc::clone(&event),
            slot: Arc::downgrade(&slot),
            table: Arc::downgrade(self),
        };
        self.lists.write().entry(event).or_default().push(slot);
        sub
    }

    /// Invokes every active handler for the event's name, in order.
    pub(crate) async fn dispatch(&self, event: &Event) -> Delivery {
        let slots = self.snapshot(event.name());
        let mut delivery = Delivery::default();
        let mut stopped = Vec::new();

        for slot in slots {
            if !slot.is_active() {
                continue;
            }
            delivery.delivered += 1;

            let fut = AssertUnwindSafe(slot.handler.handle(event)).catch_unwind();
            let res = match fut.await {
                Ok(res) => res,
                Err(panic) => Err(HandlerError::Panicked {
                    info: panic_message(panic.as_ref()),
                }),
            };

            match res {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    if slot.deactivate() {
                        stopped.push(slot.id);
                    }
                }
                Err(e) => {
                    delivery.failed += 1;
                    error!(
                        event = %event.name(),
                        handler = slot.id,
                        label = e.as_label(),
                        error = %e,
                        "event handler failed"
                    );
                }
            }
        }

        if !stopped.is_empty() {
            delivery.unsubscribed = stopped.len();
            self.remove(event.name(), &stopped);
        }
        delivery
    }

    /// Copies the handler list for `event` (empty if unknown).
    fn snapshot(&self, event: &str) -> Vec<Arc<Slot>> {
        self.lists.read().get(event).cloned().unwrap_or_default()
    }

    /// Removes the given handler ids; drops the name once its list is empty.
    fn remove(&self, event: &str, ids: &[u64]) {
        let mut lists = self.lists.write();
        if let Some(list) = lists.get_mut(event) {
            list.retain(|s| !ids.contains(&s.id));
            if list.is_empty() {
                lists.remove(event);
            }
        }
    }

    /// Active handler count per event name, sorted by name.
    pub(crate) fn counts(&self) -> Vec<(String, usize)> {
        let lists = self.lists.read();
        let mut out: Vec<(String, usize)> = lists
            .iter()
            .map(|(name, list)| (name.to_string(), list.iter().filter(|s| s.is_active()).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        out.sort_unstable();
        out
    }

    /// Deactivates and drops every handler.
    pub(crate) fn clear(&self) {
        let drained: Vec<Arc<Slot>> = {
            let mut lists = self.lists.write();
            lists.drain().flat_map(|(_, list)| list).collect()
        };
        for slot in drained {
            slot.deactivate();
        }
    }
}

/// Handle to a registered handler.
///
/// Dropping the handle does **not** unsubscribe; call [`Subscription::unsubscribe`]
/// or return [`Flow::Stop`] from the handler.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    event: Arc<str>,
    slot: Weak<Slot>,
    table: Weak<HandlerTable>,
}

impl Subscription {
    /// Bus-unique subscription id (also used in handler failure logs).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Event name the handler is subscribed to.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// True while the handler will still receive events.
    pub fn is_active(&self) -> bool {
        self.slot.upgrade().is_some_and(|s| s.is_active())
    }

    /// Removes the handler. Returns false if it was already gone.
    ///
    /// A delivery already walking its snapshot skips the handler from now on.
    pub fn unsubscribe(&self) -> bool {
        let Some(slot) = self.slot.upgrade() else {
            return false;
        };
        if !slot.deactivate() {
            return false;
        }
        if let Some(table) = self.table.upgrade() {
            table.remove(&self.event, &[self.id]);
        }
        true
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HandlerFn;
    use parking_lot::Mutex;

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
        flow: Flow,
    ) -> Arc<dyn Handler> {
        let log = Arc::clone(log);
        HandlerFn::arc(move |_ev: Event| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(tag);
                Ok::<_, HandlerError>(flow)
            }
        })
    }

    #[tokio::test]
    async fn handlers_fire_in_subscription_order() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c", "d"] {
            table.subscribe("tick".into(), recorder(&log, tag, Flow::Continue));
        }

        for _ in 0..3 {
            let d = table.dispatch(&Event::new("tick")).await;
            assert_eq!(d.delivered, 4);
        }
        assert_eq!(
            *log.lock(),
            vec!["a", "b", "c", "d", "a", "b", "c", "d", "a", "b", "c", "d"]
        );
    }

    #[tokio::test]
    async fn stop_takes_effect_after_the_walk() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = table.subscribe("samples".into(), recorder(&log, "first", Flow::Stop));
        table.subscribe("samples".into(), recorder(&log, "second", Flow::Continue));

        let d = table.dispatch(&Event::new("samples")).await;
        assert_eq!(d, Delivery { delivered: 2, failed: 0, unsubscribed: 1 });
        assert!(!first.is_active());

        table.dispatch(&Event::new("samples")).await;
        assert_eq!(*log.lock(), vec!["first", "second", "second"]);
        assert_eq!(table.counts(), vec![("samples".to_string(), 1)]);
    }

    #[tokio::test]
    async fn failing_and_panicking_handlers_do_not_block_others() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        table.subscribe(
            "x".into(),
            HandlerFn::arc(|_ev: Event| async { Err(HandlerError::fail("nope")) }),
        );
        table.subscribe(
            "x".into(),
            HandlerFn::arc(|_ev: Event| async {
                if true {
                    panic!("handler exploded");
                }
                Ok::<_, HandlerError>(Flow::Continue)
            }),
        );
        table.subscribe("x".into(), recorder(&log, "last", Flow::Continue));

        let d = table.dispatch(&Event::new("x")).await;
        assert_eq!(d.delivered, 3);
        assert_eq!(d.failed, 2);
        assert_eq!(*log.lock(), vec!["last"]);

        // failures keep their subscription
        assert_eq!(table.counts(), vec![("x".to_string(), 3)]);
    }

    #[tokio::test]
    async fn subscribing_mid_dispatch_applies_to_next_event() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let t = Arc::clone(&table);
        let l = Arc::clone(&log);
        table.subscribe(
            "x".into(),
            HandlerFn::arc(move |_ev: Event| {
                let t = Arc::clone(&t);
                let l = Arc::clone(&l);
                async move {
                    l.lock().push("adder");
                    t.subscribe("x".into(), recorder(&l, "late", Flow::Continue));
                    Ok::<_, HandlerError>(Flow::Stop)
                }
            }),
        );

        table.dispatch(&Event::new("x")).await;
        assert_eq!(*log.lock(), vec!["adder"]);
        table.dispatch(&Event::new("x")).await;
        assert_eq!(*log.lock(), vec!["adder", "late"]);
    }

    #[tokio::test]
    async fn unsubscribe_handle_removes_handler() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = table.subscribe("x".into(), recorder(&log, "a", Flow::Continue));

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert_eq!(table.dispatch(&Event::new("x")).await.delivered, 0);
        assert!(table.counts().is_empty());
    }

    #[tokio::test]
    async fn unsubscribing_a_later_sibling_mid_walk_skips_it() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let (l, v) = (Arc::clone(&log), Arc::clone(&victim));
        table.subscribe(
            "x".into(),
            HandlerFn::arc(move |_ev: Event| {
                let (l, v) = (Arc::clone(&l), Arc::clone(&v));
                async move {
                    l.lock().push("a");
                    if let Some(sub) = v.lock().take() {
                        assert!(sub.unsubscribe());
                    }
                    Ok::<_, HandlerError>(Flow::Continue)
                }
            }),
        );
        table.subscribe("x".into(), recorder(&log, "b", Flow::Continue));
        let c = table.subscribe("x".into(), recorder(&log, "c", Flow::Continue));
        *victim.lock() = Some(c.clone());

        let d = table.dispatch(&Event::new("x")).await;
        assert_eq!(d, Delivery { delivered: 2, failed: 0, unsubscribed: 0 });
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert!(!c.is_active());
        assert_eq!(table.counts(), vec![("x".to_string(), 2)]);
    }

    #[tokio::test]
    async fn unrelated_names_are_not_delivered() {
        let table = Arc::new(HandlerTable::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        table.subscribe("a".into(), recorder(&log, "a", Flow::Continue));
        assert_eq!(table.dispatch(&Event::new("b")).await, Delivery::default());
        assert!(log.lock().is_empty());
    }
}
