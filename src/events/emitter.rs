//! # Origin-scoped event emitter.
//!
//! An [`Emitter`] is handed to each ability at start (through its
//! [`AbilityContext`](crate::AbilityContext)). Every event it produces is
//! attributed to that ability, so handlers can filter on
//! [`Event::is_from`](crate::Event::is_from).
//!
//! Cheap to clone; move clones into the ability's worker tasks.

use std::sync::Arc;

use crate::events::{Bus, Delivery, Event};
use crate::payload::Payload;

/// Emits events on behalf of one ability.
#[derive(Clone)]
pub struct Emitter {
    bus: Bus,
    origin: Arc<str>,
}

impl Emitter {
    pub(crate) fn new(bus: Bus, origin: Arc<str>) -> Self {
        Self { bus, origin }
    }

    /// Name of the ability events are attributed to.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Builds an event attributed to this ability.
    pub fn event(&self, name: impl Into<Arc<str>>) -> Event {
        Event::new(name).with_ability(Arc::clone(&self.origin))
    }

    /// Queues an event without payload. Returns `false` once the bus is released.
    pub fn emit(&self, name: impl Into<Arc<str>>) -> bool {
        self.bus.emit(self.event(name))
    }

    /// Queues an event with a payload. Returns `false` once the bus is released.
    pub fn emit_with(&self, name: impl Into<Arc<str>>, payload: Payload) -> bool {
        self.bus.emit(self.event(name).with_payload(payload))
    }

    /// Delivers an event inline and waits for every handler to finish.
    pub async fn publish(&self, name: impl Into<Arc<str>>, payload: Option<Payload>) -> Delivery {
        let mut ev = self.event(name);
        if let Some(p) = payload {
            ev = ev.with_payload(p);
        }
        self.bus.publish(ev).await
    }
}
