//! Events, handlers and the bus.
//!
//! - [`Event`]: immutable notification (name, optional origin, optional payload);
//! - [`Handler`] / [`HandlerFn`] / [`Flow`]: per-name reactions with a continuation decision;
//! - [`Bus`]: subscription table plus inline (`publish`) and queued (`emit`) delivery;
//! - [`Subscription`]: handle to one registered handler;
//! - [`Emitter`]: origin-scoped emitting handle given to abilities.

mod bus;
mod dispatcher;
mod emitter;
mod event;
mod handler;

pub use bus::Bus;
pub use dispatcher::{Delivery, Subscription};
pub use emitter::Emitter;
pub use event::{ABILITY_FAILED, ABILITY_STARTED, ABILITY_STOPPED, Event, SHUTDOWN_REQUESTED};
pub use handler::{Flow, Handler, HandlerFn};
