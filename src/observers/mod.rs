//! # Whole-bus observers.
//!
//! Handlers subscribe to one event name and take part in the reactive graph.
//! Observers sit beside it: they see **every** event published or emitted on
//! the bus, cannot unsubscribe themselves and cannot slow delivery down.
//!
//! ```text
//! Bus::publish / Bus::emit
//!        │
//!        ├──► HandlerTable (per-name, ordered, awaited)
//!        │
//!        └──► ObserverSet::emit_arc  (fire-and-forget)
//!                 ├──► [queue O1] ─► worker O1 ─► on_event()
//!                 └──► [queue ON] ─► worker ON ─► on_event()
//! ```
//!
//! ## Implementing custom observers
//! ```no_run
//! use abilityvisor::{Event, Observe};
//! use async_trait::async_trait;
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Observe for Audit {
//!     async fn on_event(&self, event: &Event) {
//!         // write audit record...
//!         let _ = event.name();
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod observe;
mod set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observe::Observe;
pub use set::ObserverSet;
