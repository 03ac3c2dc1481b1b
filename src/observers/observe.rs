//! # Core observer trait
//!
//! `Observe` is the extension point for watching all bus traffic (logging,
//! metrics, remote mirrors). Each observer is driven by a dedicated worker loop
//! fed by a bounded queue owned by the [`ObserverSet`](crate::ObserverSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the
//!   publisher, the handlers, nor other observers.
//! - Each observer **declares** its preferred queue capacity via
//!   [`Observe::queue_capacity`]. If a queue overflows, events for that
//!   observer are **dropped** (warn).

use async_trait::async_trait;

use crate::events::Event;

/// Contract for bus observers.
///
/// Called from an observer-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this observer's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
