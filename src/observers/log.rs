//! # Reference logging observer.
//!
//! [`LogWriter`] writes every bus event through `tracing` at debug level.
//!
//! ## Output fields
//! ```text
//! DEBUG abilityvisor: event seq=3 event="ability-started" ability=Some("speaking") payload=None
//! DEBUG abilityvisor: event seq=9 event="samples" ability=Some("hearing") payload=Some("demo::Samples")
//! ```
//!
//! Not intended as the only production sink: implement a custom
//! [`Observe`](crate::Observe) for metrics or remote mirroring.

use async_trait::async_trait;
use tracing::debug;

use crate::events::Event;
use crate::observers::Observe;

/// Debug-level event logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Creates the observer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        debug!(
            seq = e.seq,
            event = e.name(),
            ability = ?e.ability(),
            payload = ?e.payload().map(|p| p.type_name()),
            "event"
        );
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
