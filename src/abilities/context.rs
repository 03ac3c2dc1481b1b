//! # Per-ability runtime context.
//!
//! [`AbilityContext`] is what an ability receives in [`Ability::start`](crate::Ability::start):
//! - a [`CancellationToken`] that fires when the supervisor forces shutdown
//!   (after the drain window), to be threaded through every worker the ability spawns;
//! - an [`Emitter`] attributing events to the ability;
//! - the supervisor's read-only [`Config`];
//! - [`ready`](AbilityContext::ready) to announce readiness for [`Readiness::Signaled`](crate::Readiness::Signaled) abilities.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{Config, StatusBoard};
use crate::events::{ABILITY_STARTED, Delivery, Emitter};
use crate::payload::Payload;

/// Runtime handles given to an ability at start.
#[derive(Clone)]
pub struct AbilityContext {
    name: Arc<str>,
    token: CancellationToken,
    emitter: Emitter,
    config: Arc<Config>,
    status: Arc<StatusBoard>,
}

impl AbilityContext {
    pub(crate) fn new(
        name: Arc<str>,
        token: CancellationToken,
        emitter: Emitter,
        config: Arc<Config>,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            name,
            token,
            emitter,
            config,
            status,
        }
    }

    /// Name of the ability this context belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancellation token for the ability's long-lived workers.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Supervisor configuration (addresses, credentials, resources directory).
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cloneable emitter for worker tasks.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Queues an event attributed to this ability.
    pub fn emit(&self, name: impl Into<Arc<str>>) -> bool {
        self.emitter.emit(name)
    }

    /// Queues an event with payload attributed to this ability.
    pub fn emit_with(&self, name: impl Into<Arc<str>>, payload: Payload) -> bool {
        self.emitter.emit_with(name, payload)
    }

    /// Delivers an event inline, waiting for its handlers.
    pub async fn publish(&self, name: impl Into<Arc<str>>, payload: Option<Payload>) -> Delivery {
        self.emitter.publish(name, payload).await
    }

    /// Announces that the ability is ready.
    ///
    /// Idempotent: [`ABILITY_STARTED`] is emitted at most once, and only while
    /// the ability is starting. Returns true if this call announced it.
    pub fn ready(&self) -> bool {
        announce_ready(&self.status, &self.emitter)
    }
}

/// Flips the ability to running and emits [`ABILITY_STARTED`] exactly once.
pub(crate) fn announce_ready(status: &StatusBoard, emitter: &Emitter) -> bool {
    if status.mark_running(emitter.origin()) {
        emitter.emit(ABILITY_STARTED);
        true
    } else {
        false
    }
}
