//! # Supervisor builder: wires configuration and observers into a bus.

use std::sync::Arc;

use crate::{
    core::Config,
    events::Bus,
    observers::{Observe, ObserverSet},
};
use super::supervisor::Supervisor;

/// Builder for constructing a [`Supervisor`] with optional observers.
pub struct SupervisorBuilder {
    cfg: Config,
    observers: Vec<Arc<dyn Observe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
        }
    }

    /// Sets whole-bus observers.
    ///
    /// Observers receive every event published or emitted on the bus through
    /// dedicated workers with bounded queues.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// Spawns the bus dispatcher and observer workers, so it must be called
    /// from within a Tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let observers = ObserverSet::new(self.observers);
        let bus = Bus::with_observers(observers);
        Arc::new(Supervisor::new_internal(self.cfg, bus))
    }
}
