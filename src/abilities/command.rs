//! # Commands routed to abilities.
//!
//! A [`Command`] names its target ability and the operation to perform, and
//! optionally carries an opaque [`Payload`] with the parameters. Commands are
//! immutable once built; they are submitted through
//! [`Supervisor::exec`](crate::Supervisor::exec) and never retried by the runtime.
//!
//! ## Example
//! ```rust
//! use abilityvisor::{Command, Payload};
//!
//! let cmd = Command::new("keyboarding", "type").with_payload(Payload::new("Hello\nBob\n".to_string()));
//! assert_eq!(cmd.ability(), "keyboarding");
//! assert_eq!(cmd.name(), "type");
//! assert_eq!(cmd.payload_as::<String>().map(String::as_str), Some("Hello\nBob\n"));
//! ```

use std::sync::Arc;

use crate::payload::Payload;

/// Named unit of work bound to one target ability.
#[derive(Clone, Debug)]
pub struct Command {
    ability: Arc<str>,
    name: Arc<str>,
    payload: Option<Payload>,
}

impl Command {
    /// Creates a command without parameters.
    pub fn new(ability: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            ability: ability.into(),
            name: name.into(),
            payload: None,
        }
    }

    /// Attaches the command parameters.
    #[inline]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Target ability name.
    pub fn ability(&self) -> &str {
        &self.ability
    }

    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Parameters downcast to `T`; `None` when absent or of another type.
    pub fn payload_as<T: std::any::Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }
}
