//! # Events delivered through the bus.
//!
//! An [`Event`] is an immutable notification: a name, an optional origin
//! ability (referenced by name only) and an optional opaque [`Payload`].
//! Events are constructed when something happens, delivered to every current
//! subscriber of their name, and then discarded. Nothing is retained or replayed.
//!
//! ## Reserved names
//! | Name                     | Origin               | Emitted when                                   |
//! |--------------------------|----------------------|------------------------------------------------|
//! | [`ABILITY_STARTED`]      | the started ability  | an ability is ready to accept commands         |
//! | [`ABILITY_STOPPED`]      | the stopped ability  | an ability was stopped during teardown         |
//! | [`ABILITY_FAILED`]       | the failing ability  | an ability failed to start                     |
//! | [`SHUTDOWN_REQUESTED`]   | none (system)        | cancellation was received, draining begins     |
//!
//! ## Ordering
//! Each event carries a globally unique sequence number (`seq`) that increases
//! monotonically, which lets observers restore emission order.
//!
//! ## Example
//! ```rust
//! use abilityvisor::{Event, Payload};
//!
//! let ev = Event::new("samples")
//!     .with_ability("hearing")
//!     .with_payload(Payload::new(16_000u32));
//!
//! assert_eq!(ev.name(), "samples");
//! assert_eq!(ev.ability(), Some("hearing"));
//! assert_eq!(ev.payload_as::<u32>(), Some(&16_000));
//! assert!(!ev.is_system());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::payload::Payload;

/// An ability finished starting and accepts commands.
pub const ABILITY_STARTED: &str = "ability-started";
/// An ability was stopped.
pub const ABILITY_STOPPED: &str = "ability-stopped";
/// An ability failed to start.
pub const ABILITY_FAILED: &str = "ability-failed";
/// Cancellation was received and the supervisor is draining.
pub const SHUTDOWN_REQUESTED: &str = "shutdown-requested";

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Notification with optional origin and payload.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    name: Arc<str>,
    ability: Option<Arc<str>>,
    payload: Option<Payload>,
}

impl Event {
    /// Creates a system-level event with the current timestamp and next sequence number.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            name: name.into(),
            ability: None,
            payload: None,
        }
    }

    /// Attributes the event to an ability.
    #[inline]
    pub fn with_ability(mut self, ability: impl Into<Arc<str>>) -> Self {
        self.ability = Some(ability.into());
        self
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the originating ability, if any.
    pub fn ability(&self) -> Option<&str> {
        self.ability.as_deref()
    }

    /// Attached payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Payload downcast to `T`; `None` when absent or of another type.
    pub fn payload_as<T: std::any::Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }

    /// True when the event is not attributed to any ability.
    pub fn is_system(&self) -> bool {
        self.ability.is_none()
    }

    /// True when the event originates from `ability`.
    pub fn is_from(&self, ability: &str) -> bool {
        self.ability.as_deref() == Some(ability)
    }
}
