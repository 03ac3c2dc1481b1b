//! # Ability: the capability unit supervised by the runtime.
//!
//! An [`Ability`] has a stable, unique [`name`](Ability::name), a set of
//! accepted commands, a set of events it may emit, and a start/stop lifecycle.
//! Concrete abilities (audio capture, speech, pointer, keyboard, ...) are opaque
//! to the runtime; it only routes commands to them by name and hands them an
//! [`AbilityContext`] to emit events.
//!
//! ## Readiness
//! - [`Readiness::Immediate`]: the ability is usable as soon as `start` returns
//!   `Ok`; the supervisor announces [`ABILITY_STARTED`](crate::ABILITY_STARTED).
//! - [`Readiness::Signaled`]: `start` only kicks off background work; the
//!   ability calls [`AbilityContext::ready`] once it is internally ready.
//!
//! ## Example
//! ```
//! use abilityvisor::{Ability, AbilityContext, AbilityError, Command, Payload};
//! use async_trait::async_trait;
//!
//! struct Mousing;
//!
//! #[async_trait]
//! impl Ability for Mousing {
//!     fn name(&self) -> &str { "mousing" }
//!     fn commands(&self) -> Vec<&str> { vec!["move"] }
//!
//!     async fn execute(&self, cmd: Command) -> Result<Option<Payload>, AbilityError> {
//!         let (x, y) = cmd.payload_as::<(i32, i32)>().copied().ok_or_else(|| AbilityError::fail("missing position"))?;
//!         let _ = (x, y); // move the pointer...
//!         Ok(None)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::abilities::{AbilityContext, Command};
use crate::error::AbilityError;
use crate::payload::Payload;

/// How an ability reports that it is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Ready when `start` returns `Ok`.
    #[default]
    Immediate,
    /// Ready when the ability calls [`AbilityContext::ready`].
    Signaled,
}

/// Capability module driven by the supervisor.
#[async_trait]
pub trait Ability: Send + Sync + 'static {
    /// Unique, case-sensitive, non-empty name.
    fn name(&self) -> &str;

    /// Command names this ability accepts.
    fn commands(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Event names this ability may emit (informational).
    fn events(&self) -> Vec<&str> {
        Vec::new()
    }

    /// True if `command` is handled by [`execute`](Ability::execute).
    fn accepts(&self, command: &str) -> bool {
        self.commands().contains(&command)
    }

    /// How readiness is announced.
    fn readiness(&self) -> Readiness {
        Readiness::Immediate
    }

    /// Starts the ability.
    ///
    /// Long-running work should be spawned and tied to `ctx.token()`; an `Err`
    /// aborts the whole supervisor startup.
    async fn start(&self, ctx: AbilityContext) -> Result<(), AbilityError> {
        let _ = ctx;
        Ok(())
    }

    /// Stops the ability.
    ///
    /// Must be safe to call even if `start` never completed.
    async fn stop(&self) {}

    /// Executes one accepted command.
    async fn execute(&self, cmd: Command) -> Result<Option<Payload>, AbilityError>;
}
