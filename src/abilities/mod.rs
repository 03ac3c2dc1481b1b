//! # Abilities and commands.
//!
//! This module provides the capability-side types:
//! - [`Ability`] - trait implemented by every capability module
//! - [`AbilityFn`] - closure-backed ability with a fluent builder
//! - [`AbilityContext`] - runtime handles given to an ability at start
//! - [`Command`] - named request routed to one ability
//! - [`Readiness`] - how an ability announces it is ready

mod ability;
mod ability_fn;
mod command;
mod context;

pub use ability::{Ability, Readiness};
pub use ability_fn::{AbilityFn, AbilityFnBuilder};
pub use command::Command;
pub use context::AbilityContext;
pub(crate) use context::announce_ready;
