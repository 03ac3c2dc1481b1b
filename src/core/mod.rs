//! Runtime core: orchestration and lifecycle.
//!
//! The main public API from this module is [`Supervisor`], which declares
//! abilities, routes commands and drives startup, draining and shutdown.
//!
//! Internal modules:
//! - [`supervisor`]: run loop, command routing, start/stop sequencing;
//! - [`runner`]: executes one command with timeout/cancellation and panic capture;
//! - [`registry`]: declared abilities in declaration order;
//! - [`status`]: per-ability lifecycle status;
//! - [`state`]: supervisor run state;
//! - [`shutdown`]: cancellation source and OS signal handling;
//! - [`config`]: configuration handed to every ability.

mod builder;
mod config;
mod registry;
mod runner;
mod shutdown;
mod state;
mod status;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{Config, ServerConfig};
pub use shutdown::{CancelSource, wait_for_shutdown_signal};
pub use state::RunState;
pub use status::{AbilityStatus, StatusBoard};
pub use supervisor::{AbilityInfo, ExecHandle, Supervisor};
