//! # abilityvisor
//!
//! **Abilityvisor** is a small orchestration runtime for capability modules
//! ("abilities") such as audio capture, speech understanding, speech synthesis,
//! pointer or keyboard control.
//!
//! Abilities register themselves with a [`Supervisor`], emit [`Event`]s on a
//! shared [`Bus`] and receive [`Command`]s. Handlers attached with
//! [`Supervisor::on`] turn one ability's events into commands for another, so
//! the composed system is a reactive graph whose edges are the subscriptions.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Ability    │   │   Ability    │   │   Ability    │
//!     │  (hearing)   │   │(understanding│   │  (speaking)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────▲───────┘
//!            │ emit(samples)    │ emit(analysis)   │ execute(say)
//!            ▼                  ▼                  │
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                               Bus                                 │
//! │  - HandlerTable: event name → ordered handlers (Flow::Stop/Cont.) │
//! │  - FIFO emit queue + dispatcher worker                            │
//! │  - ObserverSet (per-observer bounded queues)                      │
//! └──────┬───────────────────────────────────────────────────┬────────┘
//!        ▼                                                   ▼
//!  handler(ev) ── sup.exec(Command) ──┐               observers (logging, ...)
//!                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (declared abilities, declaration order)               │
//! │  - StatusBoard (Declared/Starting/Running/Stopping/Stopped)       │
//! │  - RunState (Created/Running/Draining/Stopped)                    │
//! │  - in-flight tracker + runtime token                              │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! declare(..)* ──► run(token)
//!                    ├─► start abilities in declaration order
//!                    │     └─ ready → ABILITY_STARTED (attributed to the ability)
//!                    ├─► serve events and commands until token fires
//!                    ├─► Draining: SHUTDOWN_REQUESTED, exec → ShuttingDown,
//!                    │             in-flight commands get cfg.grace to finish
//!                    ├─► stop abilities in reverse order (ABILITY_STOPPED)
//!                    └─► release the bus, return
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------------|--------------------------------------------|
//! | **Abilities**     | Capability units with commands, events and a start/stop cycle. | [`Ability`], [`AbilityFn`], [`Command`]    |
//! | **Events**        | Named notifications, per-name ordered handlers.                 | [`Event`], [`Handler`], [`Flow`], [`Bus`]  |
//! | **Supervision**   | Declaration, command routing, startup and graceful shutdown.    | [`Supervisor`], [`RunState`]               |
//! | **Cancellation**  | OS signals collapsed into one idempotent token.                 | [`CancelSource`]                           |
//! | **Observers**     | Watch every bus event without joining the reactive graph.       | [`Observe`], [`ObserverSet`]               |
//! | **Errors**        | Typed errors for runtime, commands, abilities and handlers.     | [`RuntimeError`], [`ExecError`]            |
//! | **Configuration** | Addresses, credentials, resources and time bounds.              | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] observer _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use abilityvisor::{AbilityError, AbilityFn, Command, Config, ExecError, Supervisor};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(Config::default()).build();
//!     sup.declare(
//!         AbilityFn::builder("mousing")
//!             .command("move", |_cmd: Command| async { Ok::<_, AbilityError>(None) })
//!             .build(),
//!     )?;
//!
//!     // Commands are refused until the supervisor runs.
//!     let err = sup.exec(Command::new("mousing", "move")).await.unwrap_err();
//!     assert!(matches!(err, ExecError::NotRunning));
//!
//!     let token = CancellationToken::new();
//!     token.cancel();
//!     sup.run(token).await?;
//!     Ok(())
//! }
//! ```
mod abilities;
mod core;
mod error;
mod events;
mod observers;
mod payload;

// ---- Public re-exports ----

pub use abilities::{Ability, AbilityContext, AbilityFn, AbilityFnBuilder, Command, Readiness};
pub use crate::core::{
    AbilityInfo, AbilityStatus, CancelSource, Config, ExecHandle, RunState, ServerConfig,
    StatusBoard, Supervisor, SupervisorBuilder, wait_for_shutdown_signal,
};
pub use error::{AbilityError, ExecError, HandlerError, RuntimeError};
pub use events::{
    ABILITY_FAILED, ABILITY_STARTED, ABILITY_STOPPED, Bus, Delivery, Emitter, Event, Flow,
    Handler, HandlerFn, SHUTDOWN_REQUESTED, Subscription,
};
pub use observers::{Observe, ObserverSet};
pub use payload::Payload;

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
