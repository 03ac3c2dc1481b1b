//! Error types used by the abilityvisor runtime, abilities and event handlers.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself (declaration, startup, state).
//! - [`ExecError`]: errors returned to the caller of [`Supervisor::exec`](crate::Supervisor::exec).
//! - [`AbilityError`]: failures surfaced by an ability while starting or handling a command.
//! - [`HandlerError`]: failures of an event handler; logged and swallowed by the bus.
//!
//! All of them provide `as_label` for logs/metrics.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// Declaration and startup errors are fatal: they are returned from
/// [`Supervisor::run`](crate::Supervisor::run) before any event flows.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An ability with the same name was already declared.
    #[error("ability '{name}' is already declared")]
    DuplicateAbility {
        /// Name of the rejected ability.
        name: String,
    },

    /// An ability or event name was empty.
    #[error("{kind} name must not be empty")]
    InvalidName {
        /// What was being named ("ability" or "event").
        kind: &'static str,
    },

    /// The operation is not valid in the supervisor's current state.
    #[error("cannot {op} while supervisor is {state}")]
    InvalidState {
        /// Rejected operation.
        op: &'static str,
        /// State at the time of the call.
        state: crate::core::RunState,
    },

    /// An ability failed to start; already-started abilities were stopped.
    #[error("ability '{ability}' failed to start: {source}")]
    StartFailed {
        /// Name of the ability that failed.
        ability: String,
        /// Underlying ability failure.
        source: AbilityError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use abilityvisor::RuntimeError;
    ///
    /// let err = RuntimeError::DuplicateAbility { name: "speaking".into() };
    /// assert_eq!(err.as_label(), "runtime_duplicate_ability");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateAbility { .. } => "runtime_duplicate_ability",
            RuntimeError::InvalidName { .. } => "runtime_invalid_name",
            RuntimeError::InvalidState { .. } => "runtime_invalid_state",
            RuntimeError::StartFailed { .. } => "runtime_start_failed",
        }
    }
}

/// # Errors returned by command execution.
///
/// None of these are fatal to the supervisor; they are reported to the caller
/// and the system keeps serving subsequent events and commands.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExecError {
    /// The command targets an ability that was never declared.
    #[error("unknown ability '{ability}'")]
    UnknownAbility {
        /// Target ability name.
        ability: String,
    },

    /// The target ability does not accept this command.
    #[error("ability '{ability}' does not accept command '{command}'")]
    UnknownCommand {
        /// Target ability name.
        ability: String,
        /// Rejected command name.
        command: String,
    },

    /// The target ability is declared but has not announced readiness
    /// (or has already been stopped).
    #[error("ability '{ability}' is not ready ({status})")]
    NotReady {
        /// Target ability name.
        ability: String,
        /// Status at the time of the call.
        status: crate::core::AbilityStatus,
    },

    /// The ability failed while handling the command.
    #[error("ability '{ability}' failed to execute '{command}': {source}")]
    Execution {
        /// Target ability name.
        ability: String,
        /// Command name.
        command: String,
        /// Ability-specific failure.
        source: AbilityError,
    },

    /// Cancellation was received; no new commands are accepted.
    #[error("supervisor is shutting down")]
    ShuttingDown,

    /// The supervisor has not been started yet.
    #[error("supervisor is not running")]
    NotRunning,
}

impl ExecError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use abilityvisor::ExecError;
    ///
    /// assert_eq!(ExecError::ShuttingDown.as_label(), "exec_shutting_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecError::UnknownAbility { .. } => "exec_unknown_ability",
            ExecError::UnknownCommand { .. } => "exec_unknown_command",
            ExecError::NotReady { .. } => "exec_not_ready",
            ExecError::Execution { .. } => "exec_ability_failed",
            ExecError::ShuttingDown => "exec_shutting_down",
            ExecError::NotRunning => "exec_not_running",
        }
    }
}

/// # Failures surfaced by an ability.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AbilityError {
    /// The ability reported a failure.
    #[error("ability failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Command execution exceeded the configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Work was cancelled because the supervisor is shutting down.
    #[error("cancelled by shutdown")]
    Canceled,

    /// The ability panicked.
    #[error("ability panicked: {info}")]
    Panicked {
        /// Panic message, if one could be extracted.
        info: String,
    },
}

impl AbilityError {
    /// Builds an [`AbilityError::Fail`] from anything displayable.
    ///
    /// ```
    /// use abilityvisor::AbilityError;
    ///
    /// let err = AbilityError::fail("device busy");
    /// assert_eq!(err.to_string(), "ability failed: device busy");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        AbilityError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AbilityError::Fail { .. } => "ability_failed",
            AbilityError::Timeout { .. } => "ability_timeout",
            AbilityError::Canceled => "ability_canceled",
            AbilityError::Panicked { .. } => "ability_panicked",
        }
    }
}

/// # Failures of an event handler.
///
/// Never propagated to the publisher: the bus logs them and keeps delivering.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The handler panicked.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic message, if one could be extracted.
        info: String,
    },
}

impl HandlerError {
    /// Builds a [`HandlerError::Fail`] from anything displayable.
    pub fn fail(error: impl fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }
}

impl From<ExecError> for HandlerError {
    fn from(err: ExecError) -> Self {
        HandlerError::fail(err)
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
