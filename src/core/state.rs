//! # Supervisor run state.
//!
//! ```text
//! Created ──run()──► Running ──cancel──► Draining ──teardown──► Stopped
//!    │                                                            ▲
//!    └──────────── declaration / start failure ───────────────────┘
//! ```
//!
//! - `declare` is only valid in `Created`;
//! - `exec` is only valid in `Running` (`Draining`/`Stopped` → `ShuttingDown`;
//!   `Created` → `NotRunning` for a routable command, routing errors otherwise).

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a [`Supervisor`](crate::Supervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed; abilities are being declared.
    Created,
    /// `run` entered; abilities started, events flowing.
    Running,
    /// Cancellation received; no new commands, in-flight work finishing.
    Draining,
    /// Terminal; `run` has returned.
    Stopped,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunState::Created,
            1 => RunState::Running,
            2 => RunState::Draining,
            _ => RunState::Stopped,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Created => "created",
            RunState::Running => "running",
            RunState::Draining => "draining",
            RunState::Stopped => "stopped",
        })
    }
}

/// Atomic cell holding a [`RunState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(RunState::Created as u8))
    }

    pub(crate) fn get(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from` → `to`; on mismatch returns the actual state.
    pub(crate) fn transition(&self, from: RunState, to: RunState) -> Result<(), RunState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(RunState::from_u8)
    }

    pub(crate) fn set(&self, to: RunState) {
        self.0.store(to as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_checked() {
        let s = StateCell::new();
        assert_eq!(s.get(), RunState::Created);
        assert_eq!(s.transition(RunState::Created, RunState::Running), Ok(()));
        assert_eq!(
            s.transition(RunState::Created, RunState::Running),
            Err(RunState::Running)
        );
        s.set(RunState::Stopped);
        assert_eq!(s.get(), RunState::Stopped);
        assert_eq!(s.get().to_string(), "stopped");
    }
}
