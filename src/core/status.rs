//! # Per-ability status tracking.
//!
//! ```text
//! Declared ─► Starting ─► Running ─► Stopping ─► Stopped
//!                 │                      ▲
//!                 └─► Failed             └── (also from Starting when
//!                                             cancelled before ready)
//! ```
//!
//! ## Rules
//! - `Running` is entered exactly once, when readiness is announced
//!   ([`mark_running`](StatusBoard::mark_running) only succeeds from `Starting`).
//! - Read operations are snapshots; the board is only written by the supervisor
//!   and by readiness announcements.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

/// Lifecycle status of one declared ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityStatus {
    /// Declared, not started yet.
    Declared,
    /// `start` is in progress or readiness has not been announced.
    Starting,
    /// Ready; commands are routed to it.
    Running,
    /// `stop` is in progress.
    Stopping,
    /// Stopped.
    Stopped,
    /// `start` failed.
    Failed,
}

impl fmt::Display for AbilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbilityStatus::Declared => "declared",
            AbilityStatus::Starting => "starting",
            AbilityStatus::Running => "running",
            AbilityStatus::Stopping => "stopping",
            AbilityStatus::Stopped => "stopped",
            AbilityStatus::Failed => "failed",
        })
    }
}

/// Thread-safe map of ability name → status.
#[derive(Default)]
pub struct StatusBoard {
    state: RwLock<HashMap<String, AbilityStatus>>,
}

impl StatusBoard {
    pub(crate) fn set(&self, name: &str, status: AbilityStatus) {
        self.state.write().insert(name.to_string(), status);
    }

    /// `Starting` → `Running`; returns false from any other status.
    pub(crate) fn mark_running(&self, name: &str) -> bool {
        let mut state = self.state.write();
        match state.get_mut(name) {
            Some(s) if *s == AbilityStatus::Starting => {
                *s = AbilityStatus::Running;
                true
            }
            _ => false,
        }
    }

    /// Current status of `name`.
    pub fn get(&self, name: &str) -> Option<AbilityStatus> {
        self.state.read().get(name).copied()
    }

    /// Sorted names currently in `status`.
    pub fn in_status(&self, status: AbilityStatus) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .read()
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_is_entered_once_and_only_from_starting() {
        let board = StatusBoard::default();
        board.set("speaking", AbilityStatus::Declared);
        assert!(!board.mark_running("speaking"));

        board.set("speaking", AbilityStatus::Starting);
        assert!(board.mark_running("speaking"));
        assert!(!board.mark_running("speaking"));
        assert_eq!(board.get("speaking"), Some(AbilityStatus::Running));

        assert!(!board.mark_running("unknown"));
        assert_eq!(board.in_status(AbilityStatus::Running), vec!["speaking"]);
    }
}
