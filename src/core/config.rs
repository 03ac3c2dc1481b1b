//! # Supervisor configuration.
//!
//! Provides [`Config`] centralized settings handed to the supervisor at
//! construction and shared read-only with every ability through its
//! [`AbilityContext`](crate::AbilityContext). The runtime never reads
//! environment variables or command-line arguments itself.
//!
//! ## Sentinel values
//! - `stop_timeout = 0s` → `stop` calls are awaited without bound
//! - `exec_timeout = 0s` → commands run without timeout

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Listener address and credentials for one server an ability may expose.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub listen_addr: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password (redacted in `Debug`).
    pub password: String,
}

impl ServerConfig {
    /// Creates a server config.
    pub fn new(
        listen_addr: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `brains_server` / `clients_server`: addresses and credentials consumed by abilities
/// - `resources_dir`: where abilities find static resources
/// - `grace`: drain window for in-flight commands after cancellation (`0s` = no wait)
/// - `stop_timeout`: bound on each ability's `stop` (`0s` = unbounded)
/// - `exec_timeout`: per-command timeout (`0s` = none)
#[derive(Clone, Debug)]
pub struct Config {
    /// Server abilities use to talk to remote workers.
    pub brains_server: ServerConfig,
    /// Server abilities use to talk to user interfaces.
    pub clients_server: ServerConfig,
    /// Static resources directory.
    pub resources_dir: PathBuf,

    /// Maximum time in-flight commands get to finish once cancellation fires.
    ///
    /// When the window closes the runtime token is cancelled and remaining
    /// commands resolve as [`AbilityError::Canceled`](crate::AbilityError::Canceled).
    pub grace: Duration,

    /// Maximum time a single ability's `stop` may take during teardown.
    pub stop_timeout: Duration,

    /// Default per-command timeout.
    pub exec_timeout: Duration,
}

impl Config {
    /// Returns the per-command timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → applied to every `exec`
    #[inline]
    pub fn command_timeout(&self) -> Option<Duration> {
        if self.exec_timeout == Duration::ZERO {
            None
        } else {
            Some(self.exec_timeout)
        }
    }

    /// Returns the per-ability stop bound as an `Option`.
    #[inline]
    pub fn stop_limit(&self) -> Option<Duration> {
        if self.stop_timeout == Duration::ZERO {
            None
        } else {
            Some(self.stop_timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `brains_server = 127.0.0.1:6970`, `clients_server = 127.0.0.1:6969` (no credentials)
    /// - `resources_dir = "resources"`
    /// - `grace = 30s`
    /// - `stop_timeout = 5s`
    /// - `exec_timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            brains_server: ServerConfig::new("127.0.0.1:6970", "", ""),
            clients_server: ServerConfig::new("127.0.0.1:6969", "", ""),
            resources_dir: PathBuf::from("resources"),
            grace: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(5),
            exec_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_durations_mean_unbounded() {
        let mut cfg = Config::default();
        assert_eq!(cfg.command_timeout(), None);
        assert_eq!(cfg.stop_limit(), Some(Duration::from_secs(5)));

        cfg.exec_timeout = Duration::from_millis(250);
        cfg.stop_timeout = Duration::ZERO;
        assert_eq!(cfg.command_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.stop_limit(), None);
    }

    #[test]
    fn password_is_redacted() {
        let s = ServerConfig::new("127.0.0.1:6970", "admin", "hunter2");
        let dbg = format!("{s:?}");
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("hunter2"));
    }
}
