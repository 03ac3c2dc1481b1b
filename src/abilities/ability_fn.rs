//! # Closure-backed ability (`AbilityFn`)
//!
//! [`AbilityFn`] assembles an [`Ability`] from closures: one per command, plus
//! optional start/stop hooks. Each command invocation creates a **new** future;
//! share state between commands explicitly with `Arc<...>` inside the closures.
//!
//! ## Example
//! ```rust
//! use abilityvisor::{AbilityError, AbilityFn, Command, Payload};
//!
//! let speaking = AbilityFn::builder("speaking")
//!     .command("say", |cmd: Command| async move {
//!         let text = cmd.payload_as::<String>().cloned().unwrap_or_default();
//!         println!("saying {text}");
//!         Ok::<_, AbilityError>(None)
//!     })
//!     .event("said")
//!     .build();
//!
//! use abilityvisor::Ability;
//! assert_eq!(speaking.name(), "speaking");
//! assert!(speaking.accepts("say"));
//! assert!(!speaking.accepts("move"));
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::abilities::{Ability, AbilityContext, Command, Readiness};
use crate::error::AbilityError;
use crate::payload::Payload;

type CommandFn =
    Arc<dyn Fn(Command) -> BoxFuture<'static, Result<Option<Payload>, AbilityError>> + Send + Sync>;
type StartFn = Arc<dyn Fn(AbilityContext) -> BoxFuture<'static, Result<(), AbilityError>> + Send + Sync>;
type StopFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Function-backed ability.
pub struct AbilityFn {
    name: String,
    commands: Vec<(String, CommandFn)>,
    events: Vec<String>,
    readiness: Readiness,
    on_start: Option<StartFn>,
    on_stop: Option<StopFn>,
}

impl AbilityFn {
    /// Starts building an ability named `name`.
    pub fn builder(name: impl Into<String>) -> AbilityFnBuilder {
        AbilityFnBuilder {
            inner: AbilityFn {
                name: name.into(),
                commands: Vec::new(),
                events: Vec::new(),
                readiness: Readiness::Immediate,
                on_start: None,
                on_stop: None,
            },
        }
    }
}

/// Fluent builder for [`AbilityFn`].
pub struct AbilityFnBuilder {
    inner: AbilityFn,
}

impl AbilityFnBuilder {
    /// Adds a command handled by `f`. A later registration of the same name replaces the earlier one.
    pub fn command<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Command) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Payload>, AbilityError>> + Send + 'static,
    {
        let name = name.into();
        let f: CommandFn = Arc::new(move |cmd: Command| -> BoxFuture<'static, _> { Box::pin(f(cmd)) });
        self.inner.commands.retain(|(n, _)| *n != name);
        self.inner.commands.push((name, f));
        self
    }

    /// Declares an event name the ability may emit.
    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.inner.events.push(name.into());
        self
    }

    /// Sets how readiness is announced.
    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.inner.readiness = readiness;
        self
    }

    /// Hook run by [`Ability::start`].
    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(AbilityContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AbilityError>> + Send + 'static,
    {
        let f: StartFn = Arc::new(move |ctx: AbilityContext| -> BoxFuture<'static, _> { Box::pin(f(ctx)) });
        self.inner.on_start = Some(f);
        self
    }

    /// Hook run by [`Ability::stop`].
    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let f: StopFn = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(f()) });
        self.inner.on_stop = Some(f);
        self
    }

    /// Finishes the ability and returns it as a shared handle.
    pub fn build(self) -> Arc<AbilityFn> {
        Arc::new(self.inner)
    }
}

#[async_trait]
impl Ability for AbilityFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn events(&self) -> Vec<&str> {
        self.events.iter().map(String::as_str).collect()
    }

    fn readiness(&self) -> Readiness {
        self.readiness
    }

    async fn start(&self, ctx: AbilityContext) -> Result<(), AbilityError> {
        match &self.on_start {
            Some(f) => f(ctx).await,
            None => Ok(()),
        }
    }

    async fn stop(&self) {
        if let Some(f) = &self.on_stop {
            f().await;
        }
    }

    async fn execute(&self, cmd: Command) -> Result<Option<Payload>, AbilityError> {
        let f = self
            .commands
            .iter()
            .find(|(n, _)| n == cmd.name())
            .map(|(_, f)| Arc::clone(f))
            .ok_or_else(|| AbilityError::fail(format!("unsupported command '{}'", cmd.name())))?;
        f(cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatches_to_matching_closure() {
        let ab = AbilityFn::builder("calc")
            .command("double", |cmd: Command| async move {
                let n = cmd.payload_as::<i64>().copied().unwrap_or_default();
                Ok(Some(Payload::new(n * 2)))
            })
            .command("fail", |_cmd: Command| async { Err(AbilityError::fail("always")) })
            .build();

        assert_eq!(ab.commands(), vec!["double", "fail"]);
        let out = ab
            .execute(Command::new("calc", "double").with_payload(Payload::new(21i64)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.downcast_ref::<i64>(), Some(&42));

        let err = ab.execute(Command::new("calc", "fail")).await.unwrap_err();
        assert_eq!(err.as_label(), "ability_failed");

        let err = ab.execute(Command::new("calc", "nope")).await.unwrap_err();
        assert!(err.to_string().contains("unsupported command 'nope'"));
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let ab = AbilityFn::builder("x")
            .command("a", |_c: Command| async { Ok(None) })
            .command("a", |_c: Command| async { Ok(None) })
            .event("e")
            .build();
        assert_eq!(ab.commands(), vec!["a"]);
        assert_eq!(ab.events(), vec!["e"]);
        assert_eq!(ab.readiness(), Readiness::Immediate);
    }
}
