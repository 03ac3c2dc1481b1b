//! # Supervisor: declares abilities, routes commands, drives startup and shutdown.
//!
//! The [`Supervisor`] owns the ability registry, the [`Bus`], the
//! [`StatusBoard`] and the runtime token handed (as child tokens) to every
//! ability. Handlers attached with [`Supervisor::on`] are the only way abilities
//! are wired together: a handler reacts to one ability's event by issuing a
//! command to another through [`Supervisor::exec`].
//!
//! ## Architecture
//! ```text
//! declare(ability) ──► Registry (ordered, unique names)
//! on(name, handler) ─► Bus::subscribe
//!
//! run(token):
//!   Created ─► Running
//!     for ability in declaration order:
//!       token fired?   → skip remaining starts
//!       start(ctx)     ─┬─ Ok + Immediate → status Running, emit ABILITY_STARTED
//!                       ├─ Ok + Signaled  → ability calls ctx.ready() later
//!                       ├─ cancelled      → stop(), skip remaining starts
//!                       └─ Err            → publish ABILITY_FAILED, stop failed + started (reverse),
//!                                           release bus, Stopped, return StartFailed
//!   token.cancelled().await
//!   Running ─► Draining
//!     publish SHUTDOWN_REQUESTED
//!     inflight.close(); wait ≤ cfg.grace
//!     runtime_token.cancel()         → stragglers resolve as Canceled
//!     stop started abilities (reverse), each ≤ cfg.stop_timeout, publish ABILITY_STOPPED
//!     bus.release()
//!   Draining ─► Stopped
//!
//! exec(cmd):
//!   token fired / Draining / Stopped? ──► ShuttingDown
//!   registry.get(cmd.ability) ── none ──► UnknownAbility
//!   ability.accepts(cmd.name) ── no ───► UnknownCommand
//!   state Created? ── yes ─────────────► NotRunning
//!   status Running? ── no ─────────────► NotReady
//!   run_command(..) (tracked in-flight) ── Err ──► Execution
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use abilityvisor::{
//!     ABILITY_STARTED, AbilityError, AbilityFn, Command, Config, Event, Flow, HandlerError,
//!     Payload, Supervisor,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(Config::default()).build();
//!
//!     sup.declare(
//!         AbilityFn::builder("speaking")
//!             .command("say", |cmd: Command| async move {
//!                 println!("{}", cmd.payload_as::<String>().map(String::as_str).unwrap_or(""));
//!                 Ok::<_, AbilityError>(None)
//!             })
//!             .build(),
//!     )?;
//!
//!     let token = CancellationToken::new();
//!     let (s, t) = (Arc::clone(&sup), token.clone());
//!     sup.on(ABILITY_STARTED, move |ev: Event| {
//!         let (s, t) = (Arc::clone(&s), t.clone());
//!         async move {
//!             if !ev.is_from("speaking") {
//!                 return Ok::<_, HandlerError>(Flow::Continue);
//!             }
//!             let say = Command::new("speaking", "say").with_payload(Payload::new(String::from("Hello world")));
//!             s.exec(say).await?;
//!             t.cancel();
//!             Ok(Flow::Stop)
//!         }
//!     })?;
//!
//!     sup.run(token).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::FutureExt;
use tokio::{task::JoinHandle, time};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use super::{
    builder::SupervisorBuilder,
    config::Config,
    registry::Registry,
    runner::run_command,
    state::{RunState, StateCell},
    status::{AbilityStatus, StatusBoard},
};
use crate::abilities::{Ability, AbilityContext, Command, Readiness, announce_ready};
use crate::error::{AbilityError, ExecError, HandlerError, RuntimeError, panic_message};
use crate::events::{
    ABILITY_FAILED, ABILITY_STOPPED, Bus, Emitter, Event, Flow, Handler, HandlerFn,
    SHUTDOWN_REQUESTED, Subscription,
};
use crate::payload::Payload;

/// Snapshot of one declared ability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityInfo {
    /// Ability name.
    pub name: String,
    /// Accepted command names.
    pub commands: Vec<String>,
    /// Event names the ability may emit.
    pub events: Vec<String>,
    /// Current lifecycle status.
    pub status: AbilityStatus,
}

/// Handle to a command started with [`Supervisor::exec_detached`].
pub struct ExecHandle {
    ability: String,
    command: String,
    handle: JoinHandle<Result<Option<Payload>, ExecError>>,
}

impl ExecHandle {
    /// Target ability.
    pub fn ability(&self) -> &str {
        &self.ability
    }

    /// Command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// True once the command has resolved.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the command's outcome.
    pub async fn join(self) -> Result<Option<Payload>, ExecError> {
        match self.handle.await {
            Ok(res) => res,
            Err(e) => {
                let source = if e.is_panic() {
                    AbilityError::Panicked {
                        info: panic_message(e.into_panic().as_ref()),
                    }
                } else {
                    AbilityError::Canceled
                };
                Err(ExecError::Execution {
                    ability: self.ability,
                    command: self.command,
                    source,
                })
            }
        }
    }
}

/// Owns declared abilities, the event bus and the run loop.
pub struct Supervisor {
    cfg: Arc<Config>,
    bus: Bus,
    registry: Registry,
    status: Arc<StatusBoard>,
    state: StateCell,
    inflight: TaskTracker,
    runtime_token: CancellationToken,
    cancel: OnceLock<CancellationToken>,
}

impl Supervisor {
    pub(crate) fn new_internal(cfg: Config, bus: Bus) -> Self {
        Self {
            cfg: Arc::new(cfg),
            bus,
            registry: Registry::default(),
            status: Arc::new(StatusBoard::default()),
            state: StateCell::new(),
            inflight: TaskTracker::new(),
            runtime_token: CancellationToken::new(),
            cancel: OnceLock::new(),
        }
    }

    /// Creates a builder for configuring the supervisor.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Registers an ability as a command target and event source.
    ///
    /// Only valid before [`run`](Self::run). A rejected declaration leaves the
    /// first one in place and makes the next `run` fail with the same error.
    pub fn declare(&self, ability: Arc<dyn Ability>) -> Result<(), RuntimeError> {
        let name = ability.name().to_string();
        let open = || match self.state.get() {
            RunState::Created => Ok(()),
            state => Err(RuntimeError::InvalidState { op: "declare", state }),
        };
        if let Err(e) = self.registry.declare(ability, open) {
            warn!(ability = %name, label = e.as_label(), error = %e, "declaration rejected");
            return Err(e);
        }
        self.status.set(&name, AbilityStatus::Declared);
        debug!(ability = %name, "ability declared");
        Ok(())
    }

    /// Subscribes a closure to `event`.
    ///
    /// The closure decides after each event whether to keep receiving
    /// ([`Flow::Continue`]) or unsubscribe ([`Flow::Stop`]).
    pub fn on<F, Fut>(&self, event: impl Into<Arc<str>>, f: F) -> Result<Subscription, RuntimeError>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, HandlerError>> + Send + 'static,
    {
        self.on_handler(event, HandlerFn::arc(f))
    }

    /// Subscribes a [`Handler`] to `event`.
    pub fn on_handler(
        &self,
        event: impl Into<Arc<str>>,
        handler: Arc<dyn Handler>,
    ) -> Result<Subscription, RuntimeError> {
        let sub = self.bus.subscribe(event, handler)?;
        debug!(event = sub.event(), id = sub.id(), "handler subscribed");
        Ok(sub)
    }

    /// Routes `cmd` to its ability and waits for the outcome.
    ///
    /// Safe to call from inside event handlers. Never retries.
    pub async fn exec(&self, cmd: Command) -> Result<Option<Payload>, ExecError> {
        let _inflight = self.inflight.token();
        let ability = self.admit(&cmd)?;
        execute(ability, cmd, self.cfg.command_timeout(), self.runtime_token.clone()).await
    }

    /// Validates `cmd` now and runs it on a separate task.
    ///
    /// Routing errors are returned at once; the execution outcome is
    /// available through [`ExecHandle::join`]. Must be called from within a
    /// Tokio runtime.
    pub fn exec_detached(&self, cmd: Command) -> Result<ExecHandle, ExecError> {
        let inflight = self.inflight.token();
        let ability = self.admit(&cmd)?;

        let (name, command) = (cmd.ability().to_string(), cmd.name().to_string());
        let timeout = self.cfg.command_timeout();
        let runtime = self.runtime_token.clone();
        let handle = tokio::spawn(async move {
            let _inflight = inflight;
            execute(ability, cmd, timeout, runtime).await
        });

        Ok(ExecHandle {
            ability: name,
            command,
            handle,
        })
    }

    /// Starts every declared ability, serves until `token` fires, then drains and stops.
    ///
    /// Returns the first declaration or startup error, or `Ok(())` after a
    /// cancellation-driven shutdown. Can only be called once.
    pub async fn run(&self, token: CancellationToken) -> Result<(), RuntimeError> {
        if let Err(state) = self.state.transition(RunState::Created, RunState::Running) {
            return Err(RuntimeError::InvalidState { op: "run", state });
        }
        let _ = self.cancel.set(token.clone());

        if let Some(err) = self.registry.take_error() {
            error!(label = err.as_label(), error = %err, "declaration failed, nothing started");
            self.finish().await;
            return Err(err);
        }

        let abilities = self.registry.list();
        info!(abilities = abilities.len(), "supervisor starting");

        let mut started: Vec<Arc<dyn Ability>> = Vec::with_capacity(abilities.len());
        for ability in abilities {
            if token.is_cancelled() {
                debug!(ability = ability.name(), "cancelled, start skipped");
                continue;
            }
            match self.start_ability(&ability, &token).await {
                Ok(true) => started.push(ability),
                Ok(false) => {}
                Err(source) => {
                    let name = ability.name().to_string();
                    self.abort_startup(&ability, started, &source).await;
                    return Err(RuntimeError::StartFailed { ability: name, source });
                }
            }
        }

        token.cancelled().await;
        self.drain(started).await;
        Ok(())
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Declared abilities in declaration order.
    pub fn abilities(&self) -> Vec<AbilityInfo> {
        self.registry
            .list()
            .iter()
            .map(|a| AbilityInfo {
                name: a.name().to_string(),
                commands: a.commands().into_iter().map(str::to_string).collect(),
                events: a.events().into_iter().map(str::to_string).collect(),
                status: self.status.get(a.name()).unwrap_or(AbilityStatus::Declared),
            })
            .collect()
    }

    /// Status of one ability; `None` if it was never declared.
    pub fn status(&self, ability: &str) -> Option<AbilityStatus> {
        self.status.get(ability)
    }

    /// Active handler count per event name (the reactive graph's edges).
    pub fn subscriptions(&self) -> Vec<(String, usize)> {
        self.bus.subscriptions()
    }

    /// The event bus, for publishing application-level events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Configuration shared with every ability.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Checks state, routing and readiness for `cmd`.
    fn admit(&self, cmd: &Command) -> Result<Arc<dyn Ability>, ExecError> {
        let res = self.route(cmd);
        if let Err(e) = &res {
            warn!(
                ability = cmd.ability(),
                command = cmd.name(),
                label = e.as_label(),
                error = %e,
                "command rejected"
            );
        }
        res
    }

    fn route(&self, cmd: &Command) -> Result<Arc<dyn Ability>, ExecError> {
        if self.cancel.get().is_some_and(CancellationToken::is_cancelled) {
            return Err(ExecError::ShuttingDown);
        }
        let state = self.state.get();
        if matches!(state, RunState::Draining | RunState::Stopped) {
            return Err(ExecError::ShuttingDown);
        }

        let ability = self
            .registry
            .get(cmd.ability())
            .ok_or_else(|| ExecError::UnknownAbility {
                ability: cmd.ability().to_string(),
            })?;
        if !ability.accepts(cmd.name()) {
            return Err(ExecError::UnknownCommand {
                ability: cmd.ability().to_string(),
                command: cmd.name().to_string(),
            });
        }
        if state == RunState::Created {
            return Err(ExecError::NotRunning);
        }
        match self.status.get(cmd.ability()) {
            Some(AbilityStatus::Running) => Ok(ability),
            status => Err(ExecError::NotReady {
                ability: cmd.ability().to_string(),
                status: status.unwrap_or(AbilityStatus::Declared),
            }),
        }
    }

    /// Starts one ability. `Ok(false)` means cancellation interrupted the start.
    async fn start_ability(
        &self,
        ability: &Arc<dyn Ability>,
        token: &CancellationToken,
    ) -> Result<bool, AbilityError> {
        let name: Arc<str> = Arc::from(ability.name());
        self.status.set(&name, AbilityStatus::Starting);

        let emitter = Emitter::new(self.bus.clone(), Arc::clone(&name));
        let ctx = AbilityContext::new(
            Arc::clone(&name),
            self.runtime_token.child_token(),
            emitter.clone(),
            Arc::clone(&self.cfg),
            Arc::clone(&self.status),
        );
        debug!(ability = %name, "starting ability");

        let start = AssertUnwindSafe(ability.start(ctx)).catch_unwind();
        let outcome = tokio::select! {
            res = start => Some(res.unwrap_or_else(|panic| Err(AbilityError::Panicked {
                info: panic_message(panic.as_ref()),
            }))),
            _ = token.cancelled() => None,
        };

        match outcome {
            None => {
                info!(ability = %name, "start interrupted by cancellation");
                self.stop_ability(ability.as_ref()).await;
                Ok(false)
            }
            Some(Ok(())) => {
                match ability.readiness() {
                    Readiness::Immediate => {
                        announce_ready(&self.status, &emitter);
                        info!(ability = %name, "ability started");
                    }
                    Readiness::Signaled => {
                        debug!(ability = %name, "ability started, awaiting readiness signal");
                    }
                }
                Ok(true)
            }
            Some(Err(e)) => Err(e),
        }
    }

    /// Start failure path: report, stop what was started, tear down.
    async fn abort_startup(
        &self,
        failed: &Arc<dyn Ability>,
        started: Vec<Arc<dyn Ability>>,
        source: &AbilityError,
    ) {
        let name = failed.name();
        self.status.set(name, AbilityStatus::Failed);
        error!(ability = name, label = source.as_label(), error = %source, "ability failed to start");

        self.bus
            .publish(
                Event::new(ABILITY_FAILED)
                    .with_ability(name)
                    .with_payload(Payload::new(source.to_string())),
            )
            .await;

        self.runtime_token.cancel();
        bounded_stop(failed.as_ref(), self.cfg.stop_limit()).await;
        for ability in started.iter().rev() {
            self.stop_ability(ability.as_ref()).await;
        }
        self.finish().await;
    }

    /// Cancellation path: refuse new commands, drain, stop, release.
    async fn drain(&self, started: Vec<Arc<dyn Ability>>) {
        self.state.set(RunState::Draining);
        info!(inflight = self.inflight.len(), "cancellation received, draining");
        self.bus.publish(Event::new(SHUTDOWN_REQUESTED)).await;

        self.inflight.close();
        let grace = self.cfg.grace;
        if grace > Duration::ZERO && time::timeout(grace, self.inflight.wait()).await.is_err() {
            warn!(
                ?grace,
                inflight = self.inflight.len(),
                "drain window exceeded, cancelling in-flight commands"
            );
        }
        self.runtime_token.cancel();

        for ability in started.iter().rev() {
            self.stop_ability(ability.as_ref()).await;
        }
        self.finish().await;
    }

    async fn stop_ability(&self, ability: &dyn Ability) {
        let name = ability.name();
        self.status.set(name, AbilityStatus::Stopping);
        bounded_stop(ability, self.cfg.stop_limit()).await;
        self.status.set(name, AbilityStatus::Stopped);
        self.bus
            .publish(Event::new(ABILITY_STOPPED).with_ability(name))
            .await;
        info!(ability = name, "ability stopped");
    }

    async fn finish(&self) {
        self.runtime_token.cancel();
        self.bus.release().await;
        self.state.set(RunState::Stopped);
        info!("supervisor stopped");
    }
}

/// Runs one admitted command and maps its failure for the caller.
async fn execute(
    ability: Arc<dyn Ability>,
    cmd: Command,
    timeout: Option<Duration>,
    runtime: CancellationToken,
) -> Result<Option<Payload>, ExecError> {
    let (name, command) = (cmd.ability().to_string(), cmd.name().to_string());
    debug!(ability = %name, command = %command, "executing command");

    run_command(ability.as_ref(), cmd, timeout, &runtime)
        .await
        .map_err(|source| {
            error!(
                ability = %name,
                command = %command,
                label = source.as_label(),
                error = %source,
                "command failed"
            );
            ExecError::Execution {
                ability: name,
                command,
                source,
            }
        })
}

/// Calls `stop`, bounded by `limit`; panics and overruns are logged.
async fn bounded_stop(ability: &dyn Ability, limit: Option<Duration>) {
    let stop = AssertUnwindSafe(ability.stop()).catch_unwind();
    let res = match limit {
        Some(limit) => match time::timeout(limit, stop).await {
            Ok(res) => res,
            Err(_elapsed) => {
                warn!(ability = ability.name(), ?limit, "stop timed out");
                return;
            }
        },
        None => stop.await,
    };
    if let Err(panic) = res {
        error!(
            ability = ability.name(),
            info = %panic_message(panic.as_ref()),
            "ability panicked while stopping"
        );
    }
}
