//! # Bob: a voice-driven assistant wired from five abilities
//!
//! Demonstrates:
//! - Declaring closure-backed and hand-written abilities
//! - Reacting to `ABILITY_STARTED` to greet once speaking is ready
//! - Turning one ability's events into another ability's commands
//! - OS-signal driven graceful shutdown
//!
//! ```text
//! hearing ──samples──► understanding ──analysis("bob")──┬─► speaking.say("Yes")
//!                                                       ├─► mousing.move(200, 200)
//!                                                       └─► keyboarding.type("Hello\nMy name is Bob\n")
//! ```
//!
//! The abilities are stand-ins: hearing produces synthetic sample batches and
//! understanding "recognizes" every third batch as the word "bob".
//!
//! Run with `RUST_LOG=debug cargo run --example bob --features logging` and stop with Ctrl-C.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use abilityvisor::{
    ABILITY_STARTED, Ability, AbilityContext, AbilityError, AbilityFn, CancelSource, Command,
    Config, Emitter, Event, Flow, HandlerError, LogWriter, Observe, Payload, ServerConfig,
    Supervisor,
};

/// One batch of captured audio.
#[derive(Debug, Clone)]
struct Samples {
    samples: Vec<i32>,
    sample_rate: u32,
    significant_bits: u8,
    silence_max_audio_level: f64,
}

/// Captures audio and emits `samples` batches.
fn hearing() -> Arc<AbilityFn> {
    AbilityFn::builder("hearing")
        .event("samples")
        .on_start(|ctx: AbilityContext| async move {
            let token = ctx.token().clone();
            let emitter = ctx.emitter().clone();
            tokio::spawn(async move {
                let period = Duration::from_secs(2);
                let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick.tick() => {
                            let batch = Samples {
                                samples: vec![0; 1600],
                                sample_rate: 16_000,
                                significant_bits: 16,
                                silence_max_audio_level: 35.0,
                            };
                            emitter.emit_with("samples", Payload::new(batch));
                        }
                    }
                }
                debug!("hearing: capture stopped");
            });
            Ok(())
        })
        .build()
}

/// Turns sample batches into text analyses.
#[derive(Default)]
struct Understanding {
    emitter: Mutex<Option<Emitter>>,
    batches: AtomicU64,
}

#[async_trait]
impl Ability for Understanding {
    fn name(&self) -> &str {
        "understanding"
    }

    fn commands(&self) -> Vec<&str> {
        vec!["samples"]
    }

    fn events(&self) -> Vec<&str> {
        vec!["analysis"]
    }

    async fn start(&self, ctx: AbilityContext) -> Result<(), AbilityError> {
        *self.emitter.lock() = Some(ctx.emitter().clone());
        Ok(())
    }

    async fn stop(&self) {
        self.emitter.lock().take();
    }

    async fn execute(&self, cmd: Command) -> Result<Option<Payload>, AbilityError> {
        let batch = cmd
            .payload_as::<Samples>()
            .ok_or_else(|| AbilityError::fail("samples payload missing"))?;
        debug!(
            len = batch.samples.len(),
            rate = batch.sample_rate,
            bits = batch.significant_bits,
            silence = batch.silence_max_audio_level,
            "understanding: analyzing samples"
        );

        let n = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        let text = if n % 3 == 0 { " bob " } else { "" };
        if !text.is_empty() {
            if let Some(emitter) = self.emitter.lock().as_ref() {
                emitter.emit_with("analysis", Payload::new(text.to_string()));
            }
        }
        Ok(None)
    }
}

fn speaking() -> Arc<AbilityFn> {
    AbilityFn::builder("speaking")
        .command("say", |cmd: Command| async move {
            let text = cmd.payload_as::<String>().cloned().unwrap_or_default();
            info!(%text, "speaking: saying");
            Ok(None)
        })
        .build()
}

fn mousing() -> Arc<AbilityFn> {
    AbilityFn::builder("mousing")
        .command("move", |cmd: Command| async move {
            let (x, y) = cmd
                .payload_as::<(i32, i32)>()
                .copied()
                .ok_or_else(|| AbilityError::fail("position missing"))?;
            info!(x, y, "mousing: moving pointer");
            Ok::<_, AbilityError>(None)
        })
        .build()
}

fn keyboarding() -> Arc<AbilityFn> {
    AbilityFn::builder("keyboarding")
        .command("type", |cmd: Command| async move {
            let text = cmd.payload_as::<String>().cloned().unwrap_or_default();
            info!(?text, "keyboarding: typing");
            Ok(None)
        })
        .build()
}

fn say(text: &str) -> Command {
    Command::new("speaking", "say").with_payload(Payload::new(text.to_string()))
}

/// Executes `cmd`, logging a failure instead of propagating it.
async fn exec_logged(sup: &Supervisor, cmd: Command) {
    if let Err(e) = sup.exec(cmd).await {
        error!(error = %e, "executing cmd failed");
    }
}

fn wire(sup: &Arc<Supervisor>) -> Result<(), abilityvisor::RuntimeError> {
    // Greet once speaking is ready.
    let s = Arc::clone(sup);
    sup.on(ABILITY_STARTED, move |ev: Event| {
        let s = Arc::clone(&s);
        async move {
            if ev.is_from("speaking") {
                exec_logged(&s, say("Hello world")).await;
            }
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;

    // Forward captured audio to understanding without holding up the emit queue.
    let s = Arc::clone(sup);
    sup.on("samples", move |ev: Event| {
        let s = Arc::clone(&s);
        async move {
            if let Some(batch) = ev.payload() {
                let cmd = Command::new("understanding", "samples").with_payload(batch.clone());
                let handle = s.exec_detached(cmd).map_err(HandlerError::fail)?;
                tokio::spawn(async move {
                    if let Err(e) = handle.join().await {
                        error!(error = %e, "analyzing samples failed");
                    }
                });
            }
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;

    // React to the assistant's name.
    let s = Arc::clone(sup);
    sup.on("analysis", move |ev: Event| {
        let s = Arc::clone(&s);
        async move {
            let text = ev.payload_as::<String>().cloned().unwrap_or_default();
            debug!(%text, "processing analysis");
            if text.trim() == "bob" {
                exec_logged(&s, say("Yes")).await;
                exec_logged(&s, Command::new("mousing", "move").with_payload(Payload::new((200, 200)))).await;
                exec_logged(
                    &s,
                    Command::new("keyboarding", "type")
                        .with_payload(Payload::new(String::from("Hello\nMy name is Bob\n"))),
                )
                .await;
            }
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config {
        brains_server: ServerConfig::new("127.0.0.1:6970", "admin", "admin"),
        clients_server: ServerConfig::new("127.0.0.1:6969", "admin", "admin"),
        resources_dir: "resources".into(),
        ..Config::default()
    };

    let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg).with_observers(observers).build();

    let declared = [
        sup.declare(hearing()),
        sup.declare(keyboarding()),
        sup.declare(mousing()),
        sup.declare(speaking()),
        sup.declare(Arc::new(Understanding::default())),
    ];
    if let Some(Err(e)) = declared.into_iter().find(Result::is_err) {
        error!(error = %e, "declaring abilities failed");
        std::process::exit(1);
    }
    if let Err(e) = wire(&sup) {
        error!(error = %e, "wiring handlers failed");
        std::process::exit(1);
    }

    let cancel = CancelSource::new();
    let _signals = cancel.listen_os_signals();

    if let Err(e) = sup.run(cancel.token()).await {
        error!(error = %e, "running bob failed");
        std::process::exit(1);
    }
    info!("bob stopped");
}
