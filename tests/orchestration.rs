use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use abilityvisor::{
    ABILITY_FAILED, ABILITY_STARTED, ABILITY_STOPPED, AbilityContext, AbilityError, AbilityFn,
    AbilityStatus, Command, Config, Event, ExecError, Flow, HandlerError, Payload, Readiness,
    RunState, RuntimeError, SHUTDOWN_REQUESTED, Supervisor,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Ability accepting `command`, recording the `String` payload of each call.
fn recording(name: &str, command: &str, seen: &Log) -> Arc<AbilityFn> {
    let seen = Arc::clone(seen);
    AbilityFn::builder(name)
        .command(command, move |cmd: Command| {
            let seen = Arc::clone(&seen);
            async move {
                let text = cmd.payload_as::<String>().cloned().unwrap_or_default();
                seen.lock().push(text);
                Ok(None)
            }
        })
        .build()
}

fn text(s: &str) -> Payload {
    Payload::new(s.to_string())
}

fn spawn_run(sup: &Arc<Supervisor>, token: &CancellationToken) -> JoinHandle<Result<(), RuntimeError>> {
    let sup = Arc::clone(sup);
    let token = token.clone();
    tokio::spawn(async move { sup.run(token).await })
}

async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn wait_running(sup: &Supervisor, ability: &str) {
    eventually(|| sup.status(ability) == Some(AbilityStatus::Running)).await;
}

#[tokio::test]
async fn speaking_greets_once_when_started() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let said = log();
    let moved = log();
    sup.declare(recording("speaking", "say", &said))?;
    sup.declare(recording("mousing", "move", &moved))?;

    let s = Arc::clone(&sup);
    sup.on(ABILITY_STARTED, move |ev: Event| {
        let s = Arc::clone(&s);
        async move {
            if ev.is_from("speaking") {
                s.exec(Command::new("speaking", "say").with_payload(text("Hello world")))
                    .await?;
            }
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;

    let token = CancellationToken::new();
    let run = spawn_run(&sup, &token);

    wait_running(&sup, "mousing").await;
    eventually(|| !said.lock().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    token.cancel();
    run.await??;

    assert_eq!(*said.lock(), vec!["Hello world"]);
    assert!(moved.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn keyboarding_refuses_commands_after_cancellation() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let typed = log();
    sup.declare(recording("keyboarding", "type", &typed))?;

    let token = CancellationToken::new();
    let run = spawn_run(&sup, &token);
    wait_running(&sup, "keyboarding").await;

    let cmd = || Command::new("keyboarding", "type").with_payload(text("Hello\nBob\n"));
    assert!(sup.exec(cmd()).await?.is_none());
    assert_eq!(*typed.lock(), vec!["Hello\nBob\n"]);

    token.cancel();
    let err = sup.exec(cmd()).await.unwrap_err();
    assert!(matches!(err, ExecError::ShuttingDown), "got {err:?}");
    assert!(matches!(sup.exec_detached(cmd()), Err(ExecError::ShuttingDown)));

    run.await??;
    assert_eq!(typed.lock().len(), 1);
    assert_eq!(sup.state(), RunState::Stopped);
    assert_eq!(sup.status("keyboarding"), Some(AbilityStatus::Stopped));
    Ok(())
}

#[tokio::test]
async fn unknown_targets_are_reported_without_side_effects() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let typed = log();
    sup.declare(recording("keyboarding", "type", &typed))?;

    assert!(matches!(
        sup.exec(Command::new("keyboarding", "type")).await,
        Err(ExecError::NotRunning)
    ));

    let token = CancellationToken::new();
    let run = spawn_run(&sup, &token);
    wait_running(&sup, "keyboarding").await;

    let err = sup.exec(Command::new("hearing", "listen")).await.unwrap_err();
    assert!(matches!(&err, ExecError::UnknownAbility { ability } if ability == "hearing"));

    let err = sup.exec(Command::new("keyboarding", "dance")).await.unwrap_err();
    assert_eq!(err.as_label(), "exec_unknown_command");

    token.cancel();
    run.await??;
    assert!(typed.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn routing_errors_take_precedence_before_run() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let typed = log();
    sup.declare(recording("keyboarding", "type", &typed))?;

    let err = sup.exec(Command::new("ghost", "say")).await.unwrap_err();
    assert!(matches!(&err, ExecError::UnknownAbility { ability } if ability == "ghost"));

    let err = sup.exec(Command::new("keyboarding", "dance")).await.unwrap_err();
    assert!(matches!(
        &err,
        ExecError::UnknownCommand { ability, command } if ability == "keyboarding" && command == "dance"
    ));
    assert!(sup.exec_detached(Command::new("ghost", "say")).is_err());

    let err = sup.exec(Command::new("keyboarding", "type")).await.unwrap_err();
    assert!(matches!(err, ExecError::NotRunning));
    assert_eq!(sup.state(), RunState::Created);
    assert!(typed.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_declaration_keeps_first_and_aborts_run() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let starts = Arc::new(AtomicUsize::new(0));
    let said = log();

    let counter = Arc::clone(&starts);
    sup.declare(
        AbilityFn::builder("speaking")
            .command("say", |_c: Command| async { Ok(None) })
            .on_start(move |_ctx: AbilityContext| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build(),
    )?;

    let err = sup.declare(recording("speaking", "shout", &said)).unwrap_err();
    assert!(matches!(&err, RuntimeError::DuplicateAbility { name } if name == "speaking"));

    let infos = sup.abilities();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].commands, vec!["say"]);

    let err = sup.run(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_duplicate_ability");
    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert_eq!(sup.state(), RunState::Stopped);
    assert!(sup.bus().is_released());
    Ok(())
}

#[tokio::test]
async fn nothing_starts_after_cancellation() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let starts = Arc::new(AtomicUsize::new(0));

    for name in ["hearing", "speaking"] {
        let counter = Arc::clone(&starts);
        sup.declare(
            AbilityFn::builder(name)
                .on_start(move |_ctx: AbilityContext| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .build(),
        )?;
    }

    let token = CancellationToken::new();
    token.cancel();
    sup.run(token).await?;

    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert_eq!(sup.status("hearing"), Some(AbilityStatus::Declared));
    assert!(matches!(
        sup.exec(Command::new("hearing", "listen")).await,
        Err(ExecError::ShuttingDown)
    ));

    let err = sup.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidState { op: "run", state: RunState::Stopped }));
    assert!(sup.declare(AbilityFn::builder("late").build()).is_err());
    Ok(())
}

#[tokio::test]
async fn start_failure_stops_already_started_abilities() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let stops = log();
    let failures = log();

    let stopping = |name: &'static str| {
        let stops = Arc::clone(&stops);
        move || {
            let stops = Arc::clone(&stops);
            async move { stops.lock().push(name.to_string()) }
        }
    };

    sup.declare(AbilityFn::builder("hearing").on_stop(stopping("hearing")).build())?;
    sup.declare(AbilityFn::builder("mousing").on_stop(stopping("mousing")).build())?;
    sup.declare(
        AbilityFn::builder("speaking")
            .on_start(|_ctx: AbilityContext| async { Err(AbilityError::fail("no audio device")) })
            .on_stop(stopping("speaking"))
            .build(),
    )?;
    sup.declare(AbilityFn::builder("keyboarding").on_stop(stopping("keyboarding")).build())?;

    let f = Arc::clone(&failures);
    sup.on(ABILITY_FAILED, move |ev: Event| {
        let f = Arc::clone(&f);
        async move {
            let msg = ev.payload_as::<String>().cloned().unwrap_or_default();
            f.lock().push(format!("{}: {msg}", ev.ability().unwrap_or("?")));
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;

    let err = sup.run(CancellationToken::new()).await.unwrap_err();
    match &err {
        RuntimeError::StartFailed { ability, source } => {
            assert_eq!(ability, "speaking");
            assert_eq!(source.as_label(), "ability_failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(*stops.lock(), vec!["speaking", "mousing", "hearing"]);
    assert_eq!(*failures.lock(), vec!["speaking: ability failed: no audio device"]);
    assert_eq!(sup.status("speaking"), Some(AbilityStatus::Failed));
    assert_eq!(sup.status("hearing"), Some(AbilityStatus::Stopped));
    assert_eq!(sup.status("keyboarding"), Some(AbilityStatus::Declared));
    assert_eq!(sup.state(), RunState::Stopped);
    Ok(())
}

#[tokio::test]
async fn drain_lets_short_commands_finish_and_cancels_the_rest() -> anyhow::Result<()> {
    init_tracing();
    let mut cfg = Config::default();
    cfg.grace = Duration::from_millis(150);
    let sup = Supervisor::builder(cfg).build();

    sup.declare(
        AbilityFn::builder("speaking")
            .command("say", |_c: Command| async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(Some(Payload::new("said")))
            })
            .command("recite", |_c: Command| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            })
            .build(),
    )?;

    let token = CancellationToken::new();
    let run = spawn_run(&sup, &token);
    wait_running(&sup, "speaking").await;

    let short = sup.exec_detached(Command::new("speaking", "say"))?;
    let long = sup.exec_detached(Command::new("speaking", "recite"))?;
    assert_eq!(long.command(), "recite");
    token.cancel();

    let out = short.join().await?.expect("result payload");
    assert_eq!(out.downcast_ref::<&str>(), Some(&"said"));

    let err = long.join().await.unwrap_err();
    assert!(
        matches!(&err, ExecError::Execution { source: AbilityError::Canceled, .. }),
        "got {err:?}"
    );

    tokio::time::timeout(Duration::from_secs(2), run).await???;
    Ok(())
}

#[tokio::test]
async fn failing_handler_does_not_block_later_handlers() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let seen = log();

    sup.on("analysis", |_ev: Event| async { Err(HandlerError::fail("cannot parse")) })?;
    let s = Arc::clone(&seen);
    sup.on("analysis", move |ev: Event| {
        let s = Arc::clone(&s);
        async move {
            s.lock().push(ev.payload_as::<String>().cloned().unwrap_or_default());
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;

    for word in ["bob", "hello"] {
        let d = sup
            .bus()
            .publish(Event::new("analysis").with_ability("understanding").with_payload(text(word)))
            .await;
        assert_eq!(d.delivered, 2);
        assert_eq!(d.failed, 1);
    }
    assert_eq!(*seen.lock(), vec!["bob", "hello"]);
    assert_eq!(sup.subscriptions(), vec![("analysis".to_string(), 2)]);
    Ok(())
}

#[tokio::test]
async fn signaled_ability_is_routable_only_after_ready() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    let gate = CancellationToken::new();
    let ready_calls = log();

    let g = gate.clone();
    let calls = Arc::clone(&ready_calls);
    sup.declare(
        AbilityFn::builder("understanding")
            .readiness(Readiness::Signaled)
            .command("samples", |_c: Command| async { Ok(None) })
            .on_start(move |ctx: AbilityContext| {
                let g = g.clone();
                let calls = Arc::clone(&calls);
                async move {
                    tokio::spawn(async move {
                        g.cancelled().await;
                        calls.lock().push(format!("{}", ctx.ready()));
                        calls.lock().push(format!("{}", ctx.ready()));
                    });
                    Ok(())
                }
            })
            .build(),
    )?;

    let started = log();
    let st = Arc::clone(&started);
    sup.on(ABILITY_STARTED, move |ev: Event| {
        let st = Arc::clone(&st);
        async move {
            st.lock().push(ev.ability().unwrap_or_default().to_string());
            Ok::<_, HandlerError>(Flow::Continue)
        }
    })?;

    let token = CancellationToken::new();
    let run = spawn_run(&sup, &token);
    eventually(|| sup.status("understanding") == Some(AbilityStatus::Starting)).await;

    let err = sup.exec(Command::new("understanding", "samples")).await.unwrap_err();
    assert!(matches!(err, ExecError::NotReady { status: AbilityStatus::Starting, .. }));

    gate.cancel();
    wait_running(&sup, "understanding").await;
    sup.exec(Command::new("understanding", "samples")).await?;

    eventually(|| started.lock().len() == 1 && ready_calls.lock().len() == 2).await;
    assert_eq!(*started.lock(), vec!["understanding"]);
    assert_eq!(*ready_calls.lock(), vec!["true", "false"]);

    token.cancel();
    run.await??;
    Ok(())
}

#[tokio::test]
async fn shutdown_events_announce_teardown_in_reverse_order() -> anyhow::Result<()> {
    init_tracing();
    let sup = Supervisor::builder(Config::default()).build();
    for name in ["hearing", "understanding", "speaking"] {
        sup.declare(AbilityFn::builder(name).build())?;
    }

    let seen = log();
    for event in [SHUTDOWN_REQUESTED, ABILITY_STOPPED] {
        let s = Arc::clone(&seen);
        sup.on(event, move |ev: Event| {
            let s = Arc::clone(&s);
            async move {
                s.lock().push(match ev.ability() {
                    Some(a) => format!("{}:{a}", ev.name()),
                    None => ev.name().to_string(),
                });
                Ok::<_, HandlerError>(Flow::Continue)
            }
        })?;
    }

    let token = CancellationToken::new();
    let run = spawn_run(&sup, &token);
    wait_running(&sup, "speaking").await;
    token.cancel();
    run.await??;

    assert_eq!(
        *seen.lock(),
        vec![
            "shutdown-requested",
            "ability-stopped:speaking",
            "ability-stopped:understanding",
            "ability-stopped:hearing",
        ]
    );
    assert!(sup.subscriptions().is_empty());
    Ok(())
}
