//! # Execute a single command against an ability.
//!
//! Runs one [`Ability::execute`] call with an optional timeout, racing it
//! against the supervisor's runtime token.
//!
//! ```text
//! Success:      ability.execute(cmd) → Ok(result)
//! Failure:      ability.execute(cmd) → Err(e)              → Err(e)
//! Timeout:      timeout exceeded                            → Err(Timeout)
//! Panic:        ability.execute(cmd) panics                 → Err(Panicked)
//! Forced stop:  runtime token cancelled (drain window over) → Err(Canceled)
//! ```
//!
//! ## Rules
//! - No retries: the caller decides whether to retry or report.
//! - The runtime token is only cancelled after the drain window, so commands
//!   admitted before cancellation normally run to completion.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::abilities::{Ability, Command};
use crate::error::{AbilityError, panic_message};
use crate::payload::Payload;

/// Executes `cmd` on `ability` once.
pub(crate) async fn run_command(
    ability: &dyn Ability,
    cmd: Command,
    timeout: Option<Duration>,
    runtime: &CancellationToken,
) -> Result<Option<Payload>, AbilityError> {
    let attempt = async {
        let fut = AssertUnwindSafe(ability.execute(cmd)).catch_unwind();
        match fut.await {
            Ok(res) => res,
            Err(panic) => Err(AbilityError::Panicked {
                info: panic_message(panic.as_ref()),
            }),
        }
    };

    let bounded = async {
        match timeout.filter(|d| *d > Duration::ZERO) {
            Some(dur) => match time::timeout(dur, attempt).await {
                Ok(res) => res,
                Err(_elapsed) => Err(AbilityError::Timeout { timeout: dur }),
            },
            None => attempt.await,
        }
    };

    tokio::select! {
        res = bounded => res,
        _ = runtime.cancelled() => Err(AbilityError::Canceled),
    }
}
