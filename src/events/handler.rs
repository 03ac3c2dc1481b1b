//! # Event handlers and their continuation decision.
//!
//! A [`Handler`] is invoked for every event of the name it subscribed to and
//! answers with a [`Flow`]:
//! - [`Flow::Continue`] keeps the subscription;
//! - [`Flow::Stop`] removes it once the current delivery has walked the full
//!   handler list.
//!
//! Returning `Err` (or panicking) does **not** unsubscribe: the failure is
//! logged by the bus and delivery continues with the next handler.
//!
//! [`HandlerFn`] wraps a closure that receives an owned [`Event`] and produces
//! a fresh future per delivery.
//!
//! ## Example
//! ```rust
//! use abilityvisor::{Event, Flow, Handler, HandlerError, HandlerFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let once = HandlerFn::arc(|ev: Event| async move {
//!     println!("first {}", ev.name());
//!     Ok::<_, HandlerError>(Flow::Stop)
//! });
//! assert_eq!(once.handle(&Event::new("tick")).await.unwrap(), Flow::Stop);
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::Event;

/// Continuation decision returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Stay subscribed.
    Continue,
    /// Unsubscribe after this delivery.
    Stop,
}

impl Flow {
    /// Maps the classic boolean convention (`true` = stop) onto [`Flow`].
    pub fn stop_if(stop: bool) -> Self {
        if stop { Flow::Stop } else { Flow::Continue }
    }
}

/// Contract for event handlers.
///
/// Handlers run on the delivering task. They may call
/// [`Supervisor::exec`](crate::Supervisor::exec), publish further events or
/// subscribe new handlers; none of this disturbs the delivery in progress.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one event.
    async fn handle(&self, event: &Event) -> Result<Flow, HandlerError>;
}

/// Function-backed handler.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<Flow, HandlerError> {
        (self.f)(event.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_if_follows_boolean_convention() {
        assert_eq!(Flow::stop_if(true), Flow::Stop);
        assert_eq!(Flow::stop_if(false), Flow::Continue);
    }

    #[tokio::test]
    async fn handler_fn_sees_event() {
        let h = HandlerFn::new(|ev: Event| async move {
            if ev.name() == "bad" {
                Err(HandlerError::fail("bad event"))
            } else {
                Ok(Flow::Continue)
            }
        });
        assert_eq!(h.handle(&Event::new("good")).await.unwrap(), Flow::Continue);
        assert!(h.handle(&Event::new("bad")).await.is_err());
    }
}
