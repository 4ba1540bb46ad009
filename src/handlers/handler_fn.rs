//! # Function-backed handlers (`HandlerFn`, `AsyncHandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&Event) -> Result<(), HandlerError>`.
//! [`AsyncHandlerFn`] wraps a closure `F: Fn(Event) -> Fut` that *creates* a new
//! future per invocation; the closure receives its own clone of the event so the
//! future can own it.
//!
//! Each `arc(..)` call builds a new handler identity. Keep the returned `Arc`
//! around to unregister it later.
//!
//! ## Example
//! ```rust
//! use eventvisor::{AsyncHandlerFn, AsyncHandlerRef, Event, HandlerError, HandlerFn, HandlerRef};
//!
//! let h: HandlerRef = HandlerFn::arc("printer", |ev: &Event| {
//!     println!("got {}", ev.kind());
//!     Ok(())
//! });
//! assert_eq!(h.name(), "printer");
//!
//! let a: AsyncHandlerRef = AsyncHandlerFn::arc("notifier", |ev: Event| async move {
//!     let _ = ev.kind();
//!     Ok::<_, HandlerError>(())
//! });
//! assert_eq!(a.name(), "notifier");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::Event;
use crate::handlers::handler::{AsyncHandler, Handler};

/// Function-backed synchronous handler.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Function-backed asynchronous handler.
#[derive(Debug)]
pub struct AsyncHandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> AsyncHandlerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    /// Creates a new function-backed async handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> AsyncHandler for AsyncHandlerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
