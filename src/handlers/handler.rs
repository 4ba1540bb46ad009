//! # Handler traits.
//!
//! Provides the two handler kinds an engine can invoke:
//! - [`Handler`] plain synchronous callable, runs on the engine's drain thread
//! - [`AsyncHandler`] suspend-capable callable, runs on the cooperative scheduler
//!
//! Handlers are shared as `Arc`s ([`HandlerRef`], [`AsyncHandlerRef`]). The `Arc`
//! allocation is the handler's identity: registering the same `Arc` twice is a
//! no-op, while two separately built handlers are distinct even if they wrap the
//! same code.
//!
//! [`AnyHandler`] is the explicit tagged variant used by the cooperative engine
//! to route a registration to the right registry. The routing decision is made
//! once, when the handler is registered.
//!
//! ## Failure isolation
//! A handler that returns `Err` or panics never affects other handlers or the
//! engine loop: the failure is caught at the dispatch boundary and logged.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::Event;

/// Synchronous event handler.
///
/// ### Implementation requirements
/// - Return quickly: handlers run sequentially on the drain thread, a slow
///   handler delays every event behind it.
/// - Report failures through `Err`; panics are caught but discouraged.
///
/// # Example
/// ```
/// use eventvisor::{Event, Handler, HandlerError};
///
/// struct Audit;
///
/// impl Handler for Audit {
///     fn handle(&self, event: &Event) -> Result<(), HandlerError> {
///         if event.is_timer() {
///             return Ok(());
///         }
///         // record event...
///         Ok(())
///     }
///
///     fn name(&self) -> &str { "audit" }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Processes a single event.
    fn handle(&self, event: &Event) -> Result<(), HandlerError>;

    /// Returns the handler name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Suspend-capable event handler, executed on the cooperative scheduler.
///
/// Invocations are serialized: the engine awaits one async handler to completion
/// before starting the next one.
#[async_trait]
pub trait AsyncHandler: Send + Sync + 'static {
    /// Processes a single event.
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;

    /// Returns the handler name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a synchronous handler.
pub type HandlerRef = Arc<dyn Handler>;

/// Shared handle to an asynchronous handler.
pub type AsyncHandlerRef = Arc<dyn AsyncHandler>;

/// Handler of either kind, tagged at registration time.
#[derive(Clone)]
pub enum AnyHandler {
    /// Plain callable.
    Sync(HandlerRef),
    /// Suspend-capable callable.
    Async(AsyncHandlerRef),
}

impl AnyHandler {
    /// Returns the wrapped handler's name.
    pub fn name(&self) -> &str {
        match self {
            AnyHandler::Sync(h) => h.name(),
            AnyHandler::Async(h) => h.name(),
        }
    }

    #[inline]
    pub fn is_async(&self) -> bool {
        matches!(self, AnyHandler::Async(_))
    }
}

impl From<HandlerRef> for AnyHandler {
    fn from(h: HandlerRef) -> Self {
        AnyHandler::Sync(h)
    }
}

impl From<AsyncHandlerRef> for AnyHandler {
    fn from(h: AsyncHandlerRef) -> Self {
        AnyHandler::Async(h)
    }
}

impl std::fmt::Debug for AnyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyHandler::Sync(h) => f.debug_tuple("Sync").field(&h.name()).finish(),
            AnyHandler::Async(h) => f.debug_tuple("Async").field(&h.name()).finish(),
        }
    }
}

/// Identity of a shared handler.
///
/// Compares allocation addresses only (vtable pointers are ignored, they are
/// not guaranteed unique across codegen units).
pub trait SameHandler {
    fn same_handler(&self, other: &Self) -> bool;
}

impl<T: ?Sized> SameHandler for Arc<T> {
    #[inline]
    fn same_handler(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(self) as *const (),
            Arc::as_ptr(other) as *const (),
        )
    }
}
