//! # Engine contract shared by both variants.
//!
//! [`Engine`] is the caller-facing surface: lifecycle, enqueue and synchronous
//! handler registration. [`ThreadedEngine`](crate::ThreadedEngine) and
//! [`CooperativeEngine`](crate::CooperativeEngine) implement it independently,
//! both composed around the same dispatch core.
//!
//! ## Lifecycle
//! ```text
//! Stopped ──start()──► Running ──stop()──► Stopped
//!    │                    │
//!    └─ stop()  → Err(NotRunning)
//!                         └─ start() → Err(AlreadyRunning)
//! ```
//! Misuse is reported, never silently corrupts worker state. Engines can be
//! restarted after a stop.

use crate::error::EngineError;
use crate::events::Event;
use crate::handlers::HandlerRef;

/// In-process event engine.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use eventvisor::{Engine, Event, HandlerFn, HandlerRef, ThreadedEngine};
///
/// fn wire(engine: &dyn Engine) {
///     let h: HandlerRef = HandlerFn::arc("orders", |ev: &Event| {
///         println!("order event: {}", ev.kind());
///         Ok(())
///     });
///     engine.register("order.created", h);
///     engine.put(Event::new("order.created"));
/// }
///
/// let engine = ThreadedEngine::new(Duration::from_secs(1));
/// wire(&engine);
/// ```
pub trait Engine: Send + Sync {
    /// Starts draining the queue and generating timer events.
    fn start(&self) -> Result<(), EngineError>;

    /// Clears the running flag and signals the loops to exit.
    fn stop(&self) -> Result<(), EngineError>;

    /// Enqueues an event. Safe from any thread, including from inside a handler.
    fn put(&self, event: Event);

    /// Registers `handler` for events of `kind` (no-op if already registered).
    fn register(&self, kind: &str, handler: HandlerRef);

    /// Unregisters `handler` from `kind` (no-op if absent).
    fn unregister(&self, kind: &str, handler: &HandlerRef);

    /// Registers `handler` for every event kind (no-op if already registered).
    fn register_general(&self, handler: HandlerRef);

    /// Unregisters a general handler (no-op if absent).
    fn unregister_general(&self, handler: &HandlerRef);

    /// Returns true between a successful `start()` and the next `stop()`.
    fn is_running(&self) -> bool;
}
