//! # eventvisor
//!
//! **Eventvisor** is a lightweight in-process event engine for Rust.
//!
//! Producers [`put`](Engine::put) typed events into an unbounded queue; a single
//! drain loop dispatches each event to the handlers registered for its kind,
//! then to the general handlers. A timer loop synthesizes periodic
//! [`EVENT_TIMER`] events to drive time-based behavior.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  producer #1 │   │  producer #2 │   │  timer loop  │
//!     │ put(Event)   │   │ put(Event)   │   │ every `interval`
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                  EngineCore queue (unbounded, FIFO)               │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                        ┌────────────────────┐
//!                        │     drain loop     │  (one consumer per engine)
//!                        └─────────┬──────────┘
//!                                  ▼
//!      ┌───────────────────────────────────────────────────────────┐
//!      │ dispatch(event)                                           │
//!      │   [cooperative only] async typed ─► async general         │
//!      │   sync typed[event.kind] ─► sync general                  │
//!      │   each handler isolated: Err / panic ─► logged, continue  │
//!      └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Variants
//! | Engine                 | Drain loop            | Timer loop          | Async handlers |
//! |------------------------|-----------------------|---------------------|----------------|
//! | [`ThreadedEngine`]     | dedicated thread      | dedicated thread    | no             |
//! | [`CooperativeEngine`]  | tokio blocking pool   | tokio task          | yes, serialized|
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------------|---------------------------------------------|
//! | **Engines**       | Lifecycle, enqueue, registration.                               | [`Engine`], [`ThreadedEngine`], [`CooperativeEngine`] |
//! | **Handlers**      | Sync and async handlers, closure adapters, registry.            | [`Handler`], [`AsyncHandler`], [`HandlerFn`], [`HandlerRegistry`] |
//! | **Events**        | Immutable `{kind, payload}` values, reserved timer kind.        | [`Event`], [`EVENT_TIMER`]                  |
//! | **Errors**        | Lifecycle misuse and handler failures.                          | [`EngineError`], [`HandlerError`]           |
//! | **Configuration** | Timer interval, poll timeout, thread names.                     | [`EngineConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogWriter` handler _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use eventvisor::{Engine, Event, HandlerFn, HandlerRef, ThreadedEngine, EVENT_TIMER};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ThreadedEngine::new(Duration::from_millis(100));
//!
//!     let orders: HandlerRef = HandlerFn::arc("orders", |ev: &Event| {
//!         println!("order {:?}", ev.payload::<u64>());
//!         Ok(())
//!     });
//!     let ticks: HandlerRef = HandlerFn::arc("ticks", |ev: &Event| {
//!         if ev.kind() == EVENT_TIMER {
//!             println!("tick");
//!         }
//!         Ok(())
//!     });
//!     engine.register("order.created", orders);
//!     engine.register_general(ticks);
//!
//!     engine.start()?;
//!     engine.put(Event::new("order.created").with_payload(42_u64));
//!     std::thread::sleep(Duration::from_millis(250));
//!     engine.stop()?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod handlers;

// ---- Public re-exports ----

pub use core::{CooperativeEngine, Engine, EngineConfig, ThreadedEngine};
pub use error::{EngineError, HandlerError};
pub use events::{EVENT_TIMER, Event, Payload};
pub use handlers::{
    AnyHandler, AsyncHandler, AsyncHandlerFn, AsyncHandlerRef, Handler, HandlerFn, HandlerRef,
    HandlerRegistry, SameHandler,
};

// Optional: expose a simple built-in logger handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogWriter;
