//! # Event handlers and their registry.
//!
//! This module provides the [`Handler`] and [`AsyncHandler`] traits, closure
//! adapters, and the [`HandlerRegistry`] every engine uses to route events.
//!
//! ## Architecture
//! ```text
//! dispatch(event)
//!     │
//!     ├──► typed[event.kind]  ──► h1.handle() ─► h2.handle() ─► ...   (registration order)
//!     │
//!     └──► general            ──► g1.handle() ─► g2.handle() ─► ...   (after all typed)
//!
//! each call: Err / panic ─► caught, logged, next handler runs
//! ```
//!
//! ## Handler kinds
//! - **Sync** ([`Handler`]) run on the engine's drain thread
//! - **Async** ([`AsyncHandler`]) run on the cooperative scheduler, one at a time
//!
//! [`AnyHandler`] tags a handler with its kind so a single registration entry
//! point can route it to the right registry.

mod handler;
mod handler_fn;
#[cfg(feature = "logging")]
mod log;
mod registry;

pub use handler::{AnyHandler, AsyncHandler, AsyncHandlerRef, Handler, HandlerRef, SameHandler};
pub use handler_fn::{AsyncHandlerFn, HandlerFn};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use registry::HandlerRegistry;
