//! Engine events: the data model routed through the queue.
//!
//! ## Contents
//! - [`Event`] immutable `{kind, payload}` unit with ordering metadata
//! - [`Payload`] opaque shared payload
//! - [`EVENT_TIMER`] reserved kind of the synthesized timer events
//!
//! See `core/mod.rs` for the wiring between producers, the queue and handlers.

mod event;

pub use event::{EVENT_TIMER, Event, Payload};
