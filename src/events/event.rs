//! # Events accepted and dispatched by the engines.
//!
//! An [`Event`] is an immutable `{kind, payload}` pair. The `kind` is a string tag
//! used to route the event to type-specific handlers; the payload is opaque to
//! the engine and recovered by handlers through [`Event::payload`].
//!
//! Every event also carries metadata that the engine never routes on:
//! - `seq`: process-wide, monotonically increasing sequence number
//! - `at`: wall-clock creation timestamp
//!
//! ## Reserved kinds
//! [`EVENT_TIMER`] is synthesized by the engine's timer loop. Timer events have
//! no payload. Caller-defined kinds must not reuse it.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, EVENT_TIMER};
//!
//! let ev = Event::new("order.created").with_payload(42_u64);
//! assert_eq!(ev.kind(), "order.created");
//! assert_eq!(ev.payload::<u64>(), Some(&42));
//! assert_eq!(ev.payload::<String>(), None);
//!
//! let tick = Event::timer();
//! assert_eq!(tick.kind(), EVENT_TIMER);
//! assert!(!tick.has_payload());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Kind of the events produced by the engine's timer loop.
pub const EVENT_TIMER: &str = "sync.timer";

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque, shareable event payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Immutable unit of notification.
///
/// Cheap to clone: the kind and payload are `Arc`-backed.
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    kind: Arc<str>,
    payload: Option<Payload>,
}

impl Event {
    /// Creates an event of the given kind with an empty payload.
    pub fn new(kind: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind: kind.into(),
            payload: None,
        }
    }

    /// Creates a timer event ([`EVENT_TIMER`], no payload).
    #[inline]
    pub fn timer() -> Self {
        Self::new(EVENT_TIMER)
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Attaches an already shared payload.
    #[inline]
    pub fn with_shared_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns the event kind used for routing.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the payload downcast to `T`, or `None` if empty or of another type.
    #[inline]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }

    /// Returns the raw shared payload.
    #[inline]
    pub fn raw_payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    #[inline]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    #[inline]
    pub fn is_timer(&self) -> bool {
        &*self.kind == EVENT_TIMER
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("kind", &self.kind)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
