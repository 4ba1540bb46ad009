//! # Engine core: queue, running flag, dispatch and loops.
//!
//! [`EngineCore`] is the shared helper both engine variants are composed of.
//! It owns:
//! - an unbounded MPSC queue of [`Event`]s (many producers, one drain loop)
//! - the running flag
//! - the synchronous [`HandlerRegistry`]
//!
//! and defines the algorithms; the variants only decide *where* the loops run.
//!
//! ## Dispatch order
//! ```text
//! dispatch(event):
//!   1. typed[event.kind]   in registration order, sequentially
//!   2. general             in registration order, sequentially
//! ```
//! A general handler always observes an event after every typed handler for it.
//!
//! ## Loops
//! ```text
//! drain loop:                              timer loop:
//!   while running && !shutdown {             while running && !shutdown {
//!     select! {                                wait(interval) or shutdown
//!       queue    -> dispatch(event)            put(Event::timer())
//!       shutdown -> break                    }
//!       timeout  -> re-check flag
//!     }
//!   }
//! ```
//!
//! ## Rules
//! - Handler failures (`Err` or panic) are isolated per handler and logged.
//! - An empty queue pop is not an error, only a chance to re-check the flag.
//! - Events left in the queue at stop are kept for the next run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, select};
use tracing::warn;

use crate::core::config::EngineConfig;
use crate::core::shutdown::Shutdown;
use crate::error::{EngineError, HandlerError};
use crate::events::Event;
use crate::handlers::{HandlerRef, HandlerRegistry};

pub(crate) struct EngineCore {
    cfg: EngineConfig,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    running: AtomicBool,
    handlers: HandlerRegistry<HandlerRef>,
}

impl EngineCore {
    pub(crate) fn new(cfg: EngineConfig) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            cfg,
            tx,
            rx,
            running: AtomicBool::new(false),
            handlers: HandlerRegistry::new(),
        }
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub(crate) fn handlers(&self) -> &HandlerRegistry<HandlerRef> {
        &self.handlers
    }

    /// Enqueues an event; never blocks.
    pub(crate) fn put(&self, event: Event) {
        // The receiver lives in `self`, so the channel cannot be disconnected here.
        let _ = self.tx.send(event);
    }

    /// Number of events waiting in the queue.
    pub(crate) fn pending(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stopped → Running, or `AlreadyRunning`.
    pub(crate) fn mark_running(&self) -> Result<(), EngineError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| EngineError::AlreadyRunning)
    }

    /// Running → Stopped, or `NotRunning`.
    pub(crate) fn mark_stopped(&self) -> Result<(), EngineError> {
        self.running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| EngineError::NotRunning)
    }

    #[inline]
    fn keep_running(&self, shutdown: &Shutdown) -> bool {
        self.is_running() && !shutdown.is_fired()
    }

    /// Two-phase synchronous dispatch: typed handlers, then general handlers.
    pub(crate) fn dispatch(&self, event: &Event) {
        if let Some(typed) = self.handlers.typed(event.kind()) {
            for handler in &typed {
                invoke(handler, event);
            }
        }
        for handler in &self.handlers.general() {
            invoke(handler, event);
        }
    }

    /// Blocks on the queue and hands every dequeued event to `dispatch` until shutdown.
    pub(crate) fn drain_loop(&self, shutdown: &Shutdown, mut dispatch: impl FnMut(Event)) {
        let poll = self.cfg.poll_timeout_clamped();
        while self.keep_running(shutdown) {
            select! {
                recv(self.rx) -> msg => match msg {
                    Ok(event) => dispatch(event),
                    Err(_) => break,
                },
                recv(shutdown.receiver()) -> _ => break,
                default(poll) => {}
            }
        }
    }

    /// Sleeps `interval`, then enqueues a timer event; repeats until shutdown.
    pub(crate) fn timer_loop(&self, shutdown: &Shutdown) {
        let interval = self.cfg.interval_clamped();
        while self.keep_running(shutdown) {
            if shutdown.wait_timeout(interval) {
                break;
            }
            self.put(Event::timer());
        }
    }
}

/// Invokes one handler with panic isolation; failures are logged, never propagated.
pub(crate) fn invoke(handler: &HandlerRef, event: &Event) {
    let res = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event)))
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));
    if let Err(err) = res {
        report_failure(handler.name(), event, &err);
    }
}

pub(crate) fn report_failure(handler: &str, event: &Event, err: &HandlerError) {
    warn!(
        handler,
        kind = event.kind(),
        seq = event.seq,
        label = err.as_label(),
        error = %err,
        "handler failed"
    );
}
