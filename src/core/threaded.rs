//! # ThreadedEngine: drain and timer loops on dedicated OS threads.
//!
//! ## Architecture
//! ```text
//! producers (any thread)             <name>-drain thread           handlers
//!   put(event) ──► [unbounded queue] ──► drain_loop ──► dispatch ──► typed ─► general
//!                        ▲
//!   <name>-timer thread  │
//!     timer_loop ────────┘ put(Event::timer()) every `interval`
//! ```
//!
//! ## Rules
//! - `start()` returns immediately; both loops run until `stop()`.
//! - `stop()` joins both threads: no handler runs after it returns.
//! - `stop()` from a handler (drain thread) cannot join itself and returns
//!   [`EngineError::StopFromHandler`]; the drain thread exits after the handler.
//!   A restart meanwhile is allowed: the new drain thread first joins the old
//!   one, so handlers never run on two drain threads at once.
//! - Dropping a running engine stops it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use eventvisor::{Engine, Event, HandlerFn, HandlerRef, ThreadedEngine};
//!
//! let engine = ThreadedEngine::new(Duration::from_millis(50));
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let counter: HandlerRef = {
//!     let hits = hits.clone();
//!     HandlerFn::arc("counter", move |_ev: &Event| {
//!         hits.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     })
//! };
//! engine.register("ping", counter);
//!
//! engine.start().unwrap();
//! engine.put(Event::new("ping"));
//! std::thread::sleep(Duration::from_millis(100));
//! engine.stop().unwrap();
//!
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::config::EngineConfig;
use crate::core::dispatch::EngineCore;
use crate::core::engine::Engine;
use crate::core::shutdown::{ShutdownTrigger, shutdown_pair};
use crate::error::{EngineError, panic_message};
use crate::events::Event;
use crate::handlers::HandlerRef;

/// Worker threads of one run.
struct Workers {
    trigger: ShutdownTrigger,
    drain: JoinHandle<()>,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    current: Option<Workers>,
    /// Drain thread left running by a stop issued from one of its handlers.
    detached: Option<JoinHandle<()>>,
}

/// Event engine driven by two dedicated threads.
pub struct ThreadedEngine {
    core: Arc<EngineCore>,
    state: Mutex<State>,
}

impl ThreadedEngine {
    /// Creates a stopped engine emitting a timer event every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self::with_config(EngineConfig::new(interval))
    }

    /// Creates a stopped engine from a full configuration.
    pub fn with_config(cfg: EngineConfig) -> Self {
        Self {
            core: Arc::new(EngineCore::new(cfg)),
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.core.config()
    }

    /// Number of events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.core.pending()
    }

    /// Launches the drain and timer threads and returns immediately.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        self.core.mark_running()?;

        let (trigger, shutdown) = shutdown_pair();
        let cfg = self.core.config();

        let drain = {
            let core = Arc::clone(&self.core);
            let shutdown = shutdown.clone();
            let previous = state.detached.take();
            thread::Builder::new()
                .name(cfg.worker_name("drain"))
                .spawn(move || {
                    if let Some(previous) = previous {
                        wait_previous_drain(previous);
                    }
                    core.drain_loop(&shutdown, |event| core.dispatch(&event))
                })
        };
        let drain = match drain {
            Ok(h) => h,
            Err(e) => {
                let _ = self.core.mark_stopped();
                trigger.fire();
                return Err(e.into());
            }
        };

        let timer = {
            let core = Arc::clone(&self.core);
            thread::Builder::new()
                .name(cfg.worker_name("timer"))
                .spawn(move || core.timer_loop(&shutdown))
        };
        let timer = match timer {
            Ok(h) => h,
            Err(e) => {
                let _ = self.core.mark_stopped();
                trigger.fire();
                // The caller may be the thread this drain waits on; let it finish on its own.
                state.detached = Some(drain);
                return Err(e.into());
            }
        };

        state.current = Some(Workers {
            trigger,
            drain,
            timer,
        });
        debug!(interval = ?cfg.interval_clamped(), "threaded engine started");
        Ok(())
    }

    /// Stops the engine and joins both threads.
    pub fn stop(&self) -> Result<(), EngineError> {
        let (drain, timer) = {
            let mut state = self.lock_state();
            self.core.mark_stopped()?;
            let Some(Workers {
                trigger,
                drain,
                timer,
            }) = state.current.take()
            else {
                return Ok(());
            };
            trigger.fire();

            if thread::current().id() == drain.thread().id() {
                debug!("threaded engine stop requested from drain thread");
                state.detached = Some(drain);
                drop(state);
                join_worker("timer", timer)?;
                return Err(EngineError::StopFromHandler);
            }
            (drain, timer)
        };

        let timer_res = join_worker("timer", timer);
        let drain_res = join_worker("drain", drain);
        debug!("threaded engine stopped");
        drain_res.and(timer_res)
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Blocks until the drain thread of a previous run has exited.
fn wait_previous_drain(previous: JoinHandle<()>) {
    if let Err(e) = join_worker("drain", previous) {
        warn!(error = %e, "previous drain thread exited abnormally");
    }
}

fn join_worker(worker: &'static str, handle: JoinHandle<()>) -> Result<(), EngineError> {
    handle.join().map_err(|payload| EngineError::Worker {
        worker,
        reason: panic_message(&*payload),
    })
}

impl Engine for ThreadedEngine {
    fn start(&self) -> Result<(), EngineError> {
        ThreadedEngine::start(self)
    }

    fn stop(&self) -> Result<(), EngineError> {
        ThreadedEngine::stop(self)
    }

    fn put(&self, event: Event) {
        self.core.put(event);
    }

    fn register(&self, kind: &str, handler: HandlerRef) {
        self.core.handlers().register(kind, handler);
    }

    fn unregister(&self, kind: &str, handler: &HandlerRef) {
        self.core.handlers().unregister(kind, handler);
    }

    fn register_general(&self, handler: HandlerRef) {
        self.core.handlers().register_general(handler);
    }

    fn unregister_general(&self, handler: &HandlerRef) {
        self.core.handlers().unregister_general(handler);
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }
}

impl Drop for ThreadedEngine {
    fn drop(&mut self) {
        if self.core.is_running() {
            let _ = self.stop();
        }
    }
}
