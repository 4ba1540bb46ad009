//! # CooperativeEngine: scheduler-driven engine with asynchronous handlers.
//!
//! The engine runs as a structured group of two children on a tokio runtime:
//! - **drain worker** on the blocking pool: pops the queue and dispatches; async
//!   handlers are bridged onto the scheduler one at a time
//! - **timer task** on the scheduler: sleeps `interval`, then enqueues a timer
//!   event through [`CooperativeEngine::put_async`]
//!
//! ## Architecture
//! ```text
//! run() / run_for(deadline)
//!   │
//!   ├─► spawn_blocking ─► drain_loop ─► dispatch(event):
//!   │                                     1. async typed    ─┐ bridged, awaited
//!   │                                     2. async general  ─┘ one at a time
//!   │                                     3. sync typed
//!   │                                     4. sync general
//!   └─► spawn ─────────► timer_loop ─► put_async(Event::timer())
//!
//! exit: both children done │ deadline elapsed │ a child failed (siblings torn down)
//! ```
//!
//! ## Handler routing
//! [`register`](CooperativeEngine::register) and friends accept an
//! [`AnyHandler`] (or anything converting into one): plain handlers go to the
//! synchronous registry, async ones to the asynchronous registry. The decision
//! is made once, at registration.
//!
//! ## Rules
//! - One drain worker at a time: a run started right after `stop()` waits for
//!   the previous drain worker to finish its current handler before draining.
//! - Dropping the `run()` future (or the runtime) stops the engine.
//! - `stop()` clears the running flag and signals both children; in-flight
//!   handler invocations complete, nothing is force-cancelled.
//! - `stop()` does not wait; await [`join`](CooperativeEngine::join) (after
//!   `start()`) or the `run()` future to observe the actual exit.
//! - Requires a tokio runtime; a current-thread runtime is enough since the
//!   drain worker lives on the blocking pool.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use eventvisor::{AsyncHandlerFn, AsyncHandlerRef, CooperativeEngine, Event, HandlerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = CooperativeEngine::new(Duration::from_millis(100));
//!
//!     let notify: AsyncHandlerRef = AsyncHandlerFn::arc("notify", |ev: Event| async move {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         println!("notified: {}", ev.kind());
//!         Ok::<_, HandlerError>(())
//!     });
//!     engine.register("order.created", notify);
//!     engine.put(Event::new("order.created"));
//!
//!     // Runs until the deadline, then stops and waits for both loops.
//!     engine.run_for(Duration::from_millis(250)).await?;
//!     Ok(())
//! }
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::core::bridge::Bridge;
use crate::core::config::EngineConfig;
use crate::core::dispatch::EngineCore;
use crate::core::engine::Engine;
use crate::core::shutdown::{Shutdown, ShutdownTrigger, shutdown_pair};
use crate::error::{EngineError, panic_message};
use crate::events::Event;
use crate::handlers::{AnyHandler, AsyncHandlerRef, HandlerRef, HandlerRegistry};

/// Lifecycle bookkeeping, guarded by one mutex.
#[derive(Default)]
struct Lifecycle {
    /// Incremented on every start; a finishing run only halts its own generation.
    generation: u64,
    trigger: Option<ShutdownTrigger>,
    /// Runs spawned by `start()` and not yet joined.
    spawned: Vec<JoinHandle<Result<(), EngineError>>>,
}

struct Inner {
    core: EngineCore,
    async_handlers: HandlerRegistry<AsyncHandlerRef>,
    lifecycle: Mutex<Lifecycle>,
    /// Single permit, held by the live drain worker.
    drain_slot: Arc<Semaphore>,
    #[cfg(test)]
    timer_fault: std::sync::atomic::AtomicBool,
}

impl Inner {
    /// Async typed → async general → sync typed → sync general.
    fn dispatch(&self, bridge: &Bridge, event: &Event) {
        if let Some(typed) = self.async_handlers.typed(event.kind()) {
            for handler in &typed {
                bridge.invoke(handler, event);
            }
        }
        for handler in &self.async_handlers.general() {
            bridge.invoke(handler, event);
        }
        self.core.dispatch(event);
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Event engine driven by a tokio runtime, with support for async handlers.
///
/// Cheap to clone; clones share the same queue, registries and lifecycle.
#[derive(Clone)]
pub struct CooperativeEngine {
    inner: Arc<Inner>,
}

impl CooperativeEngine {
    /// Creates a stopped engine emitting a timer event every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self::with_config(EngineConfig::new(interval))
    }

    /// Creates a stopped engine from a full configuration.
    pub fn with_config(cfg: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                core: EngineCore::new(cfg),
                async_handlers: HandlerRegistry::new(),
                lifecycle: Mutex::new(Lifecycle::default()),
                drain_slot: Arc::new(Semaphore::new(1)),
                #[cfg(test)]
                timer_fault: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.inner.core.config()
    }

    /// Number of events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.inner.core.pending()
    }

    pub fn is_running(&self) -> bool {
        self.inner.core.is_running()
    }

    // ---- Registration ----

    /// Registers a handler for `kind`, routed by its kind (sync or async).
    pub fn register(&self, kind: &str, handler: impl Into<AnyHandler>) {
        match handler.into() {
            AnyHandler::Sync(h) => self.inner.core.handlers().register(kind, h),
            AnyHandler::Async(h) => self.inner.async_handlers.register(kind, h),
        }
    }

    /// Unregisters a handler from `kind`, routed by its kind.
    pub fn unregister(&self, kind: &str, handler: impl Into<AnyHandler>) {
        match handler.into() {
            AnyHandler::Sync(h) => self.inner.core.handlers().unregister(kind, &h),
            AnyHandler::Async(h) => self.inner.async_handlers.unregister(kind, &h),
        }
    }

    /// Registers a handler for every kind, routed by its kind.
    pub fn register_general(&self, handler: impl Into<AnyHandler>) {
        match handler.into() {
            AnyHandler::Sync(h) => self.inner.core.handlers().register_general(h),
            AnyHandler::Async(h) => self.inner.async_handlers.register_general(h),
        }
    }

    /// Unregisters a general handler, routed by its kind.
    pub fn unregister_general(&self, handler: impl Into<AnyHandler>) {
        match handler.into() {
            AnyHandler::Sync(h) => self.inner.core.handlers().unregister_general(&h),
            AnyHandler::Async(h) => self.inner.async_handlers.unregister_general(&h),
        }
    }

    /// Synchronous registry (plain handlers).
    pub fn sync_handlers(&self) -> &HandlerRegistry<HandlerRef> {
        self.inner.core.handlers()
    }

    /// Asynchronous registry (suspend-capable handlers).
    pub fn async_handlers(&self) -> &HandlerRegistry<AsyncHandlerRef> {
        &self.inner.async_handlers
    }

    // ---- Enqueue ----

    /// Enqueues an event from any thread or synchronous context.
    pub fn put(&self, event: Event) {
        self.inner.core.put(event);
    }

    /// Enqueues an event from the blocking pool, suspending the calling task until done.
    pub async fn put_async(&self, event: Event) {
        let inner = Arc::clone(&self.inner);
        if let Err(e) = tokio::task::spawn_blocking(move || inner.core.put(event)).await {
            warn!(error = %e, "deferred enqueue did not complete");
        }
    }

    // ---- Lifecycle ----

    /// Runs the engine until it is stopped or one of its children fails.
    ///
    /// This is the scheduled entry point: it does not return before both the
    /// drain worker and the timer task have exited.
    pub async fn run(&self) -> Result<(), EngineError> {
        let (generation, shutdown) = self.begin()?;
        self.drive(generation, shutdown, None).await
    }

    /// Like [`run`](Self::run), bounded by a deadline: once it elapses the
    /// engine is stopped and both children are awaited.
    pub async fn run_for(&self, deadline: Duration) -> Result<(), EngineError> {
        let (generation, shutdown) = self.begin()?;
        self.drive(generation, shutdown, Some(Instant::now() + deadline))
            .await
    }

    /// Spawns [`run`](Self::run) on the current runtime and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (generation, shutdown) = self.begin()?;

        let engine = self.clone();
        let spawned = runtime.spawn(async move { engine.drive(generation, shutdown, None).await });
        self.inner.lifecycle().spawned.push(spawned);
        Ok(())
    }

    /// Clears the running flag and signals both children; does not wait for them.
    pub fn stop(&self) -> Result<(), EngineError> {
        if self.halt(None) {
            debug!("cooperative engine stop requested");
            Ok(())
        } else {
            Err(EngineError::NotRunning)
        }
    }

    /// Waits for every run spawned by [`start`](Self::start) to finish.
    ///
    /// Returns the first failure, if any; immediately `Ok` if nothing was spawned.
    pub async fn join(&self) -> Result<(), EngineError> {
        let spawned = std::mem::take(&mut self.inner.lifecycle().spawned);
        let mut outcome = Ok(());
        for handle in spawned {
            let res = handle.await.unwrap_or_else(|e| {
                Err(EngineError::Worker {
                    worker: "run",
                    reason: e.to_string(),
                })
            });
            if outcome.is_ok() {
                outcome = res;
            }
        }
        outcome
    }

    /// Stopped → Running; returns the generation and shutdown signal of the new run.
    fn begin(&self) -> Result<(u64, Shutdown), EngineError> {
        let mut lifecycle = self.inner.lifecycle();
        self.inner.core.mark_running()?;

        let (trigger, shutdown) = shutdown_pair();
        lifecycle.generation += 1;
        lifecycle.trigger = Some(trigger);
        debug!(
            generation = lifecycle.generation,
            interval = ?self.config().interval_clamped(),
            "cooperative engine started"
        );
        Ok((lifecycle.generation, shutdown))
    }

    /// Running → Stopped and fires the shutdown signal.
    ///
    /// With `Some(generation)`, only halts if that run is still the current one.
    fn halt(&self, generation: Option<u64>) -> bool {
        let mut lifecycle = self.inner.lifecycle();
        if generation.is_some_and(|g| g != lifecycle.generation) {
            return false;
        }
        let was_running = self.inner.core.mark_stopped().is_ok();
        if let Some(trigger) = lifecycle.trigger.take() {
            trigger.fire();
        }
        was_running
    }

    /// Supervises the two children of one run.
    ///
    /// Halts its generation on every exit path, including being dropped.
    async fn drive(
        &self,
        generation: u64,
        shutdown: Shutdown,
        deadline: Option<Instant>,
    ) -> Result<(), EngineError> {
        let _halt = HaltOnDrop {
            engine: self,
            generation,
        };

        let expired = async {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        // A drain worker from a previous run may still be inside a handler.
        let slot = Arc::clone(&self.inner.drain_slot).acquire_owned();
        let permit = tokio::select! {
            res = slot => match res {
                Ok(permit) => permit,
                Err(_) => {
                    return Err(EngineError::Worker {
                        worker: "drain",
                        reason: "drain slot closed".to_string(),
                    });
                }
            },
            _ = shutdown.fired() => return Ok(()),
            _ = &mut expired => {
                debug!(generation, "cooperative engine deadline elapsed before draining");
                return Ok(());
            }
        };

        let mut children = JoinSet::new();
        self.spawn_drain(&mut children, &shutdown, permit);
        self.spawn_timer(&mut children, &shutdown);

        let mut outcome = Ok(());
        let mut expired_seen = false;
        loop {
            tokio::select! {
                _ = &mut expired, if !expired_seen => {
                    expired_seen = true;
                    debug!(generation, "cooperative engine deadline elapsed");
                    self.halt(Some(generation));
                }
                next = children.join_next() => match next {
                    None => break,
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(e))) => {
                        warn!(error = %e, "cooperative engine child failed; tearing down");
                        self.halt(Some(generation));
                        children.abort_all();
                        if outcome.is_ok() {
                            outcome = Err(e);
                        }
                    }
                    // Aborted during teardown.
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => {
                        self.halt(Some(generation));
                        children.abort_all();
                        if outcome.is_ok() {
                            outcome = Err(EngineError::Worker {
                                worker: "child",
                                reason: e.to_string(),
                            });
                        }
                    }
                },
            }
        }

        debug!(generation, "cooperative engine stopped");
        outcome
    }

    fn spawn_drain(
        &self,
        children: &mut JoinSet<Result<(), EngineError>>,
        shutdown: &Shutdown,
        permit: OwnedSemaphorePermit,
    ) {
        let inner = Arc::clone(&self.inner);
        let shutdown = shutdown.clone();
        let bridge = Bridge::new(Handle::current());

        children.spawn_blocking(move || {
            // Released only once this worker has left the drain loop.
            let _permit = permit;
            panic::catch_unwind(AssertUnwindSafe(|| {
                inner
                    .core
                    .drain_loop(&shutdown, |event| inner.dispatch(&bridge, &event))
            }))
            .map_err(|payload| EngineError::Worker {
                worker: "drain",
                reason: panic_message(&*payload),
            })
        });
    }

    fn spawn_timer(&self, children: &mut JoinSet<Result<(), EngineError>>, shutdown: &Shutdown) {
        let engine = self.clone();
        let shutdown = shutdown.clone();

        children.spawn(async move {
            AssertUnwindSafe(engine.timer_loop(&shutdown))
                .catch_unwind()
                .await
                .map_err(|payload| EngineError::Worker {
                    worker: "timer",
                    reason: panic_message(&*payload),
                })
        });
    }

    /// Sleeps `interval` (or until shutdown), then enqueues a timer event.
    async fn timer_loop(&self, shutdown: &Shutdown) {
        #[cfg(test)]
        if self.inner.timer_fault.load(std::sync::atomic::Ordering::SeqCst) {
            panic!("injected timer fault");
        }
        let interval = self.config().interval_clamped();
        while self.is_running() && !shutdown.is_fired() {
            tokio::select! {
                _ = shutdown.fired() => break,
                _ = time::sleep(interval) => {}
            }
            self.put_async(Event::timer()).await;
        }
    }
}

/// Halts one generation when its `drive` future ends or is dropped.
struct HaltOnDrop<'a> {
    engine: &'a CooperativeEngine,
    generation: u64,
}

impl Drop for HaltOnDrop<'_> {
    fn drop(&mut self) {
        self.engine.halt(Some(self.generation));
    }
}

impl Engine for CooperativeEngine {
    fn start(&self) -> Result<(), EngineError> {
        CooperativeEngine::start(self)
    }

    fn stop(&self) -> Result<(), EngineError> {
        CooperativeEngine::stop(self)
    }

    fn put(&self, event: Event) {
        CooperativeEngine::put(self, event);
    }

    fn register(&self, kind: &str, handler: HandlerRef) {
        CooperativeEngine::register(self, kind, handler);
    }

    fn unregister(&self, kind: &str, handler: &HandlerRef) {
        CooperativeEngine::unregister(self, kind, Arc::clone(handler));
    }

    fn register_general(&self, handler: HandlerRef) {
        CooperativeEngine::register_general(self, handler);
    }

    fn unregister_general(&self, handler: &HandlerRef) {
        CooperativeEngine::unregister_general(self, Arc::clone(handler));
    }

    fn is_running(&self) -> bool {
        CooperativeEngine::is_running(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::HandlerError;
    use crate::events::EVENT_TIMER;
    use crate::handlers::{AsyncHandlerFn, HandlerFn};

    type Trace = Arc<Mutex<Vec<String>>>;

    fn engine(interval_ms: u64) -> CooperativeEngine {
        CooperativeEngine::with_config(
            EngineConfig::new(Duration::from_millis(interval_ms))
                .with_poll_timeout(Duration::from_millis(20)),
        )
    }

    fn sync_recorder(trace: &Trace, label: &'static str) -> HandlerRef {
        let trace = trace.clone();
        HandlerFn::arc(label, move |_ev: &Event| {
            trace.lock().unwrap().push(label.to_string());
            Ok(())
        })
    }

    fn async_recorder(trace: &Trace, label: &'static str) -> AsyncHandlerRef {
        let trace = trace.clone();
        AsyncHandlerFn::arc(label, move |_ev: Event| {
            let trace = trace.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                trace.lock().unwrap().push(label.to_string());
                Ok::<_, HandlerError>(())
            }
        })
    }

    #[test]
    fn registration_routes_by_handler_kind() {
        let engine = engine(1000);
        let trace = Trace::default();
        let s = sync_recorder(&trace, "s");
        let a = async_recorder(&trace, "a");

        engine.register("k", s.clone());
        engine.register("k", a.clone());
        engine.register_general(a.clone());
        engine.register_general(a.clone());

        assert_eq!(engine.sync_handlers().typed_len("k"), 1);
        assert_eq!(engine.async_handlers().typed_len("k"), 1);
        assert_eq!(engine.async_handlers().general_len(), 1);
        assert_eq!(engine.sync_handlers().general_len(), 0);

        engine.unregister("k", a.clone());
        engine.unregister_general(a);
        assert!(engine.async_handlers().is_empty());
        assert!(engine.sync_handlers().has_typed("k"));

        engine.unregister("k", s);
        assert!(engine.sync_handlers().is_empty());
    }

    #[tokio::test]
    async fn dispatch_order_is_async_then_sync() {
        let engine = engine(1000);
        let trace = Trace::default();

        engine.register_general(sync_recorder(&trace, "sync-general"));
        engine.register_general(async_recorder(&trace, "async-general"));
        engine.register("k", sync_recorder(&trace, "sync-typed"));
        engine.register("k", async_recorder(&trace, "async-typed-1"));
        engine.register("k", async_recorder(&trace, "async-typed-2"));

        engine.put(Event::new("k"));
        engine.run_for(Duration::from_millis(200)).await.unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            [
                "async-typed-1",
                "async-typed-2",
                "async-general",
                "sync-typed",
                "sync-general"
            ]
        );
    }

    #[tokio::test]
    async fn async_handler_completes_before_sync_general_runs() {
        let engine = engine(1000);
        let marks: Arc<Mutex<Vec<(&'static str, std::time::Instant)>>> = Arc::default();

        let m = marks.clone();
        engine.register(
            "k",
            AsyncHandlerFn::arc("slow", move |_ev: Event| {
                let m = m.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    m.lock().unwrap().push(("async-done", std::time::Instant::now()));
                    Ok::<_, HandlerError>(())
                }
            }) as AsyncHandlerRef,
        );
        let m = marks.clone();
        engine.register_general(HandlerFn::arc("general", move |_ev: &Event| {
            m.lock().unwrap().push(("sync-start", std::time::Instant::now()));
            Ok(())
        }) as HandlerRef);

        engine.put(Event::new("k"));
        engine.run_for(Duration::from_millis(200)).await.unwrap();

        let marks = marks.lock().unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].0, "async-done");
        assert_eq!(marks[1].0, "sync-start");
        assert!(marks[0].1 <= marks[1].1);
    }

    #[tokio::test]
    async fn async_handlers_never_overlap() {
        let engine = engine(1000);
        let active = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        for name in ["first", "second"] {
            let active = active.clone();
            let overlaps = overlaps.clone();
            let handler: AsyncHandlerRef = AsyncHandlerFn::arc(name, move |_ev: Event| {
                let active = active.clone();
                let overlaps = overlaps.clone();
                async move {
                    if active.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(())
                }
            });
            engine.register_general(handler);
        }

        for _ in 0..5 {
            engine.put(Event::new("k"));
        }
        engine.run_for(Duration::from_millis(300)).await.unwrap();

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_async_handler_is_isolated() {
        let engine = engine(1000);
        let trace = Trace::default();

        let failing: AsyncHandlerRef = AsyncHandlerFn::arc("failing", |_ev: Event| async move {
            Err::<(), _>(HandlerError::fail("nope"))
        });
        let panicking: AsyncHandlerRef = AsyncHandlerFn::arc("panicking", |_ev: Event| async move {
            if true {
                panic!("async handler exploded");
            }
            Ok::<_, HandlerError>(())
        });
        engine.register("k", failing);
        engine.register("k", panicking);
        engine.register("k", async_recorder(&trace, "after"));
        engine.register_general(sync_recorder(&trace, "general"));

        engine.put(Event::new("k"));
        engine.run_for(Duration::from_millis(200)).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), ["after", "general"]);
    }

    #[tokio::test]
    async fn timer_events_are_generated() {
        let engine = engine(50);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        engine.register(
            EVENT_TIMER,
            AsyncHandlerFn::arc("ticks", move |ev: Event| {
                let c = c.clone();
                async move {
                    if ev.is_timer() && !ev.has_payload() {
                        c.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok::<_, HandlerError>(())
                }
            }) as AsyncHandlerRef,
        );

        engine.run_for(Duration::from_millis(300)).await.unwrap();
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn start_stop_join_lifecycle() {
        let engine = engine(1000);
        let trace = Trace::default();
        engine.register("k", sync_recorder(&trace, "k"));

        assert!(matches!(engine.stop(), Err(EngineError::NotRunning)));
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));
        assert!(matches!(engine.run().await, Err(EngineError::AlreadyRunning)));

        engine.put_async(Event::new("k")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        engine.stop().unwrap();
        engine.join().await.unwrap();
        assert!(!engine.is_running());
        assert_eq!(*trace.lock().unwrap(), ["k"]);

        // restartable
        engine.start().unwrap();
        engine.stop().unwrap();
        engine.join().await.unwrap();
        assert!(engine.join().await.is_ok());
    }

    #[tokio::test]
    async fn stop_from_a_handler_ends_run() {
        let engine = engine(1000);
        let e = engine.clone();
        engine.register(
            "halt",
            HandlerFn::arc("halt", move |_ev: &Event| {
                let _ = e.stop();
                Ok(())
            }) as HandlerRef,
        );

        engine.put(Event::new("halt"));
        tokio::time::timeout(Duration::from_secs(5), engine.run())
            .await
            .expect("run should end after stop")
            .unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn engine_trait_routes_sync_handlers() {
        let engine = engine(1000);
        let trace = Trace::default();
        let h = sync_recorder(&trace, "via-trait");

        let dyn_engine: &dyn Engine = &engine;
        dyn_engine.register("k", h.clone());
        dyn_engine.put(Event::new("k"));
        engine.run_for(Duration::from_millis(100)).await.unwrap();
        dyn_engine.unregister("k", &h);

        assert_eq!(*trace.lock().unwrap(), ["via-trait"]);
        assert!(engine.sync_handlers().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_during_a_slow_handler_keeps_a_single_drain() {
        let engine = engine(1000);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let (a, p, d) = (active.clone(), peak.clone(), done.clone());
        engine.register(
            "slow",
            AsyncHandlerFn::arc("slow", move |_ev: Event| {
                let (a, p, d) = (a.clone(), p.clone(), d.clone());
                async move {
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    a.fetch_sub(1, Ordering::SeqCst);
                    d.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(())
                }
            }) as AsyncHandlerRef,
        );
        engine.put(Event::new("slow"));
        engine.put(Event::new("slow"));

        engine.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop().unwrap();
        engine.start().unwrap();

        tokio::time::sleep(Duration::from_millis(700)).await;
        engine.stop().unwrap();
        engine.join().await.unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(engine.pending(), 0);
    }

    #[test]
    fn dropping_the_runtime_stops_a_started_engine() {
        let engine = engine(1000);
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            engine.start().unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        });
        assert!(engine.is_running());

        // Must not hang on the blocking drain worker.
        rt.shutdown_timeout(Duration::from_secs(5));
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn dropping_the_run_future_stops_the_engine() {
        let engine = engine(1000);
        let trace = Trace::default();
        engine.register("k", sync_recorder(&trace, "k"));

        let res = tokio::time::timeout(Duration::from_millis(50), engine.run()).await;
        assert!(res.is_err());
        assert!(!engine.is_running());

        // The next run picks up the slot once the old drain worker has left.
        engine.put(Event::new("k"));
        engine.run_for(Duration::from_millis(150)).await.unwrap();
        assert_eq!(*trace.lock().unwrap(), ["k"]);
    }

    #[tokio::test]
    async fn child_failure_tears_down_the_run() {
        let engine = engine(1000);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        engine.register_general(HandlerFn::arc("count", move |_ev: &Event| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }) as HandlerRef);
        engine.inner.timer_fault.store(true, Ordering::SeqCst);

        let res = tokio::time::timeout(Duration::from_secs(5), engine.run())
            .await
            .expect("run should end once a child fails");
        match res {
            Err(EngineError::Worker { worker, reason }) => {
                assert_eq!(worker, "timer");
                assert!(reason.contains("injected timer fault"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!engine.is_running());

        // The drain sibling has exited: nothing consumes the queue anymore.
        engine.put(Event::new("late"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(engine.pending(), 1);
    }

    #[test]
    fn start_outside_runtime_is_reported() {
        let engine = engine(1000);
        assert!(matches!(engine.start(), Err(EngineError::NoRuntime)));
        assert!(!engine.is_running());
    }
}
