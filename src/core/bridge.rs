//! # Thread → scheduler handoff for asynchronous handlers.
//!
//! The cooperative engine drains its queue on a blocking worker thread, but
//! async handlers must run on the scheduler. [`Bridge`] performs one handoff per
//! invocation:
//!
//! ```text
//! drain thread                         scheduler
//!   call(handler, event)
//!     ├─ oneshot::channel()
//!     ├─ runtime.spawn(fut) ─────────►  handler.handle(&event).await
//!     │                                   └─ catch_unwind
//!     └─ rx.blocking_recv()  ◄──────────  tx.send(result)
//! ```
//!
//! The drain thread is suspended until that single invocation completes, so
//! async handlers never run concurrently with each other.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::core::dispatch::report_failure;
use crate::error::HandlerError;
use crate::events::Event;
use crate::handlers::AsyncHandlerRef;

pub(crate) struct Bridge {
    runtime: Handle,
}

impl Bridge {
    pub(crate) fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Runs `handler` on the scheduler and blocks the calling thread until it completes.
    ///
    /// Must be called from a thread that is not driving the scheduler.
    pub(crate) fn call(&self, handler: &AsyncHandlerRef, event: &Event) -> Result<(), HandlerError> {
        let (tx, rx) = oneshot::channel();
        let handler = Arc::clone(handler);
        let event = event.clone();

        self.runtime.spawn(async move {
            let res = AssertUnwindSafe(handler.handle(&event))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));
            let _ = tx.send(res);
        });

        // Sender dropped without a result: the task was dropped by a shutting-down runtime.
        rx.blocking_recv().unwrap_or(Err(HandlerError::Canceled))
    }

    /// Like [`call`](Self::call), but failures are logged instead of returned.
    pub(crate) fn invoke(&self, handler: &AsyncHandlerRef, event: &Event) {
        if let Err(err) = self.call(handler, event) {
            report_failure(handler.name(), event, &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::handlers::AsyncHandlerFn;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn call_waits_for_the_async_handler() {
        let handler: AsyncHandlerRef = AsyncHandlerFn::arc("slow", |ev: Event| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            match ev.payload::<&str>() {
                Some(&"ok") => Ok(()),
                _ => Err(HandlerError::fail("bad payload")),
            }
        });

        let bridge = Bridge::new(Handle::current());
        let res = tokio::task::spawn_blocking(move || {
            let started = std::time::Instant::now();
            let ok = bridge.call(&handler, &Event::new("k").with_payload("ok"));
            let bad = bridge.call(&handler, &Event::new("k"));
            (ok, bad, started.elapsed())
        })
        .await
        .unwrap();

        assert_eq!(res.0, Ok(()));
        assert_eq!(res.1, Err(HandlerError::fail("bad payload")));
        assert!(res.2 >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn panics_are_reported_as_errors() {
        let handler: AsyncHandlerRef = AsyncHandlerFn::arc("boom", |_ev: Event| async move {
            tokio::task::yield_now().await;
            if true {
                panic!("async boom");
            }
            Ok::<_, HandlerError>(())
        });

        let bridge = Bridge::new(Handle::current());
        let res = tokio::task::spawn_blocking(move || bridge.call(&handler, &Event::new("k")))
            .await
            .unwrap();

        assert_eq!(
            res,
            Err(HandlerError::Panicked {
                info: "async boom".into()
            })
        );
    }
}
