//! # Per-run shutdown signal.
//!
//! [`shutdown_pair`] creates a [`ShutdownTrigger`] owned by the engine and a
//! cloneable [`Shutdown`] handed to every loop of one run.
//!
//! The signal has two faces, one per scheduling model:
//! - **threads** block on a crossbeam channel that is never written to; firing
//!   the trigger drops the sender, which wakes every `select!`/`recv_timeout`
//! - **scheduled tasks** await a [`CancellationToken`]
//!
//! A fresh pair is created on every start, so loops left over from a previous
//! run observe their own (fired) signal even after the engine is restarted.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio_util::sync::CancellationToken;

/// Fires the shutdown of one run. Consumed on use.
pub(crate) struct ShutdownTrigger {
    tx: Sender<()>,
    token: CancellationToken,
}

impl ShutdownTrigger {
    pub(crate) fn fire(self) {
        self.token.cancel();
        drop(self.tx);
    }
}

/// Observer side of the shutdown of one run.
#[derive(Clone)]
pub(crate) struct Shutdown {
    rx: Receiver<()>,
    token: CancellationToken,
}

impl Shutdown {
    /// Channel that becomes ready (disconnected) once shutdown fires.
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    #[inline]
    pub(crate) fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Blocks the current thread for `timeout`; returns early with `true` if shutdown fires.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Completes once shutdown fires.
    pub(crate) async fn fired(&self) {
        self.token.cancelled().await
    }
}

pub(crate) fn shutdown_pair() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    let token = CancellationToken::new();
    (
        ShutdownTrigger {
            tx,
            token: token.clone(),
        },
        Shutdown { rx, token },
    )
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn wait_times_out_while_not_fired() {
        let (_trigger, shutdown) = shutdown_pair();
        assert!(!shutdown.wait_timeout(Duration::from_millis(10)));
        assert!(!shutdown.is_fired());
    }

    #[test]
    fn fire_wakes_a_blocked_thread() {
        let (trigger, shutdown) = shutdown_pair();
        let waiter = std::thread::spawn(move || {
            let started = Instant::now();
            let fired = shutdown.wait_timeout(Duration::from_secs(10));
            (fired, started.elapsed())
        });

        std::thread::sleep(Duration::from_millis(20));
        trigger.fire();

        let (fired, waited) = waiter.join().unwrap();
        assert!(fired);
        assert!(waited < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn fire_completes_async_waiters() {
        let (trigger, shutdown) = shutdown_pair();
        let observer = shutdown.clone();
        let task = tokio::spawn(async move { observer.fired().await });

        trigger.fire();
        task.await.unwrap();
        assert!(shutdown.is_fired());
        assert!(shutdown.wait_timeout(Duration::from_secs(10)));
    }
}
