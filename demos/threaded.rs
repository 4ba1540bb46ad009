//! # Example: threaded
//!
//! Runs a [`ThreadedEngine`] with two producer threads, one typed handler and
//! one general handler.
//!
//! Shows how to:
//! - Register typed and general handlers built from closures.
//! - Enqueue events from several threads while the engine is running.
//! - Observe timer events at a fixed interval.
//! - Unregister a handler at runtime and stop the engine.
//!
//! ## Flow
//! ```text
//! producer-a ──┐
//! producer-b ──┼─► put(Event) ──► queue ──► drain thread ──► "order" handler ──► audit handler
//! timer      ──┘                                         └─► (timer) audit handler
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example threaded
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use eventvisor::{Engine, EngineConfig, Event, HandlerError, HandlerFn, HandlerRef, ThreadedEngine};

fn main() -> anyhow::Result<()> {
    let cfg = EngineConfig::new(Duration::from_millis(200)).with_thread_name("demo");
    let engine = Arc::new(ThreadedEngine::with_config(cfg));

    let orders = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::new(AtomicUsize::new(0));

    let order_handler: HandlerRef = {
        let orders = Arc::clone(&orders);
        HandlerFn::arc("orders", move |ev: &Event| {
            let Some(id) = ev.payload::<u32>() else {
                return Err(HandlerError::fail("order without id"));
            };
            orders.fetch_add(1, Ordering::Relaxed);
            println!("[orders] order #{id} (seq={})", ev.seq);
            Ok(())
        })
    };
    let audit: HandlerRef = {
        let ticks = Arc::clone(&ticks);
        HandlerFn::arc("audit", move |ev: &Event| {
            if ev.is_timer() {
                ticks.fetch_add(1, Ordering::Relaxed);
            } else {
                println!("[audit]  kind={} seq={}", ev.kind(), ev.seq);
            }
            Ok(())
        })
    };

    engine.register("order", Arc::clone(&order_handler));
    engine.register_general(Arc::clone(&audit));
    engine.start()?;

    let producers: Vec<_> = ["a", "b"]
        .into_iter()
        .enumerate()
        .map(|(p, name)| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..5_u32 {
                    engine.put(Event::new("order").with_payload(p as u32 * 100 + i));
                    thread::sleep(Duration::from_millis(40));
                }
                println!("[producer-{name}] done");
            })
        })
        .collect();
    for p in producers {
        p.join().map_err(|_| anyhow::anyhow!("producer panicked"))?;
    }

    // Missing payload: the handler fails, the audit handler still sees it.
    engine.put(Event::new("order"));
    thread::sleep(Duration::from_millis(300));

    engine.unregister("order", &order_handler);
    engine.put(Event::new("order").with_payload(999_u32));
    thread::sleep(Duration::from_millis(100));

    engine.stop()?;
    println!(
        "[main] orders handled={} timer ticks={}",
        orders.load(Ordering::Relaxed),
        ticks.load(Ordering::Relaxed)
    );
    Ok(())
}
