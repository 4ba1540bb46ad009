//! # Example: cooperative
//!
//! Runs a [`CooperativeEngine`] on the tokio runtime with both async and sync
//! handlers for the same event kind.
//!
//! Shows how to:
//! - Register async handlers next to sync handlers.
//! - See the dispatch order: async typed, async general, sync typed, sync general.
//! - Enqueue from async code with `put_async`.
//! - Drive the engine with `run_for` and stop it early from a handler.
//!
//! ## Flow
//! ```text
//! tokio task ── put_async(Event) ──► queue ──► drain (blocking pool)
//!                                                 ├─► async "fetch" (awaited via scheduler)
//!                                                 ├─► async general
//!                                                 ├─► sync "fetch"
//!                                                 └─► sync general
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example cooperative
//! ```

use std::time::Duration;

use eventvisor::{
    AsyncHandlerFn, AsyncHandlerRef, CooperativeEngine, Event, HandlerError, HandlerFn, HandlerRef,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let engine = CooperativeEngine::new(Duration::from_millis(250));

    let fetch: AsyncHandlerRef = AsyncHandlerFn::arc("fetch", |ev: Event| async move {
        let url = ev.payload::<String>().cloned().unwrap_or_default();
        println!("[async fetch]   start {url}");
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!("[async fetch]   done  {url}");
        Ok::<_, HandlerError>(())
    });
    let trace: AsyncHandlerRef = AsyncHandlerFn::arc("trace", |ev: Event| async move {
        if !ev.is_timer() {
            println!("[async general] kind={} seq={}", ev.kind(), ev.seq);
        }
        Ok::<_, HandlerError>(())
    });
    let record: HandlerRef = HandlerFn::arc("record", |ev: &Event| {
        println!("[sync fetch]    seq={}", ev.seq);
        Ok(())
    });
    let halt: HandlerRef = {
        let engine = engine.clone();
        HandlerFn::arc("halt", move |ev: &Event| {
            if ev.kind() == "halt" {
                println!("[sync general]  halt requested");
                engine.stop().map_err(|e| HandlerError::fail(e.to_string()))?;
            }
            Ok(())
        })
    };

    engine.register("fetch", fetch);
    engine.register_general(trace);
    engine.register("fetch", record);
    engine.register_general(halt);

    let producer = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for page in ["/a", "/b", "/c"] {
                engine
                    .put_async(Event::new("fetch").with_payload(page.to_string()))
                    .await;
            }
            tokio::time::sleep(Duration::from_millis(600)).await;
            engine.put_async(Event::new("halt")).await;
        })
    };

    // Ends early when the "halt" handler stops the engine.
    engine.run_for(Duration::from_secs(5)).await?;
    producer.await?;
    println!("[main] engine stopped, running={}", engine.is_running());
    Ok(())
}
