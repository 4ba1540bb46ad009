//! # Example: timer
//!
//! Attaches the built-in [`LogWriter`] as a general handler and lets the timer
//! loop drive it.
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! cargo run --example timer --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use eventvisor::{Engine, Event, HandlerRef, LogWriter, ThreadedEngine};

fn main() -> anyhow::Result<()> {
    let engine = ThreadedEngine::new(Duration::from_millis(100));
    let log: HandlerRef = Arc::new(LogWriter::new());
    engine.register_general(log);

    engine.start()?;
    engine.put(Event::new("boot").with_payload("hello"));
    std::thread::sleep(Duration::from_millis(550));
    engine.stop()?;
    Ok(())
}
