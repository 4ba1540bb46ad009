//! # LogWriter: simple event printer
//!
//! A minimal general handler that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [timer] seq=12
//! [event] kind="order.created" seq=13 payload=true
//! ```

use crate::error::HandlerError;
use crate::events::Event;
use crate::handlers::Handler;

/// Event writer handler.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Handler for LogWriter {
    fn handle(&self, e: &Event) -> Result<(), HandlerError> {
        if e.is_timer() {
            println!("[timer] seq={}", e.seq);
        } else {
            println!(
                "[event] kind={:?} seq={} payload={}",
                e.kind(),
                e.seq,
                e.has_payload()
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}
