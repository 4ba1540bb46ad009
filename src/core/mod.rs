//! Engine core: queue, dispatch, loops and the two engine variants.
//!
//! The public API from this module is [`Engine`], [`EngineConfig`],
//! [`ThreadedEngine`] and [`CooperativeEngine`].
//!
//! Internal modules:
//! - [`dispatch`]: shared core (queue, running flag, two-phase dispatch, drain and timer loops);
//! - [`shutdown`]: per-run shutdown signal observable from threads and tasks;
//! - [`bridge`]: thread → scheduler handoff used to await async handlers;
//! - [`threaded`]: engine with dedicated drain and timer threads;
//! - [`cooperative`]: tokio-driven engine with async handler support.
//!
//! ## Wiring
//! ```text
//!   producers ── put(event) ──► EngineCore.queue ──► drain loop ──► dispatch
//!                                   ▲                                  │
//!   timer loop ── put(timer) ───────┘             ┌────────────────────┤
//!                                                 ▼                    ▼
//!                                  (cooperative) async typed/general   sync typed ─► sync general
//!                                  via Bridge, one at a time
//! ```

mod bridge;
mod config;
mod cooperative;
mod dispatch;
mod engine;
mod shutdown;
mod threaded;

pub use config::EngineConfig;
pub use cooperative::CooperativeEngine;
pub use engine::Engine;
pub use threaded::ThreadedEngine;
