//! Error types used by the engines and their handlers.
//!
//! This module defines two main error enums:
//!
//! - [`EngineError`]: lifecycle misuse and runtime failures of an engine itself.
//! - [`HandlerError`]: failures raised by individual handler invocations.
//!
//! Handler failures never escape the dispatch boundary: the engine logs them and
//! moves on to the next handler. Both types provide `as_label`/`as_message`
//! helpers for logs.

use std::any::Any;

use thiserror::Error;

/// # Errors produced by an engine.
///
/// Lifecycle misuse is reported here instead of corrupting worker state:
/// starting a running engine or stopping a stopped one returns an error and
/// leaves the engine untouched.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// `start()` was called while the engine is already running.
    #[error("engine is already running")]
    AlreadyRunning,

    /// `stop()` was called while the engine is not running.
    #[error("engine is not running")]
    NotRunning,

    /// `stop()` was called from a handler executing on the engine's drain thread.
    ///
    /// The running flag is cleared, but the drain thread cannot join itself;
    /// the engine winds down once the current handler returns.
    #[error("stop requested from the drain thread; cannot join itself")]
    StopFromHandler,

    /// A cooperative engine was started outside of a tokio runtime.
    #[error("no tokio runtime in the current context")]
    NoRuntime,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker (thread or scheduled task) exited abnormally.
    #[error("worker {worker} exited abnormally: {reason}")]
    Worker {
        /// Worker name (`drain` or `timer`).
        worker: &'static str,
        /// Panic message or join failure.
        reason: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::EngineError;
    ///
    /// assert_eq!(EngineError::AlreadyRunning.as_label(), "engine_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::AlreadyRunning => "engine_already_running",
            EngineError::NotRunning => "engine_not_running",
            EngineError::StopFromHandler => "engine_stop_from_handler",
            EngineError::NoRuntime => "engine_no_runtime",
            EngineError::Spawn(_) => "engine_spawn_failed",
            EngineError::Worker { .. } => "engine_worker_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::AlreadyRunning => "start on running engine".to_string(),
            EngineError::NotRunning => "stop on stopped engine".to_string(),
            EngineError::StopFromHandler => "stop from drain thread".to_string(),
            EngineError::NoRuntime => "start outside of a runtime".to_string(),
            EngineError::Spawn(e) => format!("spawn: {e}"),
            EngineError::Worker { worker, reason } => format!("worker={worker} reason={reason}"),
        }
    }
}

/// # Errors produced by handler execution.
///
/// Returned by a handler, or synthesized by the engine when a handler panics or
/// an asynchronous invocation is dropped before completing.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler reported a failure.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; the panic was caught at the dispatch boundary.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Asynchronous invocation was dropped before completion (runtime shutting down).
    #[error("handler invocation canceled")]
    Canceled,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    ///
    /// # Example
    /// ```
    /// use eventvisor::HandlerError;
    ///
    /// let err = HandlerError::fail("boom");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// assert_eq!(err.to_string(), "handler failed: boom");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::Canceled => "handler_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Panicked { info } => format!("panic: {info}"),
            HandlerError::Canceled => "invocation canceled".to_string(),
        }
    }

    /// Builds a [`HandlerError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        HandlerError::Panicked {
            info: panic_message(&*payload),
        }
    }
}

/// Renders a panic payload as text (`&str` and `String` payloads; anything else is "unknown panic").
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_render_as_text() {
        let static_str: Box<dyn Any + Send> = Box::new("static boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let other: Box<dyn Any + Send> = Box::new(42_u32);

        assert_eq!(
            HandlerError::from_panic(static_str),
            HandlerError::Panicked {
                info: "static boom".into()
            }
        );
        assert_eq!(
            HandlerError::from_panic(owned),
            HandlerError::Panicked {
                info: "owned boom".into()
            }
        );
        assert_eq!(
            HandlerError::from_panic(other),
            HandlerError::Panicked {
                info: "unknown panic".into()
            }
        );
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(EngineError::NotRunning.as_label(), "engine_not_running");
        assert_eq!(EngineError::StopFromHandler.as_label(), "engine_stop_from_handler");
        assert_eq!(HandlerError::Canceled.as_label(), "handler_canceled");
        assert_eq!(
            HandlerError::Panicked { info: "x".into() }.as_message(),
            "panic: x"
        );
    }

    #[test]
    fn io_errors_convert_to_spawn() {
        let err: EngineError = std::io::Error::other("no threads").into();
        assert_eq!(err.as_label(), "engine_spawn_failed");
        assert!(err.to_string().contains("no threads"));
    }
}
