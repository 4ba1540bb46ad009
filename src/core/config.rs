//! # Engine configuration.
//!
//! Provides [`EngineConfig`] settings shared by both engine variants.
//!
//! ## Clamping
//! - `interval` below 1ms is raised to 1ms (a zero interval would flood the queue)
//! - `poll_timeout` below 1ms is raised to 1ms
//!
//! Use the `*_clamped` accessors instead of reading the raw fields.

use std::borrow::Cow;
use std::time::Duration;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Configuration of an event engine.
///
/// ## Field semantics
/// - `interval`: period of the synthesized timer events
/// - `poll_timeout`: how long the drain loop blocks on an empty queue before
///   re-checking the running flag
/// - `thread_name`: prefix of the worker thread names (`<prefix>-drain`, `<prefix>-timer`)
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Period between two timer events.
    pub interval: Duration,

    /// Maximum blocking time of one queue pop.
    ///
    /// `stop()` wakes the drain loop directly, so this only bounds how long a
    /// cleared running flag can go unobserved.
    pub poll_timeout: Duration,

    /// Prefix for worker thread names.
    pub thread_name: Cow<'static, str>,
}

impl EngineConfig {
    /// Creates a configuration with the given timer interval and default settings otherwise.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Creates a configuration from an interval in (fractional) seconds.
    ///
    /// Negative, NaN or overflowing values fall back to the minimum interval.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use eventvisor::EngineConfig;
    ///
    /// assert_eq!(EngineConfig::from_secs_f64(0.25).interval, Duration::from_millis(250));
    /// assert_eq!(EngineConfig::from_secs_f64(-1.0).interval_clamped(), Duration::from_millis(1));
    /// ```
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(secs).unwrap_or(MIN_PERIOD))
    }

    /// Sets the queue poll timeout.
    #[must_use]
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Returns the timer interval clamped to a minimum of 1ms.
    #[inline]
    pub fn interval_clamped(&self) -> Duration {
        self.interval.max(MIN_PERIOD)
    }

    /// Returns the poll timeout clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_timeout_clamped(&self) -> Duration {
        self.poll_timeout.max(MIN_PERIOD)
    }

    pub(crate) fn worker_name(&self, worker: &str) -> String {
        format!("{}-{worker}", self.thread_name)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `interval = 1s`
    /// - `poll_timeout = 1s`
    /// - `thread_name = "eventvisor"`
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(1),
            thread_name: Cow::Borrowed("eventvisor"),
        }
    }
}
