//! # Reconnect Backoff
//!
//! Exponential backoff with jitter for spacing reconnect attempts against a
//! host that keeps failing.
//!
//! The lifecycle manager decides whether another attempt is admissible; this
//! module only decides how long to wait before it.

use rand::Rng;
use std::time::Duration;

/// Backoff policy for reconnect attempts
///
/// # Examples
///
/// ```rust
/// use queue_scout_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// // Default policy: 3 attempts, 1s initial, 30s max, 2.0x multiplier
/// let policy = RetryPolicy::default();
///
/// // Custom policy
/// let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(10), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of reconnect attempts after the initial failure
    pub max_attempts: u32,

    /// Delay before the first reconnect attempt
    pub initial_delay: Duration,

    /// Cap applied to every delay
    pub max_delay: Duration,

    /// Exponential growth factor between attempts
    pub backoff_multiplier: f64,

    /// Whether delays are randomized to spread out simultaneous reconnects
    pub use_jitter: bool,

    /// Jitter range as a fraction of the delay (0.25 = plus or minus 25%)
    pub jitter_percent: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Create a new backoff policy
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Reconnect attempt budget
    /// * `initial_delay` - Delay before the first reconnect
    /// * `max_delay` - Cap applied to every delay
    /// * `backoff_multiplier` - Exponential growth factor (typically 1.5-2.0)
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }

    /// Disable jitter
    ///
    /// Deterministic delays are useful in tests; leave jitter on elsewhere.
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Set a custom jitter fraction, clamped to 0.0..=1.0
    pub fn with_jitter_percent(mut self, percent: f64) -> Self {
        self.jitter_percent = percent.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait before a reconnect attempt
    ///
    /// Grows as `initial * multiplier^attempt`, capped at `max_delay`, with
    /// jitter applied on top when enabled.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Reconnect attempt number (0-based)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use queue_scout_core::retry::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default().without_jitter();
    ///
    /// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    /// assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);

        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.use_jitter {
            Self::add_jitter(capped_secs, self.jitter_percent)
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }

    /// Check whether the attempt budget allows another reconnect
    ///
    /// # Examples
    ///
    /// ```rust
    /// use queue_scout_core::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default(); // max_attempts = 3
    ///
    /// assert!(policy.should_retry(0));
    /// assert!(policy.should_retry(2));
    /// assert!(!policy.should_retry(3));
    /// ```
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Randomize a delay within [delay * (1-jitter), delay * (1+jitter)]
    fn add_jitter(delay_secs: f64, jitter_percent: f64) -> f64 {
        let mut rng = rand::rng();

        let jitter_range = delay_secs * jitter_percent;
        let jitter = rng.random_range(-jitter_range..=jitter_range);

        (delay_secs + jitter).max(0.0)
    }
}

/// Attempt counter paired with a [`RetryPolicy`] in reconnect loops
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Reconnect attempt about to run (0-based)
    pub attempt: u32,
}

impl RetryState {
    /// Create new state starting at attempt 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next attempt
    pub fn next_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Delay to wait before the current attempt
    pub fn delay(&self, policy: &RetryPolicy) -> Duration {
        policy.delay_for(self.attempt)
    }

    /// Check whether the policy allows the current attempt
    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        policy.should_retry(self.attempt)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
