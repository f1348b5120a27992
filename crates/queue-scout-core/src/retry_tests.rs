//! Tests for reconnect backoff

use super::*;
use std::time::Duration;

// ============================================================================
// RetryPolicy Tests
// ============================================================================

#[test]
fn test_retry_policy_default_values() {
    let policy = RetryPolicy::default();

    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.initial_delay, Duration::from_secs(1));
    assert_eq!(policy.max_delay, Duration::from_secs(30));
    assert_eq!(policy.backoff_multiplier, 2.0);
    assert!(policy.use_jitter);
    assert_eq!(policy.jitter_percent, 0.25);
}

#[test]
fn test_retry_policy_custom_values() {
    let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(10), 1.5);

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.initial_delay, Duration::from_millis(500));
    assert_eq!(policy.max_delay, Duration::from_secs(10));
    assert_eq!(policy.backoff_multiplier, 1.5);
}

#[test]
fn test_retry_policy_delay_without_jitter() {
    let policy = RetryPolicy::default().without_jitter();

    // Doubles each attempt: 1s, 2s, 4s, 8s, 16s
    assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    assert_eq!(policy.delay_for(4), Duration::from_secs(16));

    // Sixth attempt would be 32s but is capped at 30s
    assert_eq!(policy.delay_for(5), Duration::from_secs(30));
}

#[test]
fn test_retry_policy_delay_with_jitter() {
    let policy = RetryPolicy::default();

    let mut delays = Vec::new();
    for _ in 0..10 {
        delays.push(policy.delay_for(0));
    }

    // With 25% jitter, a 1s base lands in [0.75s, 1.25s]
    for delay in &delays {
        let secs = delay.as_secs_f64();
        assert!(secs >= 0.75 && secs <= 1.25, "Delay {} out of range", secs);
    }

    let unique_delays: std::collections::HashSet<_> = delays.iter().collect();
    assert!(
        unique_delays.len() > 1,
        "Expected variation in jittered delays"
    );
}

#[test]
fn test_retry_policy_should_retry() {
    let policy = RetryPolicy::default(); // max_attempts = 3

    assert!(policy.should_retry(0));
    assert!(policy.should_retry(1));
    assert!(policy.should_retry(2));

    assert!(!policy.should_retry(3));
    assert!(!policy.should_retry(4));
}

#[test]
fn test_retry_policy_with_custom_jitter_percent() {
    let policy = RetryPolicy::default().with_jitter_percent(0.5);

    assert_eq!(policy.jitter_percent, 0.5);

    // With 50% jitter, a 1s base lands in [0.5s, 1.5s]
    for _ in 0..10 {
        let secs = policy.delay_for(0).as_secs_f64();
        assert!(secs >= 0.5 && secs <= 1.5, "Delay {} out of range", secs);
    }
}

#[test]
fn test_retry_policy_jitter_percent_clamped() {
    let policy1 = RetryPolicy::default().with_jitter_percent(-0.5);
    assert_eq!(policy1.jitter_percent, 0.0);

    let policy2 = RetryPolicy::default().with_jitter_percent(1.5);
    assert_eq!(policy2.jitter_percent, 1.0);
}

#[test]
fn test_retry_policy_backoff_sequence() {
    let policy =
        RetryPolicy::new(10, Duration::from_millis(100), Duration::from_secs(60), 2.0)
            .without_jitter();

    assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    assert_eq!(policy.delay_for(4), Duration::from_millis(1600));
    assert_eq!(policy.delay_for(5), Duration::from_millis(3200));
    assert_eq!(policy.delay_for(6), Duration::from_millis(6400));
    assert_eq!(policy.delay_for(7), Duration::from_millis(12800));
    assert_eq!(policy.delay_for(8), Duration::from_millis(25600));
    assert_eq!(policy.delay_for(9), Duration::from_millis(51200));

    // Further attempts capped at 60s
    assert_eq!(policy.delay_for(10), Duration::from_secs(60));
}

// ============================================================================
// RetryState Tests
// ============================================================================

#[test]
fn test_retry_state_starts_at_zero() {
    let state = RetryState::new();

    assert_eq!(state.attempt, 0);
}

#[test]
fn test_retry_state_next_attempt() {
    let mut state = RetryState::new();

    state.next_attempt();
    assert_eq!(state.attempt, 1);

    state.next_attempt();
    assert_eq!(state.attempt, 2);
}

#[test]
fn test_retry_state_delay_follows_policy() {
    let policy = RetryPolicy::default().without_jitter();
    let mut state = RetryState::new();

    assert_eq!(state.delay(&policy), Duration::from_secs(1));

    state.next_attempt();
    assert_eq!(state.delay(&policy), Duration::from_secs(2));

    state.next_attempt();
    assert_eq!(state.delay(&policy), Duration::from_secs(4));
}

#[test]
fn test_retry_state_budget_exhaustion() {
    let policy = RetryPolicy::default(); // max_attempts = 3
    let mut state = RetryState::new();

    assert!(state.can_retry(&policy));

    for _ in 0..3 {
        state.next_attempt();
    }

    assert!(!state.can_retry(&policy));
}

#[test]
fn test_reconnect_loop_collects_expected_delays() {
    let policy = RetryPolicy::default().without_jitter();
    let mut state = RetryState::new();

    let mut delays = Vec::new();
    while state.can_retry(&policy) {
        delays.push(state.delay(&policy));
        state.next_attempt();
    }

    assert_eq!(delays.len(), 3);
    assert_eq!(delays[0], Duration::from_secs(1));
    assert_eq!(delays[1], Duration::from_secs(2));
    assert_eq!(delays[2], Duration::from_secs(4));
}
