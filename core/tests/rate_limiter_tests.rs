// tests/rate_limiter_tests.rs
mod common;
use common::*;
use paygate::{RateLimiter, UserId};
use std::time::{Duration, Instant};

#[test]
fn test_one_action_per_interval() {
  setup_tracing();
  let limiter = RateLimiter::new(Duration::from_secs(2));
  let t0 = Instant::now();

  assert!(limiter.allow_at(BUYER, t0));
  assert!(!limiter.allow_at(BUYER, t0 + Duration::from_millis(500)));
  assert!(!limiter.allow_at(BUYER, t0 + Duration::from_millis(1999)));
  assert!(limiter.allow_at(BUYER, t0 + Duration::from_secs(2)));
}

#[test]
fn test_denials_do_not_extend_the_cooldown() {
  let limiter = RateLimiter::new(Duration::from_secs(2));
  let t0 = Instant::now();

  assert!(limiter.allow_at(BUYER, t0));
  for ms in [100, 600, 1200, 1900] {
    assert!(!limiter.allow_at(BUYER, t0 + Duration::from_millis(ms)));
  }
  assert!(limiter.allow_at(BUYER, t0 + Duration::from_millis(2001)));
}

#[test]
fn test_users_are_independent() {
  let limiter = RateLimiter::new(Duration::from_secs(2));
  let t0 = Instant::now();

  assert!(limiter.allow_at(BUYER, t0));
  assert!(limiter.allow_at(OTHER_BUYER, t0));
  assert!(!limiter.allow_at(BUYER, t0));
  assert_eq!(limiter.tracked_users(), 2);
}

#[test]
fn test_prune_forgets_cooled_down_users() {
  let limiter = RateLimiter::new(Duration::from_secs(2));
  let t0 = Instant::now();
  for id in 0..10 {
    assert!(limiter.allow_at(UserId(id), t0));
  }
  assert!(limiter.allow_at(UserId(100), t0 + Duration::from_secs(3)));

  let pruned = limiter.prune_at(t0 + Duration::from_secs(3));
  assert_eq!(pruned, 10);
  assert_eq!(limiter.tracked_users(), 1);
}
