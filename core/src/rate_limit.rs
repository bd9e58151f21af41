// paygate/src/rate_limit.rs

//! Per-user cooldown for interactive entry points.
//!
//! A user may perform one permitted action per `interval`. Denied attempts do not extend
//! the cooldown. State is in memory only; it exists to blunt abuse, not to enforce
//! correctness, so losing it on restart is fine.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::ids::UserId;

/// Run a prune every this many checks.
const PRUNE_EVERY: u64 = 256;

#[derive(Debug)]
pub struct RateLimiter {
  interval: Duration,
  last_allowed: Mutex<HashMap<UserId, Instant>>,
  checks: AtomicU64,
}

impl RateLimiter {
  pub fn new(interval: Duration) -> Self {
    Self {
      interval,
      last_allowed: Mutex::new(HashMap::new()),
      checks: AtomicU64::new(0),
    }
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  /// Immediate, non-blocking decision.
  pub fn allow(&self, user: UserId) -> bool {
    self.allow_at(user, Instant::now())
  }

  pub fn allow_at(&self, user: UserId, now: Instant) -> bool {
    let count = self.checks.fetch_add(1, Ordering::Relaxed);
    if count > 0 && count % PRUNE_EVERY == 0 {
      self.prune_at(now);
    }

    let mut last_allowed = self.last_allowed.lock();
    match last_allowed.get(&user) {
      Some(&previous) if now.saturating_duration_since(previous) < self.interval => {
        warn!(user = %user, "rate limit hit");
        false
      }
      _ => {
        last_allowed.insert(user, now);
        true
      }
    }
  }

  /// Forgets users whose cooldown has fully elapsed. Returns how many were dropped.
  pub fn prune_at(&self, now: Instant) -> usize {
    let mut last_allowed = self.last_allowed.lock();
    let before = last_allowed.len();
    last_allowed.retain(|_, previous| now.saturating_duration_since(*previous) < self.interval);
    let removed = before - last_allowed.len();
    if removed > 0 {
      debug!(removed, "pruned rate limiter entries");
    }
    removed
  }

  pub fn tracked_users(&self) -> usize {
    self.last_allowed.lock().len()
  }
}
