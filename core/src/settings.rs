// paygate/src/settings.rs

use std::time::Duration;

/// Tunables shared by the engine components. None of them affect correctness; they bound
/// how long abandoned state is kept around.
#[derive(Debug, Clone)]
pub struct EngineSettings {
  /// CREATED/PENDING orders older than this are expired by the sweeper.
  pub order_ttl: Duration,
  /// Idle catalog entry sessions are discarded after this long without input.
  pub session_idle_timeout: Duration,
  /// Minimum gap between two permitted interactive actions of one user.
  pub rate_limit_interval: Duration,
  /// Capacity of the audit channel; records beyond it are dropped.
  pub audit_buffer: usize,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      order_ttl: Duration::from_secs(60 * 60),
      session_idle_timeout: Duration::from_secs(15 * 60),
      rate_limit_interval: Duration::from_secs(2),
      audit_buffer: 256,
    }
  }
}
