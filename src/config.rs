// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Tunable settings for pairing and locking.

use std::time::Duration;

mod constants;

pub use constants::*;

/// Thresholds used by the pairing engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairingConfig {
  /// Maximum still/motion timestamp difference for the time-based tiers.
  pub time_delta:         f64,
  /// Preferred clip duration window (min, max) for content id matches.
  pub duration_preferred: (f64, f64),
}

impl Default for PairingConfig {
  fn default() -> Self {
    Self {
      time_delta:         PAIR_TIME_DELTA_SEC,
      duration_preferred: LIVE_DURATION_PREFERRED,
    }
  }
}

/// Timing for cooperative file locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
  /// Age after which an existing lock file is presumed abandoned.
  pub expiry:  Duration,
  /// Delay between attempts while the lock is held elsewhere.
  pub poll:    Duration,
  /// Default time to wait when callers do not pass their own.
  pub timeout: Duration,
}

impl Default for LockConfig {
  fn default() -> Self {
    Self {
      expiry:  Duration::from_secs(LOCK_EXPIRE_SEC),
      poll:    Duration::from_millis(LOCK_POLL_MS),
      timeout: Duration::from_secs(LOCK_EXPIRE_SEC),
    }
  }
}
