//! Engine-agnostic statistics for reconciliation passes.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use cook_reconcile::metrics::{ReconcileMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // After each cook:
//! metrics.record_pass(&report);
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::driver::PassReport;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window for storing recent values (e.g., pass timings).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Values from oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.buffer.iter().sum()
  }

  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = self.buffer.iter().min()?;
    let max = self.buffer.iter().max()?;
    Some((*min, *max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(64)
  }
}

/// Per-node statistics updated after every cook.
#[derive(Debug, Clone, Default)]
pub struct ReconcileMetrics {
  /// Successful passes.
  pub passes: u64,
  /// Passes that returned an error and were rolled back.
  pub failed_passes: u64,
  pub incremental_passes: u64,

  // Holder traffic (cumulative)
  pub holders_created: u64,
  pub holders_reused: u64,
  pub holders_untouched: u64,
  pub holders_destroyed: u64,
  pub conflicts: u64,
  pub dropped_invalid: u64,

  // Element traffic (cumulative)
  pub elements_added: u64,
  pub elements_removed: u64,
  pub elements_written: u64,
  pub skipped_primitives: u64,

  /// Rolling window of pass durations in microseconds.
  pub pass_timings: RollingWindow<u64>,
  /// Holders alive after the last successful pass.
  pub live_holders: usize,
}

impl ReconcileMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset everything except the cumulative pass counters.
  pub fn reset(&mut self) {
    let passes = self.passes;
    let failed_passes = self.failed_passes;
    *self = Self::default();
    self.passes = passes;
    self.failed_passes = failed_passes;
  }

  /// Fold one successful pass into the totals.
  pub fn record_pass(&mut self, report: &PassReport, live_holders: usize) {
    if !is_enabled() {
      return;
    }

    self.passes += 1;
    if report.incremental {
      self.incremental_passes += 1;
    }
    self.holders_created += report.created as u64;
    self.holders_reused += report.reused as u64;
    self.holders_untouched += report.untouched as u64;
    self.holders_destroyed += report.destroyed as u64;
    self.conflicts += report.conflicts as u64;
    self.dropped_invalid += report.dropped_invalid as u64;

    self.elements_added += report.lifecycle.elements_added as u64;
    self.elements_removed += report.lifecycle.elements_removed as u64;
    self.elements_written += report.lifecycle.elements_written as u64;
    self.skipped_primitives += report.skipped_primitives as u64;

    self.pass_timings.push(report.elapsed_us);
    self.live_holders = live_holders;
  }

  pub fn record_failure(&mut self) {
    if is_enabled() {
      self.failed_passes += 1;
    }
  }

  /// Share of matched holders that were reused rather than recreated.
  pub fn reuse_ratio(&self) -> f64 {
    let matched = self.holders_reused + self.holders_created;
    if matched == 0 {
      0.0
    } else {
      self.holders_reused as f64 / matched as f64
    }
  }

  pub fn avg_pass_us(&self) -> f64 {
    self.pass_timings.average()
  }
}
