//! PartialUpdatePlanner - reduces per-primitive update modes to one outcome
//! per bucket.
//!
//! ```text
//! bucket state     incoming    result
//! ──────────────   ─────────   ─────────────────────────────────
//! (none)           Remove      Tombstone (bucket starts removed)
//! (none)           other       Accumulate, bucket takes the mode
//! Replace          Remove      Tombstone (drop what accumulated)
//! Replace/Modify   other       Accumulate
//! Modify           Remove      Accumulate (Modify already claimed it)
//! Remove           any         Skip
//! ```
//!
//! Any Modify/Remove makes the pass incremental: buckets that do not appear
//! at all are left untouched instead of torn down.

use indexmap::IndexMap;

use crate::types::{SplitKey, UpdateMode};

/// What the grouper does with one primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
  /// Add the primitive to its bucket.
  Accumulate,
  /// Mark the bucket removed and discard its content.
  Tombstone,
  /// Ignore the primitive.
  Skip,
}

/// Per-primitive reduction rule.
pub fn admit(bucket: Option<UpdateMode>, incoming: UpdateMode) -> Admission {
  match (bucket, incoming) {
    (Some(UpdateMode::Remove), _) => Admission::Skip,
    (Some(UpdateMode::Modify), _) => Admission::Accumulate,
    (_, UpdateMode::Remove) => Admission::Tombstone,
    _ => Admission::Accumulate,
  }
}

/// Pass-level decision for one split key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketOutcome {
  /// Content changed or newly appearing: match, reuse, or create.
  Rebuild,
  /// Not mentioned by an incremental pass: prior holders stand as-is.
  Untouched,
  /// Withdrawn: prior holders are destroyed.
  Tombstoned,
}

/// Outcomes of every split key touched by a pass.
#[derive(Clone, Debug, Default)]
pub struct PassPlan {
  incremental: bool,
  outcomes: IndexMap<SplitKey, BucketOutcome>,
}

impl PassPlan {
  pub fn new(incremental: bool) -> Self {
    Self {
      incremental,
      outcomes: IndexMap::new(),
    }
  }

  /// True when at least one primitive requested Modify or Remove.
  #[inline]
  pub fn is_incremental(&self) -> bool {
    self.incremental
  }

  pub fn mark_incremental(&mut self) {
    self.incremental = true;
  }

  /// Record one part's reduced bucket mode. Rebuild from any part wins.
  pub fn record(&mut self, key: &SplitKey, mode: UpdateMode) {
    let outcome = match mode {
      UpdateMode::Remove => BucketOutcome::Tombstoned,
      _ => BucketOutcome::Rebuild,
    };
    self
      .outcomes
      .entry(key.clone())
      .and_modify(|existing| {
        if outcome == BucketOutcome::Rebuild {
          *existing = BucketOutcome::Rebuild;
        }
      })
      .or_insert(outcome);
  }

  /// Outcome for any split key, including ones absent from this pass.
  pub fn outcome(&self, key: &SplitKey) -> BucketOutcome {
    match self.outcomes.get(key) {
      Some(&outcome) => outcome,
      None if self.incremental => BucketOutcome::Untouched,
      None => BucketOutcome::Tombstoned,
    }
  }

  /// Keys present in the pass, in first-encounter order.
  pub fn iter(&self) -> impl Iterator<Item = (&SplitKey, BucketOutcome)> {
    self.outcomes.iter().map(|(key, &outcome)| (key, outcome))
  }
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod planner_test;
