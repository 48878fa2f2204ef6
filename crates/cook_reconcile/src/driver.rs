//! ReconciliationDriver - one cook pass from parts to a new holder pool.
//!
//! ```text
//!  ┌──────────── phase 1: read-only ────────────┐   ┌────────── phase 2: mutation ──────────┐
//!  │ group parts ─► plan ─► extract payloads    │   │ split prior pool ─► match / reuse /   │
//!  │   (attribute I/O)        (rayon, joined)   ├──►│ create ─► destroy leftovers           │
//!  └────────────────────────────────────────────┘   └───────────────────────────────────────┘
//! ```
//!
//! Phase 1 failures abort before the scene is touched. Phase 2 failures roll
//! back the objects created so far; the prior pool is never modified, so the
//! caller keeps it and retries later.

use web_time::Instant;

use crate::attribute::AttributeSource;
use crate::config::ReconcileConfig;
use crate::container::ContainerCache;
use crate::element::{extract_payloads, ElementReader, PayloadJob};
use crate::error::{ReconcileError, SceneError};
use crate::grouping::{PartBuckets, SplitGrouper};
use crate::holder::{Holder, HolderPool};
use crate::kind::OutputKind;
use crate::lifecycle::{HolderLifecycleManager, LifecycleStats, PlannedGroup};
use crate::matcher::take_best_match;
use crate::part::Part;
use crate::planner::{BucketOutcome, PassPlan};
use crate::scene::{PropertyBridge, SceneGraph};
use crate::types::UpdateMode;

/// Collaborators for one pass.
pub struct PassContext<'a, A, S: ?Sized, B: ?Sized> {
  pub source: &'a A,
  pub scene: &'a mut S,
  pub bridge: &'a mut B,
}

/// Summary of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
  pub incremental: bool,
  pub created: usize,
  pub reused: usize,
  pub untouched: usize,
  pub destroyed: usize,
  /// Matches rejected because the holder sits in a different container.
  pub conflicts: usize,
  /// Prior holders whose objects were deleted externally.
  pub dropped_invalid: usize,
  pub skipped_primitives: usize,
  pub lifecycle: LifecycleStats,
  pub elapsed_us: u64,
}

/// Published result of a successful pass.
#[derive(Debug)]
pub struct ReconcileOutcome {
  pub pool: HolderPool,
  pub destroyed: Vec<Holder>,
  pub report: PassReport,
}

/// Orchestrates grouping, planning, matching, and the lifecycle manager.
pub struct ReconciliationDriver<'c> {
  kind: OutputKind,
  config: &'c ReconcileConfig,
  force_rewrite: bool,
}

impl<'c> ReconciliationDriver<'c> {
  pub fn new(kind: OutputKind, config: &'c ReconcileConfig) -> Self {
    Self {
      kind,
      config,
      force_rewrite: false,
    }
  }

  /// Rewrite every reused element (used after a failed pass).
  pub fn with_force_rewrite(mut self, force: bool) -> Self {
    self.force_rewrite = force;
    self
  }

  /// Reconcile `parts` against `prior`.
  ///
  /// `prior` is only read; the new pool and destroy set are returned together
  /// once every scene call has succeeded.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "driver::reconcile"))]
  pub fn reconcile<A, S, B>(
    &self,
    parts: &[Part],
    prior: &HolderPool,
    containers: &mut ContainerCache,
    ctx: PassContext<'_, A, S, B>,
  ) -> Result<ReconcileOutcome, ReconcileError>
  where
    A: AttributeSource,
    S: SceneGraph + ?Sized,
    B: PropertyBridge + ?Sized,
  {
    let start = Instant::now();
    let PassContext {
      source,
      scene,
      bridge,
    } = ctx;

    // -------------------------------------------------------------------------
    // Phase 1: read-only
    // -------------------------------------------------------------------------

    let grouper = SplitGrouper::new(self.kind, self.config);
    let mut grouped: Vec<PartBuckets> = Vec::with_capacity(parts.len());
    let mut readers: Vec<ElementReader> = Vec::with_capacity(parts.len());
    for part in parts {
      grouped.push(grouper.group_part(source, part, &*scene)?);
      readers.push(ElementReader::fetch(source, part, &self.config.attributes)?);
    }

    let mut plan = PassPlan::new(false);
    for buckets in &grouped {
      if buckets.incremental {
        plan.mark_incremental();
      }
      for (key, bucket) in &buckets.buckets {
        plan.record(key, bucket.mode);
      }
    }

    let mut groups: Vec<PlannedGroup<'_>> = Vec::new();
    let mut owners: Vec<usize> = Vec::new();
    for (part_index, buckets) in grouped.iter().enumerate() {
      for (key, bucket) in &buckets.buckets {
        if bucket.mode == UpdateMode::Remove || plan.outcome(key) != BucketOutcome::Rebuild {
          continue;
        }
        for (identity, prims) in &bucket.groups {
          groups.push(PlannedGroup {
            part: &parts[part_index],
            split_key: key.clone(),
            split_to_container: bucket.split_to_container,
            identity: identity.clone(),
            mode: bucket.mode,
            primitives: prims.clone(),
            elements: Vec::new(),
          });
          owners.push(part_index);
        }
      }
    }

    let jobs: Vec<PayloadJob<'_>> = groups
      .iter()
      .zip(&owners)
      .map(|(group, &owner)| PayloadJob {
        reader: &readers[owner],
        part: group.part,
        primitives: &group.primitives,
      })
      .collect();
    let payloads = extract_payloads(&jobs, self.config.parallel_threshold);
    drop(jobs);
    for (group, elements) in groups.iter_mut().zip(payloads) {
      group.elements = elements;
    }

    // Unresolved materials fall back to the object default.
    for group in &mut groups {
      for element in &mut group.elements {
        let unresolved = element
          .material
          .as_deref()
          .is_some_and(|material| scene.resolve_asset(material).is_none());
        if unresolved {
          tracing::debug!(material = ?element.material, "unresolved material; using default");
          element.material = None;
        }
      }
    }

    let mut report = PassReport {
      incremental: plan.is_incremental(),
      skipped_primitives: grouped.iter().map(|b| b.skipped.total()).sum(),
      ..Default::default()
    };

    // -------------------------------------------------------------------------
    // Phase 2: mutation
    // -------------------------------------------------------------------------

    let mut new_pool = HolderPool::new();
    let mut eligible = HolderPool::new();
    let mut doomed: Vec<Holder> = Vec::new();

    for holder in prior.iter() {
      match plan.outcome(holder.split_key()) {
        BucketOutcome::Untouched => {
          report.untouched += 1;
          new_pool.push(holder.clone());
        }
        outcome => {
          let mut candidate = holder.clone();
          if !candidate.revalidate(&*scene) {
            tracing::debug!(holder = ?holder.id(), split = %holder.split_key(), "holder objects were deleted externally; dropping");
            report.dropped_invalid += 1;
          } else if outcome == BucketOutcome::Tombstoned {
            doomed.push(candidate);
          } else {
            eligible.push(candidate);
          }
        }
      }
    }

    let mut lifecycle =
      HolderLifecycleManager::new(scene, containers, bridge, source).with_force_rewrite(self.force_rewrite);

    let applied = self.apply(&groups, &mut eligible, &mut new_pool, &mut doomed, &mut lifecycle, &mut report);
    if let Err(err) = applied {
      let stats = lifecycle.rollback();
      tracing::warn!(%err, rolled_back = stats.objects_destroyed, "reconciliation pass aborted");
      return Err(err.into());
    }

    report.lifecycle = lifecycle.commit();
    report.elapsed_us = start.elapsed().as_micros() as u64;

    tracing::debug!(
      kind = ?self.kind,
      incremental = report.incremental,
      created = report.created,
      reused = report.reused,
      untouched = report.untouched,
      destroyed = report.destroyed,
      conflicts = report.conflicts,
      elapsed_us = report.elapsed_us,
      "reconciliation pass complete"
    );

    Ok(ReconcileOutcome {
      pool: new_pool,
      destroyed: doomed,
      report,
    })
  }

  /// Match, reuse or create every group, then destroy the leftovers.
  fn apply<S, B>(
    &self,
    groups: &[PlannedGroup<'_>],
    eligible: &mut HolderPool,
    new_pool: &mut HolderPool,
    doomed: &mut Vec<Holder>,
    lifecycle: &mut HolderLifecycleManager<'_, S, B>,
    report: &mut PassReport,
  ) -> Result<(), SceneError>
  where
    S: SceneGraph + ?Sized,
    B: PropertyBridge + ?Sized,
  {
    for group in groups {
      let container = lifecycle.resolve_container(&group.split_key, group.split_to_container)?;

      match take_best_match(self.kind, eligible, &group.candidate()) {
        Some(found) if found.holder.container() != container => {
          tracing::warn!(
            holder = ?found.holder.id(),
            split = %group.split_key,
            expected = ?container,
            actual = ?found.holder.container(),
            "holder container does not match; destroying and recreating instead of reparenting"
          );
          report.conflicts += 1;
          doomed.push(found.holder);
          new_pool.push(lifecycle.create(group, container)?);
          report.created += 1;
        }
        Some(found) => {
          let mut holder = found.holder;
          lifecycle.reuse_and_resize(&mut holder, group)?;
          new_pool.push(holder);
          report.reused += 1;
        }
        None => {
          new_pool.push(lifecycle.create(group, container)?);
          report.created += 1;
        }
      }
    }

    doomed.extend(std::mem::take(eligible).into_holders());
    for holder in doomed.iter() {
      lifecycle.destroy(holder.clone())?;
    }
    report.destroyed = doomed.len();
    Ok(())
  }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;
