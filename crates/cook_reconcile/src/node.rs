//! NodeOutput - persisted reconciliation state of one generator node.
//!
//! Each node owns its holder pool and container cache. Multiple nodes can
//! reconcile into the same scene independently; nothing is shared or
//! serialized, so a freshly created node always starts empty.

use crate::attribute::AttributeSource;
use crate::config::ReconcileConfig;
use crate::container::ContainerCache;
use crate::driver::{PassContext, PassReport, ReconciliationDriver};
use crate::error::{ReconcileError, SceneError};
use crate::holder::HolderPool;
use crate::kind::OutputKind;
use crate::lifecycle::destroy_objects;
use crate::metrics::ReconcileMetrics;
use crate::part::Part;
use crate::scene::{PropertyBridge, SceneGraph};
use crate::types::{ContainerRef, SplitKey};

/// Per-node state container.
pub struct NodeOutput {
  kind: OutputKind,
  config: ReconcileConfig,
  pool: HolderPool,
  containers: ContainerCache,
  /// Set after a failed pass: cached payloads may not match the scene.
  needs_rewrite: bool,
  metrics: ReconcileMetrics,
}

impl NodeOutput {
  pub fn new(kind: OutputKind, config: ReconcileConfig, root: ContainerRef) -> Self {
    let containers = ContainerCache::new(root, config.node_label.clone());
    Self {
      kind,
      config,
      pool: HolderPool::new(),
      containers,
      needs_rewrite: false,
      metrics: ReconcileMetrics::new(),
    }
  }

  pub fn kind(&self) -> OutputKind {
    self.kind
  }

  pub fn config(&self) -> &ReconcileConfig {
    &self.config
  }

  pub fn holders(&self) -> &HolderPool {
    &self.pool
  }

  pub fn containers(&self) -> &ContainerCache {
    &self.containers
  }

  pub fn metrics(&self) -> &ReconcileMetrics {
    &self.metrics
  }

  /// True when the next pass will rewrite every reused element.
  pub fn needs_rewrite(&self) -> bool {
    self.needs_rewrite
  }

  /// Forget the container of a split. Holders already living in it conflict
  /// on the next pass and are recreated under a fresh container.
  pub fn unlink_container(&mut self, key: &SplitKey) -> Option<ContainerRef> {
    self.containers.unlink(key)
  }

  /// Reconcile one cook's parts into the scene.
  ///
  /// On success the new pool replaces the old one and the destroyed holders
  /// are gone. On failure the pool is left as it was.
  pub fn cook<A, S, B>(
    &mut self,
    parts: &[Part],
    ctx: PassContext<'_, A, S, B>,
  ) -> Result<PassReport, ReconcileError>
  where
    A: AttributeSource,
    S: SceneGraph + ?Sized,
    B: PropertyBridge + ?Sized,
  {
    let driver = ReconciliationDriver::new(self.kind, &self.config).with_force_rewrite(self.needs_rewrite);

    match driver.reconcile(parts, &self.pool, &mut self.containers, ctx) {
      Ok(outcome) => {
        self.pool = outcome.pool;
        self.needs_rewrite = false;
        self.metrics.record_pass(&outcome.report, self.pool.len());
        Ok(outcome.report)
      }
      Err(err) => {
        self.needs_rewrite = true;
        self.metrics.record_failure();
        Err(err)
      }
    }
  }

  /// Destroy every holder (node teardown). Returns the number of objects
  /// destroyed. Holders not yet reached when a destroy fails stay in the pool.
  pub fn clear<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> Result<usize, SceneError> {
    let mut destroyed = 0;
    let mut holders = std::mem::take(&mut self.pool).into_holders().into_iter();

    while let Some(holder) = holders.next() {
      if let Err(err) = destroy_objects(&mut *scene, &holder, &mut destroyed) {
        self.pool = std::iter::once(holder).chain(holders).collect();
        return Err(err);
      }
    }

    self.containers = ContainerCache::new(self.containers.root(), self.config.node_label.clone());
    tracing::debug!(kind = ?self.kind, destroyed, "node output cleared");
    Ok(destroyed)
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
