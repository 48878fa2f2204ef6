//! ContainerCache - split key → owning container.
//!
//! One-directional: the node remembers which container serves each split,
//! containers never point back. Their lifetime belongs to the scene graph.

use indexmap::IndexMap;

use crate::error::SceneError;
use crate::scene::SceneGraph;
use crate::types::{ContainerRef, SplitKey};

/// Per-node container lookup, cached across passes.
#[derive(Clone, Debug)]
pub struct ContainerCache {
  root: ContainerRef,
  node_label: String,
  by_split: IndexMap<SplitKey, ContainerRef>,
}

impl ContainerCache {
  pub fn new(root: ContainerRef, node_label: impl Into<String>) -> Self {
    Self {
      root,
      node_label: node_label.into(),
      by_split: IndexMap::new(),
    }
  }

  /// The node's own container.
  #[inline]
  pub fn root(&self) -> ContainerRef {
    self.root
  }

  pub fn get(&self, key: &SplitKey) -> Option<ContainerRef> {
    self.by_split.get(key).copied()
  }

  pub fn len(&self) -> usize {
    self.by_split.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_split.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&SplitKey, ContainerRef)> {
    self.by_split.iter().map(|(key, &container)| (key, container))
  }

  /// Label a dedicated container for `key` is created with.
  pub fn label_for(&self, key: &SplitKey) -> String {
    key.label().unwrap_or_else(|| self.node_label.clone())
  }

  /// Forget the container of `key`; the next resolve creates a fresh one.
  pub fn unlink(&mut self, key: &SplitKey) -> Option<ContainerRef> {
    self.by_split.shift_remove(key)
  }

  /// Container for a split.
  ///
  /// Splits not flagged for their own container live in the root. A cached
  /// container that the scene no longer knows about is treated as unlinked.
  pub fn resolve<S: SceneGraph + ?Sized>(
    &mut self,
    key: &SplitKey,
    split_to_container: bool,
    scene: &mut S,
  ) -> Result<ContainerRef, SceneError> {
    if !split_to_container {
      return Ok(self.root);
    }

    if let Some(cached) = self.get(key) {
      if scene.container_alive(cached) {
        return Ok(cached);
      }
      tracing::warn!(split = %key, ?cached, "cached split container was deleted; creating a new one");
      self.unlink(key);
    }

    let container = scene.create_container(&self.label_for(key))?;
    self.by_split.insert(key.clone(), container);
    Ok(container)
  }
}

#[cfg(test)]
#[path = "container_test.rs"]
mod container_test;
