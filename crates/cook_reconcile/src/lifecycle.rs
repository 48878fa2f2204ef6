//! HolderLifecycleManager - the only code that mutates the persistent scene.
//!
//! Four operations: `create`, `reuse_and_resize`, `destroy`, and
//! `resolve_container`. Objects and containers created during a pass are
//! journaled so a failed pass can `rollback` instead of leaking them.

use crate::attribute::AttributeSource;
use crate::container::ContainerCache;
use crate::element::ElementData;
use crate::error::SceneError;
use crate::holder::{Holder, HolderObjects, ObjectHandle};
use crate::kind::{IdentityKey, ObjectLayout};
use crate::matcher::Candidate;
use crate::part::Part;
use crate::scene::{ElementBinding, PropertyBridge, SceneGraph};
use crate::types::{ContainerRef, HolderId, ObjectRef, SplitKey, UpdateMode};

/// A surviving output group with its payloads already extracted.
#[derive(Clone, Debug)]
pub struct PlannedGroup<'p> {
  pub part: &'p Part,
  pub split_key: SplitKey,
  pub split_to_container: bool,
  pub identity: IdentityKey,
  pub mode: UpdateMode,
  pub primitives: Vec<u32>,
  /// One payload per primitive, same order.
  pub elements: Vec<ElementData>,
}

impl PlannedGroup<'_> {
  pub fn candidate(&self) -> Candidate<'_> {
    Candidate {
      split_key: &self.split_key,
      split_to_container: self.split_to_container,
      identity: &self.identity,
      element_count: self.elements.len(),
    }
  }
}

/// Scene operations issued during one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleStats {
  pub objects_created: usize,
  pub objects_destroyed: usize,
  pub elements_added: usize,
  pub elements_removed: usize,
  pub elements_written: usize,
}

/// Creates, resizes, and destroys holder objects for one pass.
pub struct HolderLifecycleManager<'a, S: ?Sized, B: ?Sized> {
  scene: &'a mut S,
  containers: &'a mut ContainerCache,
  bridge: &'a mut B,
  source: &'a dyn AttributeSource,
  force_rewrite: bool,
  created: Vec<ObjectRef>,
  created_containers: Vec<(SplitKey, ContainerRef)>,
  stats: LifecycleStats,
}

impl<'a, S, B> HolderLifecycleManager<'a, S, B>
where
  S: SceneGraph + ?Sized,
  B: PropertyBridge + ?Sized,
{
  pub fn new(
    scene: &'a mut S,
    containers: &'a mut ContainerCache,
    bridge: &'a mut B,
    source: &'a dyn AttributeSource,
  ) -> Self {
    Self {
      scene,
      containers,
      bridge,
      source,
      force_rewrite: false,
      created: Vec::new(),
      created_containers: Vec::new(),
      stats: LifecycleStats::default(),
    }
  }

  /// Rewrite every element regardless of the cached payload.
  pub fn with_force_rewrite(mut self, force: bool) -> Self {
    self.force_rewrite = force;
    self
  }

  pub fn stats(&self) -> LifecycleStats {
    self.stats
  }

  pub fn scene(&self) -> &S {
    self.scene
  }

  /// Container a group of this split must live in.
  pub fn resolve_container(
    &mut self,
    key: &SplitKey,
    split_to_container: bool,
  ) -> Result<ContainerRef, SceneError> {
    let cached = self.containers.get(key);
    let container = self.containers.resolve(key, split_to_container, &mut *self.scene)?;
    if split_to_container && cached != Some(container) {
      self.created_containers.push((key.clone(), container));
    }
    Ok(container)
  }

  /// Allocate and fully populate a new holder inside `container`.
  pub fn create(
    &mut self,
    group: &PlannedGroup<'_>,
    container: ContainerRef,
  ) -> Result<Holder, SceneError> {
    let count = group.elements.len();
    let objects = match group.identity.layout() {
      ObjectLayout::Single => {
        let handle = self.spawn(&group.identity, container)?;
        let object = handle.last_known();
        self.scene.resize(object, count)?;
        self.stats.elements_added += count;
        for index in 0..count {
          self.write(object, index, group, index)?;
        }
        HolderObjects::Single(handle)
      }
      ObjectLayout::Array => {
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
          let handle = self.spawn(&group.identity, container)?;
          self.stats.elements_added += 1;
          self.write(handle.last_known(), 0, group, index)?;
          handles.push(handle);
        }
        HolderObjects::Array(handles)
      }
    };

    Ok(Holder {
      id: HolderId::new(),
      split_key: group.split_key.clone(),
      split_to_container: group.split_to_container,
      container,
      identity: group.identity.clone(),
      objects,
      elements: group.elements.clone(),
    })
  }

  /// Repurpose `holder` for `group`.
  ///
  /// Grows by appending, shrinks tail-first, then writes only the elements
  /// whose payload changed (all of them for Modify buckets or forced passes).
  /// Running it twice with the same group changes nothing the second time.
  pub fn reuse_and_resize(
    &mut self,
    holder: &mut Holder,
    group: &PlannedGroup<'_>,
  ) -> Result<(), SceneError> {
    let target = group.elements.len();
    let force = self.force_rewrite || group.mode == UpdateMode::Modify;
    let container = holder.container;

    match &mut holder.objects {
      HolderObjects::Single(handle) => {
        let object = handle
          .resolve(&*self.scene, container)
          .ok_or(SceneError::MissingObject(handle.last_known()))?;
        let current = holder.elements.len();
        // A forced pass cannot trust the cached count: a failed pass may have
        // resized the object without updating the holder.
        if force || target != current {
          self.scene.resize(object, target)?;
          if target > current {
            self.stats.elements_added += target - current;
          } else {
            self.stats.elements_removed += current - target;
          }
        }
        for index in 0..target {
          if force || !unchanged(&holder.elements, group, index) {
            self.write(object, index, group, index)?;
          }
        }
      }
      HolderObjects::Array(handles) => {
        while handles.len() > target {
          if let Some(handle) = handles.pop() {
            if let Some(object) = handle.resolve(&*self.scene, container) {
              self.scene.destroy(object)?;
              self.stats.objects_destroyed += 1;
            }
            self.stats.elements_removed += 1;
          }
        }
        while handles.len() < target {
          let handle = self.spawn(&group.identity, container)?;
          handles.push(handle);
          self.stats.elements_added += 1;
        }
        for (index, handle) in handles.iter().enumerate() {
          if force || !unchanged(&holder.elements, group, index) {
            let object = handle
              .resolve(&*self.scene, container)
              .ok_or(SceneError::MissingObject(handle.last_known()))?;
            self.write(object, 0, group, index)?;
          }
        }
      }
    }

    holder.elements = group.elements.clone();
    holder.identity = group.identity.clone();
    Ok(())
  }

  /// Release every object of `holder`. Handles that no longer resolve were
  /// deleted elsewhere and are skipped.
  pub fn destroy(&mut self, holder: Holder) -> Result<(), SceneError> {
    let mut destroyed = 0;
    let result = destroy_objects(&mut *self.scene, &holder, &mut destroyed);
    self.stats.objects_destroyed += destroyed;
    result
  }

  /// Keep everything created this pass.
  pub fn commit(self) -> LifecycleStats {
    self.stats
  }

  /// Destroy everything created this pass (best effort): objects first, then
  /// the containers they lived in.
  pub fn rollback(self) -> LifecycleStats {
    let mut stats = self.stats;
    for object in self.created.into_iter().rev() {
      if !self.scene.object_alive(object) {
        continue;
      }
      match self.scene.destroy(object) {
        Ok(()) => stats.objects_destroyed += 1,
        Err(err) => tracing::warn!(?object, %err, "rollback could not destroy object"),
      }
    }
    for (key, container) in self.created_containers.into_iter().rev() {
      if self.containers.get(&key) == Some(container) {
        self.containers.unlink(&key);
      }
      if !self.scene.container_alive(container) {
        continue;
      }
      if let Err(err) = self.scene.destroy_container(container) {
        tracing::warn!(?container, %err, "rollback could not destroy container");
      }
    }
    stats
  }

  fn spawn(
    &mut self,
    identity: &IdentityKey,
    container: ContainerRef,
  ) -> Result<ObjectHandle, SceneError> {
    let handle = self.scene.create_object(identity, container)?;
    self.created.push(handle.last_known());
    self.stats.objects_created += 1;
    Ok(handle)
  }

  fn write(
    &mut self,
    object: ObjectRef,
    slot: usize,
    group: &PlannedGroup<'_>,
    index: usize,
  ) -> Result<(), SceneError> {
    self.scene.write_element(object, slot, &group.elements[index])?;
    self.stats.elements_written += 1;
    self.bridge.apply(
      object,
      self.source,
      ElementBinding {
        part: group.part,
        primitive: group.primitives[index],
        element: slot,
      },
    );
    Ok(())
  }
}

/// Destroy every live object of `holder`, tail-first to match shrink order.
/// Handles that no longer resolve were deleted elsewhere and are skipped;
/// `destroyed` counts the objects actually released.
pub(crate) fn destroy_objects<S: SceneGraph + ?Sized>(
  scene: &mut S,
  holder: &Holder,
  destroyed: &mut usize,
) -> Result<(), SceneError> {
  let handles = match &holder.objects {
    HolderObjects::Single(handle) => std::slice::from_ref(handle),
    HolderObjects::Array(handles) => handles.as_slice(),
  };
  for handle in handles.iter().rev() {
    if let Some(object) = handle.resolve(&*scene, holder.container) {
      scene.destroy(object)?;
      *destroyed += 1;
    }
  }
  Ok(())
}

/// Whether element `index` already holds the group's payload.
fn unchanged(cached: &[ElementData], group: &PlannedGroup<'_>, index: usize) -> bool {
  cached
    .get(index)
    .is_some_and(|element| element.same_bits(&group.elements[index]))
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;
