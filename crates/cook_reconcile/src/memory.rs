//! In-memory collaborators for headless operation, tests, and benches.
//!
//! [`MemoryScene`] is a minimal scene graph with a name registry, asset table,
//! operation counters, and one-shot failure injection. [`MemorySource`] serves
//! attributes from a map keyed by part.

use std::collections::{HashMap, HashSet};

use crate::attribute::{Attribute, AttributeSource};
use crate::element::ElementData;
use crate::error::{SceneError, SourceError};
use crate::holder::ObjectHandle;
use crate::kind::{IdentityKey, ObjectLayout};
use crate::part::Part;
use crate::scene::{AssetClass, AssetResolver, SceneGraph};
use crate::types::{AttributeOwner, ContainerRef, ObjectRef, PartId};

// =============================================================================
// MemoryScene
// =============================================================================

/// One object living in a [`MemoryScene`].
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryObject {
  pub name: String,
  pub container: ContainerRef,
  pub identity: IdentityKey,
  /// `None` until the slot is first written.
  pub elements: Vec<Option<ElementData>>,
}

/// Running totals of scene mutations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCounters {
  pub containers_created: usize,
  pub containers_destroyed: usize,
  pub objects_created: usize,
  pub objects_destroyed: usize,
  pub elements_created: usize,
  pub elements_destroyed: usize,
  pub element_writes: usize,
}

/// Collaborator call that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
  CreateContainer,
  CreateObject,
  Resize,
  WriteElement,
  Destroy,
}

/// Scene graph kept entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
  next_id: u64,
  containers: HashMap<ContainerRef, String>,
  objects: HashMap<ObjectRef, MemoryObject>,
  registry: HashMap<(ContainerRef, String), ObjectRef>,
  assets: HashMap<String, AssetClass>,
  counters: SceneCounters,
  /// Fail the call at `point` after `remaining` more successes.
  fail: Option<(FailPoint, usize)>,
}

impl MemoryScene {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an asset the resolver should know about.
  pub fn with_asset(mut self, reference: &str, class: AssetClass) -> Self {
    self.assets.insert(reference.to_owned(), class);
    self
  }

  /// Create a container outside of any pass (e.g. a node's root).
  pub fn add_root(&mut self, label: &str) -> ContainerRef {
    let container = ContainerRef::from_raw(self.allocate());
    self.containers.insert(container, label.to_owned());
    container
  }

  /// Make the `skip + 1`-th call at `point` fail.
  pub fn fail_on(&mut self, point: FailPoint, skip: usize) {
    self.fail = Some((point, skip));
  }

  pub fn counters(&self) -> SceneCounters {
    self.counters
  }

  pub fn reset_counters(&mut self) {
    self.counters = SceneCounters::default();
  }

  pub fn object(&self, object: ObjectRef) -> Option<&MemoryObject> {
    self.objects.get(&object)
  }

  pub fn object_count(&self) -> usize {
    self.objects.len()
  }

  pub fn container_label(&self, container: ContainerRef) -> Option<&str> {
    self.containers.get(&container).map(String::as_str)
  }

  pub fn objects_in(&self, container: ContainerRef) -> usize {
    self
      .objects
      .values()
      .filter(|object| object.container == container)
      .count()
  }

  /// Simulate a user deleting an object behind the reconciler's back.
  pub fn delete_object(&mut self, object: ObjectRef) -> bool {
    match self.objects.remove(&object) {
      Some(removed) => {
        self.registry.remove(&(removed.container, removed.name));
        true
      }
      None => false,
    }
  }

  /// Simulate an object being reloaded under the same name (new reference).
  pub fn replace_object(&mut self, object: ObjectRef) -> Option<ObjectRef> {
    let existing = self.objects.remove(&object)?;
    let replacement = ObjectRef::from_raw(self.allocate());
    self
      .registry
      .insert((existing.container, existing.name.clone()), replacement);
    self.objects.insert(replacement, existing);
    Some(replacement)
  }

  /// Simulate a container (and everything inside it) being deleted.
  pub fn delete_container(&mut self, container: ContainerRef) {
    self.containers.remove(&container);
    self.objects.retain(|_, object| object.container != container);
    self.registry.retain(|(owner, _), _| *owner != container);
  }

  fn allocate(&mut self) -> u64 {
    self.next_id += 1;
    self.next_id
  }

  fn should_fail(&mut self, point: FailPoint) -> bool {
    match &mut self.fail {
      Some((armed, remaining)) if *armed == point => {
        if *remaining == 0 {
          self.fail = None;
          true
        } else {
          *remaining -= 1;
          false
        }
      }
      _ => false,
    }
  }

  fn object_mut(&mut self, object: ObjectRef) -> Result<&mut MemoryObject, SceneError> {
    self
      .objects
      .get_mut(&object)
      .ok_or(SceneError::MissingObject(object))
  }
}

impl AssetResolver for MemoryScene {
  fn resolve_asset(&self, reference: &str) -> Option<AssetClass> {
    self.assets.get(reference).copied()
  }
}

impl SceneGraph for MemoryScene {
  fn create_container(&mut self, label: &str) -> Result<ContainerRef, SceneError> {
    if self.should_fail(FailPoint::CreateContainer) {
      return Err(SceneError::ContainerCreate {
        label: label.to_owned(),
        reason: "injected failure".into(),
      });
    }
    self.counters.containers_created += 1;
    Ok(self.add_root(label))
  }

  fn destroy_container(&mut self, container: ContainerRef) -> Result<(), SceneError> {
    if !self.container_alive(container) {
      return Err(SceneError::ContainerDestroy {
        container,
        reason: "no such container".into(),
      });
    }
    self.delete_container(container);
    self.counters.containers_destroyed += 1;
    Ok(())
  }

  fn container_alive(&self, container: ContainerRef) -> bool {
    self.containers.contains_key(&container)
  }

  fn create_object(
    &mut self,
    identity: &IdentityKey,
    container: ContainerRef,
  ) -> Result<ObjectHandle, SceneError> {
    if self.should_fail(FailPoint::CreateObject) || !self.container_alive(container) {
      return Err(SceneError::ObjectCreate {
        container,
        reason: "injected failure or dead container".into(),
      });
    }

    let raw = self.allocate();
    let object = ObjectRef::from_raw(raw);
    let name = format!("{:?}_{raw}", identity.kind()).to_lowercase();
    // Array holders own one element per object.
    let slots = match identity.layout() {
      ObjectLayout::Single => 0,
      ObjectLayout::Array => 1,
    };

    self.objects.insert(
      object,
      MemoryObject {
        name: name.clone(),
        container,
        identity: identity.clone(),
        elements: vec![None; slots],
      },
    );
    self.registry.insert((container, name.clone()), object);
    self.counters.objects_created += 1;
    Ok(ObjectHandle::new(object, name))
  }

  fn resize(&mut self, object: ObjectRef, count: usize) -> Result<(), SceneError> {
    if self.should_fail(FailPoint::Resize) {
      return Err(SceneError::Resize {
        object,
        count,
        reason: "injected failure".into(),
      });
    }
    let target = self.object_mut(object)?;
    let previous = target.elements.len();
    target.elements.resize(count, None);
    if count > previous {
      self.counters.elements_created += count - previous;
    } else {
      self.counters.elements_destroyed += previous - count;
    }
    Ok(())
  }

  fn write_element(
    &mut self,
    object: ObjectRef,
    index: usize,
    data: &ElementData,
  ) -> Result<(), SceneError> {
    if self.should_fail(FailPoint::WriteElement) {
      return Err(SceneError::Write {
        object,
        index,
        reason: "injected failure".into(),
      });
    }
    let target = self.object_mut(object)?;
    let slot = target.elements.get_mut(index).ok_or_else(|| SceneError::Write {
      object,
      index,
      reason: "element index out of range".into(),
    })?;
    *slot = Some(data.clone());
    self.counters.element_writes += 1;
    Ok(())
  }

  fn destroy(&mut self, object: ObjectRef) -> Result<(), SceneError> {
    if self.should_fail(FailPoint::Destroy) {
      return Err(SceneError::Destroy {
        object,
        reason: "injected failure".into(),
      });
    }
    if !self.delete_object(object) {
      return Err(SceneError::MissingObject(object));
    }
    self.counters.objects_destroyed += 1;
    Ok(())
  }

  fn object_alive(&self, object: ObjectRef) -> bool {
    self.objects.contains_key(&object)
  }

  fn find_object(&self, container: ContainerRef, name: &str) -> Option<ObjectRef> {
    self.registry.get(&(container, name.to_owned())).copied()
  }
}

// =============================================================================
// MemorySource
// =============================================================================

/// Attribute source serving prebuilt attributes per part.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
  attributes: HashMap<PartId, Vec<Attribute>>,
  failing: HashSet<(PartId, String)>,
}

impl MemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder form of [`insert`](Self::insert).
  pub fn with(mut self, part: PartId, attribute: Attribute) -> Self {
    self.insert(part, attribute);
    self
  }

  /// Add an attribute, replacing one with the same name and owner.
  pub fn insert(&mut self, part: PartId, attribute: Attribute) {
    let list = self.attributes.entry(part).or_default();
    list.retain(|a| !(a.name == attribute.name && a.owner == attribute.owner));
    list.push(attribute);
  }

  /// Make every fetch of `name` on `part` fail.
  pub fn failing_on(mut self, part: PartId, name: &str) -> Self {
    self.failing.insert((part, name.to_owned()));
    self
  }

  pub fn clear_failures(&mut self) {
    self.failing.clear();
  }
}

impl AttributeSource for MemorySource {
  fn get_attribute(
    &self,
    part: &Part,
    name: &str,
    owner: AttributeOwner,
  ) -> Result<Option<Attribute>, SourceError> {
    if self.failing.contains(&(part.id, name.to_owned())) {
      return Err(SourceError::Fetch {
        part: part.id,
        name: name.to_owned(),
        reason: "generator session lost".into(),
      });
    }
    Ok(self.attributes.get(&part.id).and_then(|list| {
      list
        .iter()
        .find(|a| a.name == name && a.owner == owner)
        .cloned()
    }))
  }
}
