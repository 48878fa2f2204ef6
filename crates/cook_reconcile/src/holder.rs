//! Holders - the only state that survives between cook passes.
//!
//! A [`Holder`] never owns its engine objects. It keeps weak
//! [`ObjectHandle`]s (reference + stable name) and re-resolves them through
//! the scene's name registry when the reference goes stale.
//!
//! ```text
//!   Absent ──create──► Created ──reuse──► Reused ─┐
//!                         │                 ▲     │ reuse
//!                         │                 └─────┘
//!                         └────────destroy────────► Destroyed
//! ```

use crate::element::ElementData;
use crate::kind::{IdentityKey, ObjectLayout};
use crate::scene::SceneGraph;
use crate::types::{ContainerRef, HolderId, ObjectRef, SplitKey};

// =============================================================================
// ObjectHandle - weak reference
// =============================================================================

/// Non-owning reference to an engine object.
///
/// Relation plus lookup, never ownership: `is_valid` and `resolve` are the
/// only ways to reach the object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHandle {
  object: ObjectRef,
  name: String,
}

impl ObjectHandle {
  pub fn new(object: ObjectRef, name: impl Into<String>) -> Self {
    Self {
      object,
      name: name.into(),
    }
  }

  /// Stable name used for re-resolution.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Reference as last seen; only meaningful for error reports and freshly
  /// created objects.
  pub(crate) fn last_known(&self) -> ObjectRef {
    self.object
  }

  /// True while the referenced object is still alive.
  pub fn is_valid<S: SceneGraph + ?Sized>(&self, scene: &S) -> bool {
    scene.object_alive(self.object)
  }

  /// The live object: the direct reference if valid, else whatever the scene
  /// registry holds under the stable name in `container`.
  pub fn resolve<S: SceneGraph + ?Sized>(
    &self,
    scene: &S,
    container: ContainerRef,
  ) -> Option<ObjectRef> {
    if self.is_valid(scene) {
      return Some(self.object);
    }
    scene
      .find_object(container, &self.name)
      .filter(|&object| scene.object_alive(object))
  }
}

// =============================================================================
// Holder
// =============================================================================

/// Engine objects backing a holder.
#[derive(Clone, Debug, PartialEq)]
pub enum HolderObjects {
  /// One object with `elements.len()` elements.
  Single(ObjectHandle),
  /// One object per element.
  Array(Vec<ObjectHandle>),
}

/// Persistent record pairing engine objects with their matching metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Holder {
  pub(crate) id: HolderId,
  pub(crate) split_key: SplitKey,
  pub(crate) split_to_container: bool,
  pub(crate) container: ContainerRef,
  pub(crate) identity: IdentityKey,
  pub(crate) objects: HolderObjects,
  /// Last payload written per element; drives idempotent rewrites.
  pub(crate) elements: Vec<ElementData>,
}

impl Holder {
  pub fn id(&self) -> HolderId {
    self.id
  }

  pub fn split_key(&self) -> &SplitKey {
    &self.split_key
  }

  pub fn split_to_container(&self) -> bool {
    self.split_to_container
  }

  pub fn container(&self) -> ContainerRef {
    self.container
  }

  pub fn identity(&self) -> &IdentityKey {
    &self.identity
  }

  pub fn objects(&self) -> &HolderObjects {
    &self.objects
  }

  pub fn layout(&self) -> ObjectLayout {
    match self.objects {
      HolderObjects::Single(_) => ObjectLayout::Single,
      HolderObjects::Array(_) => ObjectLayout::Array,
    }
  }

  #[inline]
  pub fn element_count(&self) -> usize {
    self.elements.len()
  }

  pub fn elements(&self) -> &[ElementData] {
    &self.elements
  }

  /// Every object reference currently recorded (possibly stale).
  pub fn object_refs(&self) -> Vec<ObjectRef> {
    match &self.objects {
      HolderObjects::Single(handle) => vec![handle.object],
      HolderObjects::Array(handles) => handles.iter().map(|h| h.object).collect(),
    }
  }

  /// Re-resolve every handle, dropping elements whose object is gone.
  ///
  /// Returns false when nothing of the holder survives; such a holder was
  /// deleted externally and must not be reused (or destroyed again).
  pub fn revalidate<S: SceneGraph + ?Sized>(&mut self, scene: &S) -> bool {
    let container = self.container;
    match &mut self.objects {
      HolderObjects::Single(handle) => match handle.resolve(scene, container) {
        Some(object) => {
          handle.object = object;
          true
        }
        None => false,
      },
      HolderObjects::Array(handles) => {
        let mut kept = Vec::with_capacity(handles.len());
        let mut kept_elements = Vec::with_capacity(handles.len());
        for (mut handle, element) in handles.drain(..).zip(self.elements.drain(..)) {
          if let Some(object) = handle.resolve(scene, container) {
            handle.object = object;
            kept.push(handle);
            kept_elements.push(element);
          }
        }
        *handles = kept;
        self.elements = kept_elements;
        !handles.is_empty()
      }
    }
  }
}

// =============================================================================
// HolderPool
// =============================================================================

/// Insertion-ordered holder collection with O(1) removal-on-match.
///
/// Removed holders leave a hole so iteration order (which decides ties in
/// the matcher) is never disturbed.
#[derive(Clone, Debug, Default)]
pub struct HolderPool {
  slots: Vec<Option<Holder>>,
  live: usize,
}

impl HolderPool {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, holder: Holder) {
    self.slots.push(Some(holder));
    self.live += 1;
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.live
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.live == 0
  }

  /// Live holders in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = &Holder> {
    self.slots.iter().flatten()
  }

  /// Live holders with their slot index, in insertion order.
  pub(crate) fn iter_slots(&self) -> impl Iterator<Item = (usize, &Holder)> {
    self
      .slots
      .iter()
      .enumerate()
      .filter_map(|(slot, holder)| holder.as_ref().map(|h| (slot, h)))
  }

  /// Remove the holder in `slot`. A slot can be taken only once.
  pub(crate) fn take(&mut self, slot: usize) -> Option<Holder> {
    let holder = self.slots.get_mut(slot)?.take()?;
    self.live -= 1;
    Some(holder)
  }

  pub fn get(&self, id: HolderId) -> Option<&Holder> {
    self.iter().find(|holder| holder.id == id)
  }

  pub fn contains(&self, id: HolderId) -> bool {
    self.get(id).is_some()
  }

  /// Holders of one split, in insertion order.
  pub fn for_split<'a>(&'a self, key: &'a SplitKey) -> impl Iterator<Item = &'a Holder> + 'a {
    self.iter().filter(move |holder| &holder.split_key == key)
  }

  /// Remaining holders, in insertion order.
  pub fn into_holders(self) -> Vec<Holder> {
    self.slots.into_iter().flatten().collect()
  }
}

impl FromIterator<Holder> for HolderPool {
  fn from_iter<I: IntoIterator<Item = Holder>>(iter: I) -> Self {
    let mut pool = HolderPool::new();
    for holder in iter {
      pool.push(holder);
    }
    pool
  }
}

#[cfg(test)]
#[path = "holder_test.rs"]
mod holder_test;
