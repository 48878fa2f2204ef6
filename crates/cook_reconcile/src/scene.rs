//! SceneGraph - callback interface for engine bridges.
//!
//! The reconciler never owns engine objects. Everything it does to the
//! persistent scene goes through these traits, so the core stays independent
//! of any specific engine and can be driven headless by
//! [`MemoryScene`](crate::memory::MemoryScene).

use crate::attribute::AttributeSource;
use crate::element::ElementData;
use crate::error::SceneError;
use crate::holder::ObjectHandle;
use crate::kind::IdentityKey;
use crate::part::Part;
use crate::types::{ContainerRef, ObjectRef};

/// What an asset reference resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetClass {
  /// Renderable mesh; instanced through a batched instance object.
  Mesh,
  /// Component template; instanced as one component per element.
  Component,
  /// Actor/prefab template; instanced as one actor per element.
  Actor,
  /// Material; only used as per-element payload.
  Material,
}

/// Asset lookup collaborator.
pub trait AssetResolver {
  /// `None` when the reference does not resolve to a loadable asset.
  fn resolve_asset(&self, reference: &str) -> Option<AssetClass>;
}

/// Persistent-object collaborator.
///
/// Implementations are called only from the thread that owns the scene and
/// only after all data-parallel work of a pass has joined.
///
/// # Example (engine bridge)
///
/// ```ignore
/// impl SceneGraph for EditorScene {
///     fn create_object(&mut self, identity: &IdentityKey, container: ContainerRef)
///         -> Result<ObjectHandle, SceneError> {
///         let entity = self.spawn_for(identity, container)?;
///         Ok(ObjectHandle::new(entity.into(), entity.stable_name()))
///     }
///     // ...
/// }
/// ```
pub trait SceneGraph: AssetResolver {
  /// Create a dedicated container for a split.
  fn create_container(&mut self, label: &str) -> Result<ContainerRef, SceneError>;

  /// Remove a container created by [`create_container`](Self::create_container).
  /// Only called when rolling back a failed pass, after its objects are gone.
  fn destroy_container(&mut self, container: ContainerRef) -> Result<(), SceneError>;

  /// False once the container was removed from the scene.
  fn container_alive(&self, container: ContainerRef) -> bool;

  /// Allocate an empty object of the identity's kind inside `container`.
  ///
  /// The returned handle carries the object's stable name, used later to
  /// re-resolve it if the reference goes stale.
  fn create_object(
    &mut self,
    identity: &IdentityKey,
    container: ContainerRef,
  ) -> Result<ObjectHandle, SceneError>;

  /// Set the element count of a single batched object.
  ///
  /// Existing elements below `count` keep their storage; excess elements are
  /// dropped from the tail.
  fn resize(&mut self, object: ObjectRef, count: usize) -> Result<(), SceneError>;

  /// Overwrite one element's payload.
  fn write_element(
    &mut self,
    object: ObjectRef,
    index: usize,
    data: &ElementData,
  ) -> Result<(), SceneError>;

  /// Release an object and any secondary registrations it holds.
  fn destroy(&mut self, object: ObjectRef) -> Result<(), SceneError>;

  /// False once the object was deleted (by us or externally).
  fn object_alive(&self, object: ObjectRef) -> bool;

  /// Name registry lookup used for weak-reference re-resolution.
  fn find_object(&self, container: ContainerRef, name: &str) -> Option<ObjectRef>;
}

// =============================================================================
// PropertyBridge
// =============================================================================

/// Which generator entry an element was populated from.
#[derive(Clone, Copy, Debug)]
pub struct ElementBinding<'a> {
  pub part: &'a Part,
  pub primitive: u32,
  /// Element slot inside the object (0 for array holders).
  pub element: usize,
}

/// Copies arbitrary named attributes onto object properties.
///
/// Called once per written element, after the core payload is in place.
pub trait PropertyBridge {
  fn apply(&mut self, object: ObjectRef, source: &dyn AttributeSource, binding: ElementBinding<'_>);
}

/// No-op bridge for testing and headless operation.
pub struct NullBridge;

impl PropertyBridge for NullBridge {
  fn apply(
    &mut self,
    _object: ObjectRef,
    _source: &dyn AttributeSource,
    _binding: ElementBinding<'_>,
  ) {
    // No-op
  }
}
