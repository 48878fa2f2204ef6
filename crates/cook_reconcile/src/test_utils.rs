//! Test utilities shared by the module tests.
//!
//! Provides part/attribute fixtures and a helper that builds holders backed by
//! real objects in a [`MemoryScene`].

use crate::attribute::Attribute;
use crate::element::ElementData;
use crate::holder::{Holder, HolderObjects};
use crate::kind::{IdentityKey, InstanceMode, MeshClass, ObjectLayout};
use crate::memory::{MemoryScene, MemorySource};
use crate::part::Part;
use crate::scene::SceneGraph;
use crate::types::{AttributeOwner, ContainerRef, HolderId, PartId, SplitKey};

// =============================================================================
// Identity keys
// =============================================================================

pub fn mesh_key() -> IdentityKey {
  IdentityKey::Mesh {
    class: MeshClass::Static,
    lod: 0,
  }
}

pub fn terrain_key(layer: &str) -> IdentityKey {
  IdentityKey::Terrain {
    layer: layer.into(),
  }
}

pub fn actor_key(asset: &str) -> IdentityKey {
  IdentityKey::Instancer {
    asset: asset.into(),
    mode: InstanceMode::Actors,
  }
}

// =============================================================================
// Parts and sources
// =============================================================================

/// `count` disjoint triangles.
pub fn triangles(id: PartId, count: usize) -> Part {
  let faces = vec![3u32; count];
  let vertex_points = (0..count as u32 * 3).collect();
  Part::from_faces(id, &faces, vertex_points).unwrap()
}

/// Source splitting part `part` by a primitive string attribute `split`.
pub fn split_source(part: PartId, splits: &[&str]) -> MemorySource {
  MemorySource::new()
    .with(part, Attribute::string("split_attr", AttributeOwner::Detail, ["split"]))
    .with(
      part,
      Attribute::string("split", AttributeOwner::Primitive, splits.iter().copied()),
    )
}

/// Adds a primitive update-mode attribute to a source.
pub fn with_modes(source: MemorySource, part: PartId, modes: &[i64]) -> MemorySource {
  source.with(
    part,
    Attribute::int("partial_output_mode", AttributeOwner::Primitive, modes.to_vec()),
  )
}

/// `n` copies of the same split label.
pub fn repeat<'a>(label: &'a str, n: usize) -> Vec<&'a str> {
  vec![label; n]
}

// =============================================================================
// Holders
// =============================================================================

/// Holder backed by freshly created objects, with `count` default elements.
pub fn make_holder(
  scene: &mut MemoryScene,
  container: ContainerRef,
  split_key: SplitKey,
  identity: IdentityKey,
  count: usize,
) -> Holder {
  let objects = match identity.layout() {
    ObjectLayout::Single => {
      let handle = scene.create_object(&identity, container).unwrap();
      let object = handle.resolve(&*scene, container).unwrap();
      scene.resize(object, count).unwrap();
      HolderObjects::Single(handle)
    }
    ObjectLayout::Array => HolderObjects::Array(
      (0..count)
        .map(|_| scene.create_object(&identity, container).unwrap())
        .collect(),
    ),
  };

  Holder {
    id: HolderId::new(),
    split_key,
    split_to_container: false,
    container,
    identity,
    objects,
    elements: vec![ElementData::default(); count],
  }
}
