//! Output kinds and their identity keys.
//!
//! The driver is generic over [`OutputKind`] and only reaches kind-specific
//! behaviour through this module:
//!
//! ```text
//!              identity key               layout      compatible when
//! Mesh       (class, lod)                 single      class + lod equal
//! Instancer  (asset, mode)                single|array asset + mode equal
//! Curve      (class, closed)              single      class equal
//! Terrain    (layer)                      single      layer equal
//! ```

use crate::attribute::{Attribute, AttributeSource};
use crate::config::AttributeNames;
use crate::error::SourceError;
use crate::part::Part;
use crate::scene::{AssetClass, AssetResolver};
use crate::types::AttributeOwner;

/// Kind of persistent output a node produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputKind {
  Mesh,
  Instancer,
  Curve,
  Terrain,
}

/// Mesh object flavour (`mesh_output_type`, clamped to 0..=2).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MeshClass {
  #[default]
  Static,
  Dynamic,
  Editable,
}

impl MeshClass {
  pub fn from_int(value: i64) -> Self {
    match value.clamp(0, 2) {
      0 => MeshClass::Static,
      1 => MeshClass::Dynamic,
      _ => MeshClass::Editable,
    }
  }
}

/// How instances of one asset are realised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstanceMode {
  /// One instance-array object.
  Batched,
  /// One hierarchical (culling-friendly) instance-array object.
  Hierarchical,
  /// One component object per instance.
  Components,
  /// One actor object per instance.
  Actors,
}

/// Whether a holder owns one batched object or an array of objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectLayout {
  Single,
  Array,
}

/// Kind-specific identity distinguishing sub-groups within one split.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKey {
  Mesh { class: MeshClass, lod: i32 },
  Instancer { asset: String, mode: InstanceMode },
  Curve { class: String, closed: bool },
  Terrain { layer: String },
}

impl IdentityKey {
  pub fn kind(&self) -> OutputKind {
    match self {
      IdentityKey::Mesh { .. } => OutputKind::Mesh,
      IdentityKey::Instancer { .. } => OutputKind::Instancer,
      IdentityKey::Curve { .. } => OutputKind::Curve,
      IdentityKey::Terrain { .. } => OutputKind::Terrain,
    }
  }

  pub fn layout(&self) -> ObjectLayout {
    match self {
      IdentityKey::Instancer {
        mode: InstanceMode::Components | InstanceMode::Actors,
        ..
      } => ObjectLayout::Array,
      _ => ObjectLayout::Single,
    }
  }
}

/// LOD value reserved for collision geometry.
pub const COLLISION_LOD: i32 = -1;

impl OutputKind {
  /// Owner the split attribute is looked up on first.
  pub fn preferred_owner(self) -> AttributeOwner {
    match self {
      OutputKind::Instancer => AttributeOwner::Point,
      _ => AttributeOwner::Primitive,
    }
  }

  /// Only polygonal output cares about repeated points.
  pub fn rejects_repeated_points(self) -> bool {
    matches!(self, OutputKind::Mesh)
  }

  /// Whether a holder built for `existing` can be repurposed for `candidate`.
  pub fn compatible(self, existing: &IdentityKey, candidate: &IdentityKey) -> bool {
    match (existing, candidate) {
      (
        IdentityKey::Mesh { class: a, lod: la },
        IdentityKey::Mesh { class: b, lod: lb },
      ) => a == b && la == lb,
      (
        IdentityKey::Instancer { asset: a, mode: ma },
        IdentityKey::Instancer { asset: b, mode: mb },
      ) => a == b && ma == mb,
      // Closedness is a mutable property of the spline object.
      (IdentityKey::Curve { class: a, .. }, IdentityKey::Curve { class: b, .. }) => a == b,
      (IdentityKey::Terrain { layer: a }, IdentityKey::Terrain { layer: b }) => a == b,
      _ => false,
    }
  }

  /// Best-fit score: `None` when incompatible, otherwise the element count
  /// delta (0 is a perfect match).
  pub fn score(
    self,
    existing: &IdentityKey,
    existing_count: usize,
    candidate: &IdentityKey,
    candidate_count: usize,
  ) -> Option<usize> {
    self
      .compatible(existing, candidate)
      .then(|| existing_count.abs_diff(candidate_count))
  }

  /// Fetch the attributes this kind derives identity keys from.
  pub fn identity_extractor<A: AttributeSource + ?Sized>(
    self,
    source: &A,
    part: &Part,
    names: &AttributeNames,
  ) -> Result<IdentityExtractor, SourceError> {
    let fetch = |name: &str| source.find_attribute(part, name, Some(self.preferred_owner()));
    let (primary, secondary) = match self {
      OutputKind::Mesh => (fetch(&names.mesh_class)?, fetch(&names.lod)?),
      OutputKind::Instancer => (fetch(&names.instance)?, fetch(&names.instance_mode)?),
      OutputKind::Curve => (fetch(&names.curve_class)?, fetch(&names.curve_closed)?),
      OutputKind::Terrain => (fetch(&names.layer)?, None),
    };
    Ok(IdentityExtractor {
      kind: self,
      primary,
      secondary,
    })
  }
}

// =============================================================================
// IdentityExtractor
// =============================================================================

/// Per-part identity-key extraction with its attributes already fetched.
#[derive(Clone, Debug)]
pub struct IdentityExtractor {
  kind: OutputKind,
  primary: Option<Attribute>,
  secondary: Option<Attribute>,
}

impl IdentityExtractor {
  /// Identity key of one primitive; `None` drops it from grouping.
  pub fn extract<R: AssetResolver + ?Sized>(
    &self,
    part: &Part,
    prim: u32,
    resolver: &R,
  ) -> Option<IdentityKey> {
    let int = |attr: &Option<Attribute>| attr.as_ref().and_then(|a| a.int_for(part, prim));
    let text = |attr: &Option<Attribute>| {
      attr
        .as_ref()
        .and_then(|a| a.str_for(part, prim))
        .map(|s| s.into_owned())
    };

    match self.kind {
      OutputKind::Mesh => {
        let class = int(&self.primary).map(MeshClass::from_int).unwrap_or_default();
        let lod = int(&self.secondary).map_or(0, |lod| lod.max(COLLISION_LOD as i64) as i32);
        // Dynamic meshes have no LOD chain; editable meshes have neither LODs
        // nor collision.
        let supported = match class {
          MeshClass::Static => true,
          MeshClass::Dynamic => lod < 1,
          MeshClass::Editable => lod == 0,
        };
        supported.then_some(IdentityKey::Mesh { class, lod })
      }
      OutputKind::Instancer => {
        let reference = text(&self.primary)?;
        let asset = strip_reference(&reference);
        if asset.is_empty() {
          return None;
        }
        let mode = match resolver.resolve_asset(asset)? {
          AssetClass::Actor => InstanceMode::Actors,
          AssetClass::Component => InstanceMode::Components,
          AssetClass::Mesh if int(&self.secondary).unwrap_or(0) >= 1 => InstanceMode::Hierarchical,
          AssetClass::Mesh => InstanceMode::Batched,
          AssetClass::Material => return None,
        };
        Some(IdentityKey::Instancer {
          asset: asset.to_owned(),
          mode,
        })
      }
      OutputKind::Curve => Some(IdentityKey::Curve {
        class: text(&self.primary)
          .filter(|class| !class.is_empty())
          .unwrap_or_else(|| "spline".into()),
        closed: int(&self.secondary).unwrap_or(0) >= 1,
      }),
      OutputKind::Terrain => Some(IdentityKey::Terrain {
        layer: text(&self.primary)
          .filter(|layer| !layer.is_empty())
          .unwrap_or_else(|| "height".into()),
      }),
    }
  }
}

/// Asset references may carry a `;`-separated suffix (e.g. a sub-object); only
/// the leading path identifies the asset.
fn strip_reference(reference: &str) -> &str {
  reference.split(';').next().unwrap_or_default().trim()
}

#[cfg(test)]
#[path = "kind_test.rs"]
mod kind_test;
