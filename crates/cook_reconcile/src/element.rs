//! Per-element payload extraction.
//!
//! Payloads are computed for every surviving group before any holder is
//! touched. The work is pure (attribute reads + math), so large passes fan it
//! out over rayon and join before the mutation phase starts.

use glam::{Affine3A, Quat, Vec3};
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::attribute::{Attribute, AttributeSource};
use crate::config::AttributeNames;
use crate::error::SourceError;
use crate::part::Part;
use crate::types::AttributeOwner;

/// Data written into one element of a persistent object.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementData {
  pub transform: Affine3A,
  /// Resolved material reference; `None` keeps the object's default.
  pub material: Option<String>,
  pub custom: SmallVec<[f32; 4]>,
}

impl ElementData {
  /// Bitwise equality. Unlike `==`, a NaN compares equal to the same NaN, so
  /// an unchanged payload is recognised as unchanged.
  pub fn same_bits(&self, other: &Self) -> bool {
    let transform = |data: &ElementData| data.transform.to_cols_array().map(f32::to_bits);
    transform(self) == transform(other)
      && self.material == other.material
      && self.custom.len() == other.custom.len()
      && self
        .custom
        .iter()
        .zip(&other.custom)
        .all(|(a, b)| a.to_bits() == b.to_bits())
  }
}

impl Default for ElementData {
  fn default() -> Self {
    Self {
      transform: Affine3A::IDENTITY,
      material: None,
      custom: SmallVec::new(),
    }
  }
}

/// Payload attributes of one part, fetched up front.
#[derive(Clone, Debug, Default)]
pub struct ElementReader {
  position: Option<Attribute>,
  orient: Option<Attribute>,
  scale: Option<Attribute>,
  pscale: Option<Attribute>,
  material: Option<Attribute>,
  custom: Option<Attribute>,
}

impl ElementReader {
  /// Fetch every payload attribute of `part` (generator I/O happens here).
  pub fn fetch<A: AttributeSource + ?Sized>(
    source: &A,
    part: &Part,
    names: &AttributeNames,
  ) -> Result<Self, SourceError> {
    Ok(Self {
      position: source.find_attribute(part, &names.position, Some(AttributeOwner::Point))?,
      orient: source.find_attribute(part, &names.orient, None)?,
      scale: source.find_attribute(part, &names.scale, None)?,
      pscale: source.find_attribute(part, &names.pscale, None)?,
      material: source.find_attribute(part, &names.material, Some(AttributeOwner::Primitive))?,
      custom: source.find_attribute(part, &names.custom_floats, None)?,
    })
  }

  /// Payload of one primitive. Missing or malformed values fall back to
  /// identity / defaults.
  pub fn read(&self, part: &Part, prim: u32) -> ElementData {
    let vec3 = |attr: &Option<Attribute>| {
      attr
        .as_ref()
        .and_then(|a| a.floats_for(part, prim))
        .filter(|v| v.len() >= 3)
        .map(|v| Vec3::new(v[0], v[1], v[2]))
    };

    let translation = vec3(&self.position).unwrap_or(Vec3::ZERO);
    let rotation = self
      .orient
      .as_ref()
      .and_then(|a| a.floats_for(part, prim))
      .filter(|v| v.len() >= 4)
      .map(|v| Quat::from_xyzw(v[0], v[1], v[2], v[3]))
      .filter(|q| q.length_squared() > f32::EPSILON)
      .map_or(Quat::IDENTITY, Quat::normalize);
    let uniform = self
      .pscale
      .as_ref()
      .and_then(|a| a.floats_for(part, prim))
      .and_then(|v| v.first().copied())
      .unwrap_or(1.0);
    let scale = vec3(&self.scale).unwrap_or(Vec3::ONE) * uniform;

    ElementData {
      transform: Affine3A::from_scale_rotation_translation(scale, rotation, translation),
      material: self
        .material
        .as_ref()
        .and_then(|a| a.str_for(part, prim))
        .filter(|m| !m.is_empty())
        .map(|m| m.into_owned()),
      custom: self
        .custom
        .as_ref()
        .and_then(|a| a.floats_for(part, prim))
        .map(SmallVec::from_slice)
        .unwrap_or_default(),
    }
  }

  /// Payloads of a group, in primitive order.
  pub fn read_all(&self, part: &Part, prims: &[u32]) -> Vec<ElementData> {
    prims.iter().map(|&prim| self.read(part, prim)).collect()
  }
}

/// Work item for [`extract_payloads`].
pub struct PayloadJob<'a> {
  pub reader: &'a ElementReader,
  pub part: &'a Part,
  pub primitives: &'a [u32],
}

/// Compute payloads for every job, in parallel once `jobs.len()` reaches
/// `parallel_threshold`. Output order matches job order.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "element::extract"))]
pub fn extract_payloads(jobs: &[PayloadJob<'_>], parallel_threshold: usize) -> Vec<Vec<ElementData>> {
  if jobs.len() >= parallel_threshold.max(1) {
    jobs
      .par_iter()
      .map(|job| job.reader.read_all(job.part, job.primitives))
      .collect()
  } else {
    jobs
      .iter()
      .map(|job| job.reader.read_all(job.part, job.primitives))
      .collect()
  }
}

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;
