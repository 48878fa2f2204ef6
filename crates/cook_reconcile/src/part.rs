//! Part topology - the read-only geometry handed over by one cook.
//!
//! Only the connectivity needed to remap attributes onto primitives is kept:
//!
//! ```text
//! primitive p ──► vertices [starts[p] .. starts[p+1])
//!                     │
//!                     └──► vertex_points[v] = point index
//! ```

use std::ops::Range;

use crate::error::SourceError;
use crate::types::{AttributeOwner, PartId};

/// One unit of generated geometry for one cook pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
  /// Generator-assigned part identifier.
  pub id: PartId,
  /// Vertex index → point index.
  vertex_points: Vec<u32>,
  /// Prefix sums of per-primitive vertex counts (len = primitives + 1).
  starts: Vec<u32>,
  point_count: usize,
}

impl Part {
  /// Build a part from per-primitive vertex counts and the vertex → point
  /// list.
  pub fn from_faces(
    id: PartId,
    face_counts: &[u32],
    vertex_points: Vec<u32>,
  ) -> Result<Self, SourceError> {
    let mut starts = Vec::with_capacity(face_counts.len() + 1);
    let mut total = 0u32;
    starts.push(0);
    for &count in face_counts {
      total = total.checked_add(count).ok_or_else(|| SourceError::Topology {
        part: id,
        reason: "face vertex counts overflow".into(),
      })?;
      starts.push(total);
    }

    if total as usize != vertex_points.len() {
      return Err(SourceError::Topology {
        part: id,
        reason: format!(
          "face counts cover {total} vertices but the vertex list has {}",
          vertex_points.len()
        ),
      });
    }

    let point_count = vertex_points
      .iter()
      .copied()
      .max()
      .map_or(0, |max| max as usize + 1);

    Ok(Self {
      id,
      vertex_points,
      starts,
      point_count,
    })
  }

  /// Point cloud: every point is a single-vertex primitive.
  pub fn point_cloud(id: PartId, count: usize) -> Self {
    Self {
      id,
      vertex_points: (0..count as u32).collect(),
      starts: (0..=count as u32).collect(),
      point_count: count,
    }
  }

  #[inline]
  pub fn primitive_count(&self) -> usize {
    self.starts.len() - 1
  }

  #[inline]
  pub fn vertex_count(&self) -> usize {
    self.vertex_points.len()
  }

  #[inline]
  pub fn point_count(&self) -> usize {
    self.point_count
  }

  /// Vertex index range of a primitive.
  #[inline]
  pub fn vertices(&self, prim: u32) -> Range<usize> {
    let p = prim as usize;
    self.starts[p] as usize..self.starts[p + 1] as usize
  }

  /// Point indices referenced by a primitive, in vertex order.
  #[inline]
  pub fn points(&self, prim: u32) -> &[u32] {
    &self.vertex_points[self.vertices(prim)]
  }

  /// Attribute entry that represents `prim` at the given granularity.
  ///
  /// Vertex and point attributes sample the primitive's first vertex; detail
  /// attributes broadcast entry 0. `None` for primitives with no vertices.
  pub fn entry_index(&self, owner: AttributeOwner, prim: u32) -> Option<usize> {
    match owner {
      AttributeOwner::Detail => Some(0),
      AttributeOwner::Primitive => Some(prim as usize),
      AttributeOwner::Vertex => {
        let range = self.vertices(prim);
        (!range.is_empty()).then_some(range.start)
      }
      AttributeOwner::Point => self.points(prim).first().map(|&point| point as usize),
    }
  }

  /// Degenerate primitive check.
  ///
  /// Empty primitives are always degenerate; with `reject_repeats`, so is any
  /// primitive referencing the same point twice.
  pub fn is_degenerate(&self, prim: u32, reject_repeats: bool) -> bool {
    let points = self.points(prim);
    if points.is_empty() {
      return true;
    }
    if !reject_repeats {
      return false;
    }
    points
      .iter()
      .enumerate()
      .any(|(i, point)| points[i + 1..].contains(point))
  }
}

#[cfg(test)]
#[path = "part_test.rs"]
mod part_test;
