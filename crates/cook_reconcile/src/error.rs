//! Error types for a reconciliation pass.
//!
//! Only collaborator failures surface here. Data-quality problems (degenerate
//! primitives, unresolved assets) are recovered locally and logged instead.

use thiserror::Error;

use crate::types::{ContainerRef, ObjectRef, PartId};

/// Failure reported by the attribute source (generator I/O).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error("failed to fetch attribute `{name}` on part {part}: {reason}")]
  Fetch {
    part: PartId,
    name: String,
    reason: String,
  },

  #[error("part {part} has inconsistent topology: {reason}")]
  Topology { part: PartId, reason: String },
}

/// Failure reported by the persistent-object collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
  #[error("could not create container `{label}`: {reason}")]
  ContainerCreate { label: String, reason: String },

  #[error("could not destroy container {container:?}: {reason}")]
  ContainerDestroy {
    container: ContainerRef,
    reason: String,
  },

  #[error("could not create object in container {container:?}: {reason}")]
  ObjectCreate {
    container: ContainerRef,
    reason: String,
  },

  #[error("could not resize object {object:?} to {count} elements: {reason}")]
  Resize {
    object: ObjectRef,
    count: usize,
    reason: String,
  },

  #[error("could not write element {index} of object {object:?}: {reason}")]
  Write {
    object: ObjectRef,
    index: usize,
    reason: String,
  },

  #[error("could not destroy object {object:?}: {reason}")]
  Destroy { object: ObjectRef, reason: String },

  #[error("object {0:?} does not exist")]
  MissingObject(ObjectRef),
}

/// Any failure that aborts a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
  #[error("attribute source failed: {0}")]
  Source(#[from] SourceError),

  #[error("scene collaborator failed: {0}")]
  Scene(#[from] SceneError),
}
