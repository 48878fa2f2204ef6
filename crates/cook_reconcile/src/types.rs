//! Core value types shared by every reconciliation stage.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// SplitKey
// =============================================================================

/// Logical output slice a primitive belongs to.
///
/// Derived from the split attribute. Primitives without a split attribute (or
/// with an empty string value) collapse onto [`SplitKey::Implicit`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SplitKey {
  /// No split attribute: the whole part is one slice.
  #[default]
  Implicit,
  /// Integer-valued split attribute.
  Int(i64),
  /// String-valued split attribute.
  Name(String),
}

impl SplitKey {
  /// Build a key from a string value, mapping the empty string to `Implicit`.
  pub fn from_name(value: &str) -> Self {
    if value.is_empty() {
      SplitKey::Implicit
    } else {
      SplitKey::Name(value.to_owned())
    }
  }

  #[inline]
  pub fn is_implicit(&self) -> bool {
    matches!(self, SplitKey::Implicit)
  }

  /// Label used when naming a dedicated container.
  ///
  /// The implicit key has no text of its own, so callers substitute the node
  /// label.
  pub fn label(&self) -> Option<String> {
    match self {
      SplitKey::Implicit => None,
      SplitKey::Int(value) => Some(value.to_string()),
      SplitKey::Name(name) => Some(name.clone()),
    }
  }
}

impl From<&str> for SplitKey {
  fn from(value: &str) -> Self {
    SplitKey::from_name(value)
  }
}

impl From<i64> for SplitKey {
  fn from(value: i64) -> Self {
    SplitKey::Int(value)
  }
}

impl fmt::Display for SplitKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SplitKey::Implicit => f.write_str("<implicit>"),
      SplitKey::Int(value) => write!(f, "{value}"),
      SplitKey::Name(name) => f.write_str(name),
    }
  }
}

// =============================================================================
// UpdateMode
// =============================================================================

/// Per-primitive request controlling incremental cooks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateMode {
  /// Full rebuild of the bucket (the default).
  #[default]
  Replace,
  /// Rebuild this bucket only; leave unmentioned buckets alone.
  Modify,
  /// Tear the bucket down.
  Remove,
}

impl UpdateMode {
  /// Integer encoding, clamped to `0..=2`.
  pub fn from_int(value: i64) -> Self {
    match value.clamp(0, 2) {
      0 => UpdateMode::Replace,
      1 => UpdateMode::Modify,
      _ => UpdateMode::Remove,
    }
  }

  /// Loose string encoding (case-insensitive substring match).
  ///
  /// `remove`/`del` win over the modify family; anything unrecognised is
  /// `Replace`.
  pub fn parse(value: &str) -> Self {
    let lower = value.to_ascii_lowercase();
    if lower.contains("remove") || lower.contains("del") {
      UpdateMode::Remove
    } else if ["partial", "update", "mod", "add", "append"]
      .iter()
      .any(|word| lower.contains(word))
    {
      UpdateMode::Modify
    } else {
      UpdateMode::Replace
    }
  }

  /// True for modes that make the whole pass incremental.
  #[inline]
  pub fn is_partial(self) -> bool {
    !matches!(self, UpdateMode::Replace)
  }
}

// =============================================================================
// AttributeOwner
// =============================================================================

/// Granularity an attribute is stored at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeOwner {
  Vertex,
  Point,
  Primitive,
  Detail,
}

impl AttributeOwner {
  /// Order used when an attribute's owner is not known up front.
  pub const SEARCH_ORDER: [AttributeOwner; 4] = [
    AttributeOwner::Vertex,
    AttributeOwner::Point,
    AttributeOwner::Primitive,
    AttributeOwner::Detail,
  ];
}

// =============================================================================
// Opaque scene handles
// =============================================================================

/// Engine-side container entity (owned by the scene graph, never by us).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerRef(u64);

impl ContainerRef {
  pub const fn from_raw(raw: u64) -> Self {
    Self(raw)
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

/// Engine-side object (mesh, instance array, spline, terrain patch, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef(u64);

impl ObjectRef {
  pub const fn from_raw(raw: u64) -> Self {
    Self(raw)
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

// =============================================================================
// HolderId - reference identity of a holder
// =============================================================================

/// Atomic counter for generating unique HolderIds.
static HOLDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque holder identifier.
///
/// Two holders are "reference-identical" across passes exactly when their ids
/// match. Generated atomically - unique within process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HolderId(u64);

impl HolderId {
  /// Generate a new unique HolderId.
  pub fn new() -> Self {
    Self(HOLDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  /// Get the raw ID value.
  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for HolderId {
  fn default() -> Self {
    Self::new()
  }
}

/// Identifier of a part within one cook.
pub type PartId = i32;

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
