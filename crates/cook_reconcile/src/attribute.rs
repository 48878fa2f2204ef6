//! Attribute access - the read-only view onto generator output.
//!
//! The generator itself is an external collaborator; it is reached only
//! through [`AttributeSource`]. Values come back tagged with their owner
//! granularity and are remapped per primitive through [`Part::entry_index`].

use std::borrow::Cow;

use crate::error::SourceError;
use crate::part::Part;
use crate::types::AttributeOwner;

/// Storage class of an attribute's values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
  Int,
  Float,
  String,
}

/// Flat attribute storage (entry-major, `tuple_size` components per entry).
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValues {
  Int(Vec<i64>),
  Float(Vec<f32>),
  Str(Vec<String>),
}

impl AttributeValues {
  fn len(&self) -> usize {
    match self {
      AttributeValues::Int(values) => values.len(),
      AttributeValues::Float(values) => values.len(),
      AttributeValues::Str(values) => values.len(),
    }
  }
}

/// One named attribute fetched from a part.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
  pub name: String,
  pub owner: AttributeOwner,
  pub tuple_size: usize,
  pub values: AttributeValues,
}

impl Attribute {
  /// Scalar integer attribute.
  pub fn int(name: &str, owner: AttributeOwner, values: Vec<i64>) -> Self {
    Self {
      name: name.to_owned(),
      owner,
      tuple_size: 1,
      values: AttributeValues::Int(values),
    }
  }

  /// Float attribute with `tuple_size` components per entry.
  pub fn float(name: &str, owner: AttributeOwner, tuple_size: usize, values: Vec<f32>) -> Self {
    Self {
      name: name.to_owned(),
      owner,
      tuple_size: tuple_size.max(1),
      values: AttributeValues::Float(values),
    }
  }

  /// Scalar string attribute.
  pub fn string<S: Into<String>>(
    name: &str,
    owner: AttributeOwner,
    values: impl IntoIterator<Item = S>,
  ) -> Self {
    Self {
      name: name.to_owned(),
      owner,
      tuple_size: 1,
      values: AttributeValues::Str(values.into_iter().map(Into::into).collect()),
    }
  }

  pub fn storage(&self) -> StorageKind {
    match self.values {
      AttributeValues::Int(_) => StorageKind::Int,
      AttributeValues::Float(_) => StorageKind::Float,
      AttributeValues::Str(_) => StorageKind::String,
    }
  }

  /// Number of entries (values / tuple size).
  pub fn entry_count(&self) -> usize {
    self.values.len() / self.tuple_size
  }

  /// Entry that represents `prim`, if it is in range.
  #[inline]
  pub fn entry_for(&self, part: &Part, prim: u32) -> Option<usize> {
    part
      .entry_index(self.owner, prim)
      .filter(|&entry| entry < self.entry_count())
  }

  /// First component of an entry as an integer (floats truncate).
  pub fn int_at(&self, entry: usize) -> Option<i64> {
    let index = entry * self.tuple_size;
    match &self.values {
      AttributeValues::Int(values) => values.get(index).copied(),
      AttributeValues::Float(values) => values.get(index).map(|&v| v as i64),
      AttributeValues::Str(_) => None,
    }
  }

  /// First component of an entry as text (integers are formatted).
  pub fn str_at(&self, entry: usize) -> Option<Cow<'_, str>> {
    let index = entry * self.tuple_size;
    match &self.values {
      AttributeValues::Str(values) => values.get(index).map(|s| Cow::Borrowed(s.as_str())),
      AttributeValues::Int(values) => values.get(index).map(|v| Cow::Owned(v.to_string())),
      AttributeValues::Float(_) => None,
    }
  }

  /// All components of a float entry.
  pub fn floats_at(&self, entry: usize) -> Option<&[f32]> {
    match &self.values {
      AttributeValues::Float(values) => {
        let start = entry * self.tuple_size;
        values.get(start..start + self.tuple_size)
      }
      _ => None,
    }
  }

  /// Integer value for `prim` after the granularity remap.
  #[inline]
  pub fn int_for(&self, part: &Part, prim: u32) -> Option<i64> {
    self.entry_for(part, prim).and_then(|entry| self.int_at(entry))
  }

  /// String value for `prim` after the granularity remap.
  #[inline]
  pub fn str_for(&self, part: &Part, prim: u32) -> Option<Cow<'_, str>> {
    self.entry_for(part, prim).and_then(|entry| self.str_at(entry))
  }

  /// Float tuple for `prim` after the granularity remap.
  #[inline]
  pub fn floats_for(&self, part: &Part, prim: u32) -> Option<&[f32]> {
    self.entry_for(part, prim).and_then(|entry| self.floats_at(entry))
  }
}

// =============================================================================
// AttributeSource - generator collaborator
// =============================================================================

/// Read-only attribute access for the parts of one cook.
///
/// `Ok(None)` means the attribute does not exist at that owner; `Err` is a
/// generator I/O failure and aborts the pass.
pub trait AttributeSource {
  fn get_attribute(
    &self,
    part: &Part,
    name: &str,
    owner: AttributeOwner,
  ) -> Result<Option<Attribute>, SourceError>;

  /// Look an attribute up by name, trying `preferred` first and then
  /// [`AttributeOwner::SEARCH_ORDER`].
  fn find_attribute(
    &self,
    part: &Part,
    name: &str,
    preferred: Option<AttributeOwner>,
  ) -> Result<Option<Attribute>, SourceError> {
    if let Some(owner) = preferred {
      if let Some(attribute) = self.get_attribute(part, name, owner)? {
        return Ok(Some(attribute));
      }
    }
    for owner in AttributeOwner::SEARCH_ORDER {
      if Some(owner) == preferred {
        continue;
      }
      if let Some(attribute) = self.get_attribute(part, name, owner)? {
        return Ok(Some(attribute));
      }
    }
    Ok(None)
  }
}

impl<T: AttributeSource + ?Sized> AttributeSource for &T {
  fn get_attribute(
    &self,
    part: &Part,
    name: &str,
    owner: AttributeOwner,
  ) -> Result<Option<Attribute>, SourceError> {
    (**self).get_attribute(part, name, owner)
  }
}

#[cfg(test)]
#[path = "attribute_test.rs"]
mod attribute_test;
