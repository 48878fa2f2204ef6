//! SplitGrouper - partitions a part's primitives into split buckets and,
//! within each bucket, into identity sub-groups.
//!
//! ```text
//! Part ──► split key ──► PartialUpdatePlanner::admit ──► identity key ──► group
//!            │                    │                           │
//!      (split attr)        (update-mode attr)           (kind extractor)
//! ```
//!
//! All attribute fetches for the part happen before the primitive loop, so a
//! generator failure surfaces before any grouping state exists.

use indexmap::IndexMap;

use crate::attribute::{Attribute, AttributeSource, StorageKind};
use crate::config::ReconcileConfig;
use crate::error::SourceError;
use crate::kind::{IdentityKey, OutputKind};
use crate::part::Part;
use crate::planner::{admit, Admission};
use crate::scene::AssetResolver;
use crate::types::{PartId, SplitKey, UpdateMode};

/// One split bucket of a part.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitBucket {
  /// Reduced update mode (`Remove` = tombstoned).
  pub mode: UpdateMode,
  /// Taken from the primitive that created the bucket.
  pub split_to_container: bool,
  /// Identity sub-groups, primitives in encounter order.
  pub groups: IndexMap<IdentityKey, Vec<u32>>,
}

/// Primitives that never reached a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipCounts {
  pub degenerate: usize,
  pub null_identity: usize,
}

impl SkipCounts {
  pub fn total(&self) -> usize {
    self.degenerate + self.null_identity
  }
}

/// Grouping result for one part.
#[derive(Clone, Debug, Default)]
pub struct PartBuckets {
  pub part_id: PartId,
  /// Whether the part carried a usable split attribute.
  pub has_split: bool,
  /// Whether any primitive requested Modify/Remove.
  pub incremental: bool,
  pub buckets: IndexMap<SplitKey, SplitBucket>,
  pub skipped: SkipCounts,
}

impl PartBuckets {
  /// Group count across all buckets.
  pub fn group_count(&self) -> usize {
    self.buckets.values().map(|b| b.groups.len()).sum()
  }
}

/// Groups parts for one output kind.
pub struct SplitGrouper<'a> {
  kind: OutputKind,
  config: &'a ReconcileConfig,
}

impl<'a> SplitGrouper<'a> {
  pub fn new(kind: OutputKind, config: &'a ReconcileConfig) -> Self {
    Self { kind, config }
  }

  /// Fetch the split attribute, honouring the configured override or the
  /// `split_attr` indirection.
  fn split_attribute<A: AttributeSource + ?Sized>(
    &self,
    source: &A,
    part: &Part,
  ) -> Result<Option<Attribute>, SourceError> {
    let names = &self.config.attributes;
    let name = match &self.config.split_attribute {
      Some(name) => name.clone(),
      None => {
        let Some(pointer) = source.find_attribute(part, &names.split_attr, None)? else {
          return Ok(None);
        };
        match pointer.str_at(0) {
          Some(name) if !name.is_empty() => name.into_owned(),
          _ => return Ok(None),
        }
      }
    };

    let attribute = source.find_attribute(part, &name, Some(self.kind.preferred_owner()))?;
    match attribute {
      Some(attr) if attr.storage() == StorageKind::Float => {
        tracing::warn!(part = part.id, attribute = %name, "float split attributes are not supported; ignoring split");
        Ok(None)
      }
      other => Ok(other),
    }
  }

  /// Partition one part.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "grouping::group_part"))]
  pub fn group_part<A, R>(&self, source: &A, part: &Part, resolver: &R) -> Result<PartBuckets, SourceError>
  where
    A: AttributeSource + ?Sized,
    R: AssetResolver + ?Sized,
  {
    let names = &self.config.attributes;

    // I/O first.
    let split = self.split_attribute(source, part)?;
    let to_container = source.find_attribute(part, &names.split_to_container, None)?;
    // Update modes only mean something when there is something to split.
    let modes = match split {
      Some(_) => source.find_attribute(part, &names.update_mode, None)?,
      None => None,
    };
    let identity = self.kind.identity_extractor(source, part, names)?;

    let reject_repeats = self.config.skip_degenerate && self.kind.rejects_repeated_points();
    let mut result = PartBuckets {
      part_id: part.id,
      has_split: split.is_some(),
      ..Default::default()
    };

    for prim in 0..part.primitive_count() as u32 {
      if part.is_degenerate(prim, reject_repeats) {
        tracing::debug!(part = part.id, prim, "skipping degenerate primitive");
        result.skipped.degenerate += 1;
        continue;
      }

      let key = split
        .as_ref()
        .map_or(SplitKey::Implicit, |attr| split_key_for(attr, part, prim));
      let mode = modes
        .as_ref()
        .map_or(UpdateMode::Replace, |attr| update_mode_for(attr, part, prim));
      if mode.is_partial() {
        result.incremental = true;
      }

      let existing = result.buckets.get(&key).map(|bucket| bucket.mode);
      match admit(existing, mode) {
        Admission::Skip => continue,
        Admission::Tombstone => {
          let bucket = result
            .buckets
            .entry(key)
            .or_insert_with(|| SplitBucket {
              mode: UpdateMode::Remove,
              split_to_container: flag_for(to_container.as_ref(), part, prim),
              groups: IndexMap::new(),
            });
          bucket.mode = UpdateMode::Remove;
          bucket.groups.clear();
          continue;
        }
        Admission::Accumulate => {
          // A Modify request claims an existing Replace bucket, shielding it
          // from later Remove requests.
          if mode == UpdateMode::Modify {
            if let Some(bucket) = result.buckets.get_mut(&key) {
              bucket.mode = UpdateMode::Modify;
            }
          }
        }
      }

      let Some(identity_key) = identity.extract(part, prim, resolver) else {
        tracing::debug!(part = part.id, prim, "primitive has no resolvable identity; dropped from grouping");
        result.skipped.null_identity += 1;
        continue;
      };

      result
        .buckets
        .entry(key)
        .or_insert_with(|| SplitBucket {
          mode,
          split_to_container: flag_for(to_container.as_ref(), part, prim),
          groups: IndexMap::new(),
        })
        .groups
        .entry(identity_key)
        .or_default()
        .push(prim);
    }

    Ok(result)
  }
}

fn split_key_for(attr: &Attribute, part: &Part, prim: u32) -> SplitKey {
  match attr.storage() {
    StorageKind::Int => attr.int_for(part, prim).map_or(SplitKey::Implicit, SplitKey::Int),
    _ => attr
      .str_for(part, prim)
      .map_or(SplitKey::Implicit, |value| SplitKey::from_name(&value)),
  }
}

fn update_mode_for(attr: &Attribute, part: &Part, prim: u32) -> UpdateMode {
  match attr.storage() {
    StorageKind::String => attr
      .str_for(part, prim)
      .map_or(UpdateMode::Replace, |value| UpdateMode::parse(&value)),
    _ => attr
      .int_for(part, prim)
      .map_or(UpdateMode::Replace, UpdateMode::from_int),
  }
}

fn flag_for(attr: Option<&Attribute>, part: &Part, prim: u32) -> bool {
  attr.and_then(|a| a.int_for(part, prim)).unwrap_or(0) >= 1
}

#[cfg(test)]
#[path = "grouping_test.rs"]
mod grouping_test;
