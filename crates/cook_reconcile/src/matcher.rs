//! HolderMatcher - best-fit lookup of a reusable holder.
//!
//! Eligibility is an exact filter (split key + split-to-container flag);
//! compatibility and score come from the [`OutputKind`]. A score of 0 returns
//! immediately. Otherwise the lowest score wins, and equal scores resolve to
//! the earliest holder in pool insertion order.

use crate::holder::{Holder, HolderPool};
use crate::kind::{IdentityKey, OutputKind};
use crate::types::SplitKey;

/// Shape of a group looking for a holder.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
  pub split_key: &'a SplitKey,
  pub split_to_container: bool,
  pub identity: &'a IdentityKey,
  pub element_count: usize,
}

/// A holder removed from the pool by a successful match.
#[derive(Debug)]
pub struct HolderMatch {
  pub holder: Holder,
  pub score: usize,
}

/// Score `holder` against `candidate`; `None` when ineligible or
/// incompatible.
pub fn score(kind: OutputKind, holder: &Holder, candidate: &Candidate<'_>) -> Option<usize> {
  if holder.split_key() != candidate.split_key
    || holder.split_to_container() != candidate.split_to_container
  {
    return None;
  }
  kind.score(
    holder.identity(),
    holder.element_count(),
    candidate.identity,
    candidate.element_count,
  )
}

/// Find the best holder for `candidate` and remove it from `pool`.
pub fn take_best_match(
  kind: OutputKind,
  pool: &mut HolderPool,
  candidate: &Candidate<'_>,
) -> Option<HolderMatch> {
  let mut best: Option<(usize, usize)> = None;

  for (slot, holder) in pool.iter_slots() {
    let Some(score) = score(kind, holder, candidate) else {
      continue;
    };
    if score == 0 {
      best = Some((slot, 0));
      break;
    }
    // Strict comparison keeps the earliest of equally scored holders.
    if best.map_or(true, |(_, lowest)| score < lowest) {
      best = Some((slot, score));
    }
  }

  let (slot, score) = best?;
  pool.take(slot).map(|holder| HolderMatch { holder, score })
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod matcher_test;
