use super::*;
use crate::attribute::Attribute;
use crate::memory::{FailPoint, MemoryScene, MemorySource};
use crate::scene::{AssetClass, ElementBinding, NullBridge};
use crate::test_utils::{repeat, split_source, triangles, with_modes};
use crate::types::{AttributeOwner, HolderId, ObjectRef, SplitKey};

struct Harness {
  scene: MemoryScene,
  containers: ContainerCache,
  config: ReconcileConfig,
  kind: OutputKind,
}

impl Harness {
  fn new(kind: OutputKind) -> Self {
    let mut scene = MemoryScene::new()
      .with_asset("/tree", AssetClass::Actor)
      .with_asset("/m/stone", AssetClass::Material);
    let root = scene.add_root("node");
    Self {
      scene,
      containers: ContainerCache::new(root, "node"),
      config: ReconcileConfig::default(),
      kind,
    }
  }

  fn pass(
    &mut self,
    parts: &[Part],
    source: &MemorySource,
    prior: &HolderPool,
  ) -> Result<ReconcileOutcome, ReconcileError> {
    ReconciliationDriver::new(self.kind, &self.config).reconcile(
      parts,
      prior,
      &mut self.containers,
      PassContext {
        source,
        scene: &mut self.scene,
        bridge: &mut NullBridge,
      },
    )
  }
}

fn id_of(pool: &HolderPool, key: &str) -> HolderId {
  pool.for_split(&SplitKey::from(key)).next().unwrap().id()
}

fn ab_source(modes: Option<&[i64]>) -> MemorySource {
  let mut splits = repeat("A", 6);
  splits.extend(repeat("B", 4));
  let source = split_source(0, &splits);
  match modes {
    Some(modes) => with_modes(source, 0, modes),
    None => source,
  }
}

// =============================================================================
// Batch 1: example scenarios
// =============================================================================

#[test]
fn test_reuse_a_create_b() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h
    .pass(&[triangles(0, 6)], &split_source(0, &repeat("A", 6)), &HolderPool::new())
    .unwrap();
  let a_id = id_of(&first.pool, "A");

  let second = h.pass(&[triangles(0, 10)], &ab_source(None), &first.pool).unwrap();

  assert_eq!(second.pool.len(), 2);
  assert!(second.destroyed.is_empty());
  assert_eq!(second.report.reused, 1);
  assert_eq!(second.report.created, 1);
  assert_eq!(id_of(&second.pool, "A"), a_id);
  assert_eq!(second.pool.for_split(&SplitKey::from("B")).next().unwrap().element_count(), 4);
}

#[test]
fn test_remove_destroys_b_only() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h.pass(&[triangles(0, 10)], &ab_source(None), &HolderPool::new()).unwrap();
  let a_id = id_of(&first.pool, "A");
  let b_id = id_of(&first.pool, "B");
  let b_object = first.pool.get(b_id).unwrap().object_refs()[0];

  let modes = [0, 0, 0, 0, 0, 0, 2, 2, 2, 2];
  let second = h.pass(&[triangles(0, 10)], &ab_source(Some(&modes[..])), &first.pool).unwrap();

  assert!(second.report.incremental);
  assert_eq!(second.pool.len(), 1);
  assert_eq!(id_of(&second.pool, "A"), a_id);
  let destroyed: Vec<HolderId> = second.destroyed.iter().map(Holder::id).collect();
  assert_eq!(destroyed, vec![b_id]);
  assert!(!h.scene.object_alive(b_object));
}

#[test]
fn test_shrink_keeps_holder_identity() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h
    .pass(&[triangles(0, 6)], &split_source(0, &repeat("A", 6)), &HolderPool::new())
    .unwrap();
  let a_id = id_of(&first.pool, "A");

  let second = h
    .pass(&[triangles(0, 4)], &split_source(0, &repeat("A", 4)), &first.pool)
    .unwrap();

  let holder = second.pool.get(a_id).expect("holder is reused");
  assert_eq!(holder.element_count(), 4);
  assert_eq!(second.report.lifecycle.elements_removed, 2);
  assert_eq!(second.report.lifecycle.elements_added, 0);
}

// =============================================================================
// Batch 2: properties
// =============================================================================

#[test]
fn test_identical_pass_is_idempotent() {
  let mut h = Harness::new(OutputKind::Mesh);
  let parts = [triangles(0, 10)];
  let source = ab_source(None);
  let first = h.pass(&parts, &source, &HolderPool::new()).unwrap();
  h.scene.reset_counters();

  let second = h.pass(&parts, &source, &first.pool).unwrap();

  assert_eq!(second.report.created, 0);
  assert_eq!(second.report.destroyed, 0);
  assert_eq!(second.report.reused, 2);
  assert_eq!(h.scene.counters(), Default::default(), "no scene mutation at all");
  let before: Vec<&Holder> = first.pool.iter().collect();
  let after: Vec<&Holder> = second.pool.iter().collect();
  assert_eq!(before, after);
}

#[test]
fn test_partial_update_leaves_other_buckets_alone() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h
    .pass(&[triangles(0, 6)], &split_source(0, &["a", "a", "b", "b", "c", "c"]), &HolderPool::new())
    .unwrap();

  // Only "b" is re-cooked, with one extra primitive.
  let source = with_modes(split_source(0, &["b", "b", "b"]), 0, &[1, 1, 1]);
  let second = h.pass(&[triangles(0, 3)], &source, &first.pool).unwrap();

  assert_eq!(second.report.untouched, 2);
  assert_eq!(second.report.reused, 1);
  assert_eq!(second.report.destroyed, 0);
  for label in ["a", "c"] {
    let key = SplitKey::from(label);
    let before = first.pool.for_split(&key).next().unwrap();
    let after = second.pool.for_split(&key).next().unwrap();
    assert_eq!(before, after, "bucket {label} is carried over verbatim");
  }
  assert_eq!(
    second.pool.for_split(&SplitKey::from("b")).next().unwrap().element_count(),
    3
  );
}

#[test]
fn test_full_pass_destroys_absent_buckets() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h.pass(&[triangles(0, 10)], &ab_source(None), &HolderPool::new()).unwrap();
  let b_id = id_of(&first.pool, "B");

  let second = h
    .pass(&[triangles(0, 6)], &split_source(0, &repeat("A", 6)), &first.pool)
    .unwrap();

  assert!(!second.report.incremental);
  assert_eq!(second.pool.len(), 1);
  assert_eq!(second.destroyed.len(), 1);
  assert_eq!(second.destroyed[0].id(), b_id);
}

#[test]
fn test_no_holder_reused_twice() {
  let mut h = Harness::new(OutputKind::Mesh);
  let parts = [triangles(0, 3), triangles(1, 3)];
  let source = split_source(0, &repeat("A", 3))
    .with(1, Attribute::string("split_attr", AttributeOwner::Detail, ["split"]))
    .with(1, Attribute::string("split", AttributeOwner::Primitive, repeat("A", 3)));
  let first = h.pass(&parts, &source, &HolderPool::new()).unwrap();
  assert_eq!(first.pool.len(), 2);

  let second = h.pass(&parts, &source, &first.pool).unwrap();
  let ids: Vec<HolderId> = second.pool.iter().map(Holder::id).collect();
  assert_eq!(second.report.reused, 2);
  assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_container_mismatch_recreates_instead_of_reparenting() {
  let mut h = Harness::new(OutputKind::Mesh);
  let source = split_source(0, &repeat("A", 3)).with(
    0,
    Attribute::int("split_to_container", AttributeOwner::Detail, vec![1]),
  );
  let first = h.pass(&[triangles(0, 3)], &source, &HolderPool::new()).unwrap();
  let old = first.pool.iter().next().unwrap().clone();
  assert_ne!(old.container(), h.containers.root());

  h.containers.unlink(&SplitKey::from("A"));
  let second = h.pass(&[triangles(0, 3)], &source, &first.pool).unwrap();

  assert_eq!(second.report.conflicts, 1);
  assert_eq!(second.report.reused, 0);
  assert_eq!(second.report.created, 1);
  assert_eq!(second.destroyed[0].id(), old.id());
  assert_eq!(second.destroyed[0].container(), old.container(), "old holder was not reparented");
  let fresh = second.pool.iter().next().unwrap();
  assert_ne!(fresh.container(), old.container());
  assert_eq!(h.scene.objects_in(old.container()), 0);
}

// =============================================================================
// Batch 3: degenerate input and failures
// =============================================================================

#[test]
fn test_externally_deleted_holder_is_dropped_and_rebuilt() {
  let mut h = Harness::new(OutputKind::Mesh);
  let source = split_source(0, &repeat("A", 3));
  let first = h.pass(&[triangles(0, 3)], &source, &HolderPool::new()).unwrap();
  let object = first.pool.iter().next().unwrap().object_refs()[0];
  h.scene.delete_object(object);

  let second = h.pass(&[triangles(0, 3)], &source, &first.pool).unwrap();
  assert_eq!(second.report.dropped_invalid, 1);
  assert_eq!(second.report.created, 1);
  assert!(second.destroyed.is_empty());
}

#[test]
fn test_removed_split_with_deleted_objects_is_not_counted_destroyed() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h.pass(&[triangles(0, 10)], &ab_source(None), &HolderPool::new()).unwrap();
  let b_object = first.pool.get(id_of(&first.pool, "B")).unwrap().object_refs()[0];
  h.scene.delete_object(b_object);
  h.scene.reset_counters();

  let modes = [0, 0, 0, 0, 0, 0, 2, 2, 2, 2];
  let second = h.pass(&[triangles(0, 10)], &ab_source(Some(&modes[..])), &first.pool).unwrap();

  assert_eq!(second.report.destroyed, 0);
  assert_eq!(second.report.dropped_invalid, 1);
  assert!(second.destroyed.is_empty());
  assert_eq!(second.report.lifecycle.objects_destroyed, 0);
  assert_eq!(second.pool.len(), 1);
}

#[test]
fn test_rebuild_in_one_part_overrides_remove_in_another() {
  let mut h = Harness::new(OutputKind::Mesh);
  let source = with_modes(split_source(0, &["A", "A"]), 0, &[2, 2])
    .with(1, Attribute::string("split_attr", AttributeOwner::Detail, ["split"]))
    .with(1, Attribute::string("split", AttributeOwner::Primitive, ["A", "A", "A"]));
  let first = h.pass(&[triangles(1, 3)], &source, &HolderPool::new()).unwrap();
  let a_id = id_of(&first.pool, "A");

  let second = h
    .pass(&[triangles(0, 2), triangles(1, 3)], &source, &first.pool)
    .unwrap();

  assert_eq!(second.report.reused, 1);
  assert_eq!(second.report.destroyed, 0);
  assert!(second.destroyed.is_empty());
  assert_eq!(id_of(&second.pool, "A"), a_id);
  assert_eq!(second.pool.get(a_id).unwrap().element_count(), 3);
}

#[test]
fn test_source_failure_leaves_scene_untouched() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h.pass(&[triangles(0, 10)], &ab_source(None), &HolderPool::new()).unwrap();
  h.scene.reset_counters();
  let objects = h.scene.object_count();

  let failing = ab_source(None).failing_on(0, "P");
  let err = h.pass(&[triangles(0, 4)], &failing, &first.pool).unwrap_err();

  assert!(matches!(err, ReconcileError::Source(_)));
  assert_eq!(h.scene.counters(), Default::default());
  assert_eq!(h.scene.object_count(), objects);
  assert!(first.pool.iter().all(|holder| holder.object_refs().iter().all(|&o| h.scene.object_alive(o))));
}

#[test]
fn test_collaborator_failure_rolls_back_created_objects() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h
    .pass(&[triangles(0, 2)], &split_source(0, &["a", "a"]), &HolderPool::new())
    .unwrap();
  let objects = h.scene.object_count();

  h.scene.fail_on(FailPoint::CreateObject, 1);
  let err = h
    .pass(&[triangles(0, 4)], &split_source(0, &["a", "b", "c", "d"]), &first.pool)
    .unwrap_err();

  assert!(matches!(err, ReconcileError::Scene(SceneError::ObjectCreate { .. })));
  assert_eq!(h.scene.object_count(), objects, "objects created before the failure are rolled back");
  let prior = first.pool.iter().next().unwrap();
  assert!(h.scene.object_alive(prior.object_refs()[0]));
}

#[test]
fn test_collaborator_failure_rolls_back_created_containers() {
  let mut h = Harness::new(OutputKind::Mesh);
  let first = h
    .pass(&[triangles(0, 2)], &split_source(0, &["a", "a"]), &HolderPool::new())
    .unwrap();
  h.scene.reset_counters();

  let source = split_source(0, &["a", "a", "b"]).with(
    0,
    Attribute::int("split_to_container", AttributeOwner::Primitive, vec![0, 0, 1]),
  );
  h.scene.fail_on(FailPoint::CreateObject, 0);
  let err = h.pass(&[triangles(0, 3)], &source, &first.pool).unwrap_err();

  assert!(matches!(err, ReconcileError::Scene(SceneError::ObjectCreate { .. })));
  assert_eq!(h.containers.get(&SplitKey::from("b")), None);
  let counters = h.scene.counters();
  assert_eq!(counters.containers_created, 1);
  assert_eq!(counters.containers_destroyed, 1, "container made for the failed split is destroyed");
}

#[test]
fn test_unresolved_material_falls_back_to_default() {
  let mut h = Harness::new(OutputKind::Mesh);
  let source = MemorySource::new().with(
    0,
    Attribute::string("material", AttributeOwner::Primitive, ["/m/stone", "/m/missing"]),
  );
  let out = h.pass(&[triangles(0, 2)], &source, &HolderPool::new()).unwrap();

  let holder = out.pool.iter().next().unwrap();
  assert_eq!(holder.elements()[0].material.as_deref(), Some("/m/stone"));
  assert_eq!(holder.elements()[1].material, None);
}

#[test]
fn test_skipped_primitives_are_reported() {
  let mut h = Harness::new(OutputKind::Mesh);
  let part = Part::from_faces(0, &[3, 3], vec![0, 1, 2, 3, 3, 4]).unwrap();
  let out = h.pass(&[part], &MemorySource::new(), &HolderPool::new()).unwrap();

  assert_eq!(out.report.skipped_primitives, 1);
  assert_eq!(out.pool.iter().next().unwrap().element_count(), 1);
}

// =============================================================================
// Batch 4: other kinds and the property bridge
// =============================================================================

#[test]
fn test_instancer_actor_array_shrinks_tail_first() {
  let mut h = Harness::new(OutputKind::Instancer);
  let source = MemorySource::new().with(
    0,
    Attribute::string("instance", AttributeOwner::Detail, ["/tree"]),
  );
  let first = h.pass(&[Part::point_cloud(0, 3)], &source, &HolderPool::new()).unwrap();
  let refs = first.pool.iter().next().unwrap().object_refs();
  assert_eq!(refs.len(), 3);

  let second = h.pass(&[Part::point_cloud(0, 2)], &source, &first.pool).unwrap();
  let holder = second.pool.iter().next().unwrap();
  assert_eq!(holder.object_refs(), refs[..2].to_vec());
  assert!(!h.scene.object_alive(refs[2]));
  assert_eq!(second.report.lifecycle.objects_destroyed, 1);
}

#[derive(Default)]
struct RecordingBridge {
  calls: Vec<(ObjectRef, u32, usize)>,
}

impl PropertyBridge for RecordingBridge {
  fn apply(&mut self, object: ObjectRef, _source: &dyn AttributeSource, binding: ElementBinding<'_>) {
    self.calls.push((object, binding.primitive, binding.element));
  }
}

#[test]
fn test_bridge_sees_every_written_element() {
  let mut h = Harness::new(OutputKind::Terrain);
  let source = MemorySource::new();
  let mut bridge = RecordingBridge::default();

  let out = ReconciliationDriver::new(h.kind, &h.config)
    .reconcile(
      &[triangles(0, 3)],
      &HolderPool::new(),
      &mut h.containers,
      PassContext {
        source: &source,
        scene: &mut h.scene,
        bridge: &mut bridge,
      },
    )
    .unwrap();

  let object = out.pool.iter().next().unwrap().object_refs()[0];
  assert_eq!(bridge.calls, vec![(object, 0, 0), (object, 1, 1), (object, 2, 2)]);
}
