use super::*;
use crate::memory::{FailPoint, MemoryScene};

fn setup() -> (MemoryScene, ContainerCache) {
  let mut scene = MemoryScene::new();
  let root = scene.add_root("scatter");
  (scene, ContainerCache::new(root, "scatter"))
}

#[test]
fn test_unflagged_split_uses_root() {
  let (mut scene, mut cache) = setup();
  let container = cache.resolve(&SplitKey::from("a"), false, &mut scene).unwrap();

  assert_eq!(container, cache.root());
  assert!(cache.is_empty());
  assert_eq!(scene.counters().containers_created, 0);
}

#[test]
fn test_flagged_split_is_created_once() {
  let (mut scene, mut cache) = setup();
  let key = SplitKey::from("tile_4");

  let first = cache.resolve(&key, true, &mut scene).unwrap();
  let second = cache.resolve(&key, true, &mut scene).unwrap();

  assert_eq!(first, second);
  assert_ne!(first, cache.root());
  assert_eq!(scene.counters().containers_created, 1);
  assert_eq!(scene.container_label(first), Some("tile_4"));
}

#[test]
fn test_implicit_split_uses_node_label() {
  let (mut scene, mut cache) = setup();
  let container = cache.resolve(&SplitKey::Implicit, true, &mut scene).unwrap();
  assert_eq!(scene.container_label(container), Some("scatter"));
}

#[test]
fn test_unlink_forces_new_container() {
  let (mut scene, mut cache) = setup();
  let key = SplitKey::Int(2);

  let first = cache.resolve(&key, true, &mut scene).unwrap();
  assert_eq!(cache.unlink(&key), Some(first));
  let second = cache.resolve(&key, true, &mut scene).unwrap();

  assert_ne!(first, second);
  assert_eq!(cache.get(&key), Some(second));
}

#[test]
fn test_dead_container_is_replaced() {
  let (mut scene, mut cache) = setup();
  let key = SplitKey::from("a");

  let first = cache.resolve(&key, true, &mut scene).unwrap();
  scene.delete_container(first);
  let second = cache.resolve(&key, true, &mut scene).unwrap();

  assert_ne!(first, second);
  assert!(scene.container_alive(second));
}

#[test]
fn test_creation_failure_is_not_cached() {
  let (mut scene, mut cache) = setup();
  scene.fail_on(FailPoint::CreateContainer, 0);

  let key = SplitKey::from("a");
  assert!(cache.resolve(&key, true, &mut scene).is_err());
  assert_eq!(cache.get(&key), None);
  assert!(cache.resolve(&key, true, &mut scene).is_ok());
}
