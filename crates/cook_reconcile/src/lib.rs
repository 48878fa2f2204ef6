//! cook_reconcile - Engine independent reconciliation of procedural output
//!
//! A generator node cooks a fresh set of geometry parts every time its inputs
//! change. This crate maps that throwaway output onto long-lived scene objects
//! ("holders") so that unchanged content keeps its objects, changed content
//! reuses the closest fitting ones, and only what is truly gone is destroyed.
//!
//! ```text
//!   parts ──► SplitGrouper ──► PartialUpdatePlanner ──► payload extraction
//!                                                          (rayon)
//!                                                             │
//!   prior HolderPool ──► validity filter ──► HolderMatcher ◄──┘
//!                                               │
//!                              HolderLifecycleManager ──► SceneGraph
//!                                               │
//!                                new HolderPool + destroyed set
//! ```
//!
//! # Features
//!
//! - **Split buckets**: primitives are partitioned by a split attribute, each
//!   split optionally living in its own container
//! - **Partial updates**: Replace / Modify / Remove per split, so untouched
//!   splits survive a cook verbatim
//! - **Best-fit reuse**: holders are matched by identity and element count and
//!   resized in place
//! - **Failure atomicity**: generator I/O finishes before the scene is touched,
//!   and collaborator failures roll back what the pass created
//!
//! # Example
//!
//! ```ignore
//! use cook_reconcile::{NodeOutput, OutputKind, PassContext, ReconcileConfig};
//!
//! let mut node = NodeOutput::new(OutputKind::Mesh, ReconcileConfig::default(), root);
//! let report = node.cook(&parts, PassContext { source: &session, scene: &mut scene, bridge: &mut bridge })?;
//!
//! println!("created {}, reused {}, destroyed {}", report.created, report.reused, report.destroyed);
//! ```

pub mod error;
pub mod types;

pub use error::{ReconcileError, SceneError, SourceError};
pub use types::{
  AttributeOwner, ContainerRef, HolderId, ObjectRef, PartId, SplitKey, UpdateMode,
};

// Configuration
pub mod config;
pub use config::{AttributeNames, ReconcileConfig};

// Generator side: topology and attributes
pub mod attribute;
pub mod part;
pub use attribute::{Attribute, AttributeSource, AttributeValues};
pub use part::Part;

// Scene side: collaborator traits
pub mod scene;
pub use scene::{AssetClass, AssetResolver, ElementBinding, NullBridge, PropertyBridge, SceneGraph};

// Output kinds and per-element payloads
pub mod element;
pub mod kind;
pub use element::ElementData;
pub use kind::{IdentityKey, InstanceMode, MeshClass, ObjectLayout, OutputKind};

// Persistent state
pub mod container;
pub mod holder;
pub use container::ContainerCache;
pub use holder::{Holder, HolderObjects, HolderPool, ObjectHandle};

// Reconciliation pass
pub mod driver;
pub mod grouping;
pub mod lifecycle;
pub mod matcher;
pub mod planner;
pub use driver::{PassContext, PassReport, ReconcileOutcome, ReconciliationDriver};
pub use lifecycle::LifecycleStats;

// Per-node state
pub mod node;
pub use node::NodeOutput;

// Engine-agnostic statistics
pub mod metrics;

// Headless collaborators
pub mod memory;
pub use memory::{MemoryScene, MemorySource};

#[cfg(test)]
pub mod test_utils;
