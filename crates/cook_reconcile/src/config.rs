//! ReconcileConfig - attribute naming and pass tuning.

/// Names of every generator attribute the reconciler reads.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeNames {
  /// String attribute whose value names the attribute to split by.
  pub split_attr: String,
  /// Int flag: >= 1 puts the split into its own container.
  pub split_to_container: String,
  /// Per-primitive update mode (int 0..=2 or string).
  pub update_mode: String,

  // Identity keys
  pub lod: String,
  pub mesh_class: String,
  pub instance: String,
  pub instance_mode: String,
  pub curve_class: String,
  pub curve_closed: String,
  pub layer: String,

  // Per-element payload
  pub position: String,
  pub orient: String,
  pub scale: String,
  pub pscale: String,
  pub material: String,
  pub custom_floats: String,
}

impl Default for AttributeNames {
  fn default() -> Self {
    Self {
      split_attr: "split_attr".into(),
      split_to_container: "split_to_container".into(),
      update_mode: "partial_output_mode".into(),
      lod: "lod".into(),
      mesh_class: "mesh_output_type".into(),
      instance: "instance".into(),
      instance_mode: "instancer_output_mode".into(),
      curve_class: "curve_class".into(),
      curve_closed: "curve_closed".into(),
      layer: "layer".into(),
      position: "P".into(),
      orient: "orient".into(),
      scale: "scale".into(),
      pscale: "pscale".into(),
      material: "material".into(),
      custom_floats: "custom_floats".into(),
    }
  }
}

/// Configuration for one node's reconciliation.
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
  /// Attribute names read from the generator.
  pub attributes: AttributeNames,

  /// Label of the owning node; names the container of the implicit split.
  pub node_label: String,

  /// Explicit split attribute. When `None`, the `split_attr` indirection is
  /// used.
  pub split_attribute: Option<String>,

  /// Group count at which element payload extraction moves onto rayon.
  pub parallel_threshold: usize,

  /// Skip mesh primitives that reference the same point twice.
  pub skip_degenerate: bool,
}

impl Default for ReconcileConfig {
  fn default() -> Self {
    Self {
      attributes: AttributeNames::default(),
      node_label: "output".into(),
      split_attribute: None,
      parallel_threshold: 8,
      skip_degenerate: true,
    }
  }
}

impl ReconcileConfig {
  pub fn with_node_label(mut self, label: impl Into<String>) -> Self {
    self.node_label = label.into();
    self
  }

  pub fn with_split_attribute(mut self, name: impl Into<String>) -> Self {
    self.split_attribute = Some(name.into());
    self
  }

  pub fn with_parallel_threshold(mut self, groups: usize) -> Self {
    self.parallel_threshold = groups;
    self
  }

  pub fn with_skip_degenerate(mut self, skip: bool) -> Self {
    self.skip_degenerate = skip;
    self
  }

  pub fn with_attributes(mut self, attributes: AttributeNames) -> Self {
    self.attributes = attributes;
    self
  }
}
