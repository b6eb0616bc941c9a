//! Introspection snapshots of a workflow tree.

use serde::{Deserialize, Serialize};

/// Shape and state of a node and its descendants.
///
/// Children are always sorted by key (then workflow type), so two trees with
/// the same shape produce the same snapshot regardless of render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSnapshot {
  pub workflow_type: String,
  pub state_description: String,
  pub children: Vec<DebugSnapshotChild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSnapshotChild {
  pub key: String,
  pub snapshot: DebugSnapshot,
}

impl DebugSnapshot {
  /// First child rendered under `key`.
  pub fn child(&self, key: &str) -> Option<&DebugSnapshot> {
    self
      .children
      .iter()
      .find(|child| child.key == key)
      .map(|child| &child.snapshot)
  }

  pub fn child_keys(&self) -> Vec<&str> {
    self.children.iter().map(|child| child.key.as_str()).collect()
  }

  /// Number of nodes in the tree, including this one.
  pub fn node_count(&self) -> usize {
    1 + self
      .children
      .iter()
      .map(|child| child.snapshot.node_count())
      .sum::<usize>()
  }

  pub(crate) fn sort_children(children: &mut [DebugSnapshotChild]) {
    children.sort_by(|a, b| {
      a.key
        .cmp(&b.key)
        .then_with(|| a.snapshot.workflow_type.cmp(&b.snapshot.workflow_type))
    });
  }
}
