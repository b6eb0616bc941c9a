//! Persistence snapshots.
//!
//! A [`Snapshot`] is an opaque blob produced by a workflow's state. A
//! [`TreeSnapshot`] carries a node's blob together with its children's,
//! so a whole tree can be handed to the host and restored later.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Opaque serialized workflow state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot(Bytes);

impl Snapshot {
  pub fn new(bytes: impl Into<Bytes>) -> Self {
    Self(bytes.into())
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn into_bytes(self) -> Bytes {
    self.0
  }
}

/// Snapshot of a node and, recursively, its children.
///
/// Children are keyed by `"{workflow type}:{child key}"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<Snapshot>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub children: BTreeMap<String, TreeSnapshot>,
}

impl TreeSnapshot {
  /// True when neither this node nor any descendant stored state.
  pub fn is_empty(&self) -> bool {
    self.state.is_none() && self.children.values().all(TreeSnapshot::is_empty)
  }

  pub fn to_bytes(&self) -> Result<Bytes, SnapshotError> {
    serde_json::to_vec(self)
      .map(Bytes::from)
      .map_err(SnapshotError::Encode)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
    if bytes.is_empty() {
      return Ok(Self::default());
    }
    serde_json::from_slice(bytes).map_err(SnapshotError::Decode)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_nested_snapshot_survives_bytes() {
    let mut leaf = TreeSnapshot {
      state: Some(Snapshot::new(vec![1u8, 2, 3])),
      children: BTreeMap::new(),
    };
    leaf.children.insert("Grandchild:g".to_string(), TreeSnapshot::default());

    let mut root = TreeSnapshot::default();
    root.children.insert("Leaf:a".to_string(), leaf);

    let bytes = root.to_bytes().unwrap();
    let restored = TreeSnapshot::from_bytes(&bytes).unwrap();

    assert_eq!(restored, root);
    assert_eq!(
      restored.children["Leaf:a"].state.as_ref().unwrap().as_bytes(),
      &[1, 2, 3]
    );
  }

  #[test]
  fn test_empty_bytes_decode_to_empty_tree() {
    let snapshot = TreeSnapshot::from_bytes(&[]).unwrap();
    assert!(snapshot.is_empty());
  }

  #[test]
  fn test_garbage_fails_to_decode() {
    let result = TreeSnapshot::from_bytes(b"not json");
    assert!(matches!(result, Err(SnapshotError::Decode(_))));
  }
}
