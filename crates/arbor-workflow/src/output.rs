//! Values flowing up out of a subtree.

use serde::{Deserialize, Serialize};

/// Where an action delivered to a node came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
  /// A sink or a subscribed external stream.
  External,
  /// A background worker.
  Worker,
  /// The output of a child node, with the child's own update description.
  Subtree(Box<UpdateDebugInfo>),
}

/// What happened to a node during one update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
  /// The node applied an action.
  DidUpdate { source: Source },
  /// A descendant changed without producing an output for this node.
  ChildDidUpdate(Box<UpdateDebugInfo>),
}

/// Description of one update, nested from the root down to where it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDebugInfo {
  /// Type name of the workflow this level describes.
  pub workflow_type: String,
  pub kind: UpdateKind,
}

impl UpdateDebugInfo {
  pub fn did_update(workflow_type: impl Into<String>, source: Source) -> Self {
    Self {
      workflow_type: workflow_type.into(),
      kind: UpdateKind::DidUpdate { source },
    }
  }

  pub fn child_did_update(workflow_type: impl Into<String>, child: UpdateDebugInfo) -> Self {
    Self {
      workflow_type: workflow_type.into(),
      kind: UpdateKind::ChildDidUpdate(Box::new(child)),
    }
  }

  /// The innermost level, i.e. the node where the update originated.
  pub fn origin(&self) -> &UpdateDebugInfo {
    match &self.kind {
      UpdateKind::DidUpdate {
        source: Source::Subtree(child),
      } => child.origin(),
      UpdateKind::ChildDidUpdate(child) => child.origin(),
      UpdateKind::DidUpdate { .. } => self,
    }
  }

  /// Number of tree levels the update passed through.
  pub fn depth(&self) -> usize {
    match &self.kind {
      UpdateKind::DidUpdate {
        source: Source::Subtree(child),
      } => 1 + child.depth(),
      UpdateKind::ChildDidUpdate(child) => 1 + child.depth(),
      UpdateKind::DidUpdate { .. } => 1,
    }
  }
}

/// The unit a subtree manager hands to its node.
#[derive(Debug)]
pub enum Output<A> {
  /// An action for the owning node, tagged with its source.
  Update { action: A, source: Source },
  /// A child changed internally but has nothing for the owner to apply.
  ChildDidUpdate(UpdateDebugInfo),
}

/// The unit a node hands to its parent (or to the root driver).
#[derive(Debug)]
pub struct NodeOutput<O> {
  /// Output produced by applying the action, if any.
  pub output: Option<O>,
  pub debug_info: UpdateDebugInfo,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_origin_follows_subtree_chain() {
    let leaf = UpdateDebugInfo::did_update("Leaf", Source::Worker);
    let middle = UpdateDebugInfo::child_did_update("Middle", leaf.clone());
    let root = UpdateDebugInfo::did_update("Root", Source::Subtree(Box::new(middle)));

    assert_eq!(root.origin(), &leaf);
    assert_eq!(root.depth(), 3);
    assert_eq!(leaf.depth(), 1);
  }

  #[test]
  fn test_debug_info_serializes() {
    let info = UpdateDebugInfo::did_update("Root", Source::External);
    let json = serde_json::to_value(&info).unwrap();

    assert_eq!(json["workflow_type"], "Root");
    assert_eq!(json["kind"]["DidUpdate"]["source"], "External");
  }
}
