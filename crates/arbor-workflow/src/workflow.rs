use std::fmt::Debug;

use crate::context::RenderContext;
use crate::snapshot::Snapshot;

/// A node in a workflow tree.
///
/// The workflow value itself is the node's input: a parent re-rendering the
/// same child key passes a fresh value, which replaces the old one after
/// [`workflow_did_change`](Workflow::workflow_did_change) has seen both.
pub trait Workflow: Sized + Send + 'static {
  /// Local state owned by the node.
  type State: Debug + Send + 'static;
  /// State transition requests delivered into the node.
  type Action: Send + 'static;
  /// Values reported to the parent after applying an action.
  type Output: Send + 'static;
  /// What a render pass produces.
  type Rendering;

  fn initial_state(&self, snapshot: Option<&Snapshot>) -> Self::State;

  /// Called when a parent replaces this node's input.
  fn workflow_did_change(&self, _previous: &Self, _state: &mut Self::State) {}

  /// Apply an action to the state, optionally producing an output.
  fn update(&self, state: &mut Self::State, action: Self::Action) -> Option<Self::Output>;

  fn render(&self, state: &Self::State, context: &mut RenderContext<'_, Self::Action>)
  -> Self::Rendering;

  fn snapshot_state(&self, _state: &Self::State) -> Option<Snapshot> {
    None
  }
}
