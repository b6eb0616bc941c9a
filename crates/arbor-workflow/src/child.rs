use std::any::{Any, type_name};
use std::task::{Context, Poll, ready};

use crate::debug::DebugSnapshot;
use crate::node::WorkflowNode;
use crate::output::{NodeOutput, Output, Source};
use crate::snapshot::TreeSnapshot;
use crate::worker::OutputMap;
use crate::workflow::Workflow;

/// Type-erased view of a [`ChildNode`] held by a parent's subtree manager.
pub(crate) trait AnyChild<A>: Send {
  fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

  fn workflow_type(&self) -> &'static str;

  fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<Output<A>>;

  fn debug_snapshot(&self) -> DebugSnapshot;

  fn tree_snapshot(&self) -> TreeSnapshot;
}

/// Wraps a nested node and translates its outputs into the parent's actions.
pub(crate) struct ChildNode<C: Workflow, A> {
  node: WorkflowNode<C>,
  map: OutputMap<C::Output, A>,
}

impl<C: Workflow, A: Send + 'static> ChildNode<C, A> {
  pub(crate) fn new(
    workflow: C,
    map: OutputMap<C::Output, A>,
    snapshot: Option<TreeSnapshot>,
  ) -> Self {
    Self {
      node: WorkflowNode::with_snapshot(workflow, snapshot),
      map,
    }
  }

  /// Push a new input into the child and replace its output map.
  pub(crate) fn update(&mut self, workflow: C, map: OutputMap<C::Output, A>) {
    self.node.update_workflow(workflow);
    self.map = map;
  }

  pub(crate) fn render(&mut self) -> C::Rendering {
    self.node.render()
  }
}

impl<C: Workflow, A: Send + 'static> AnyChild<A> for ChildNode<C, A> {
  fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
    self
  }

  fn workflow_type(&self) -> &'static str {
    type_name::<C>()
  }

  fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<Output<A>> {
    let NodeOutput { output, debug_info } = ready!(self.node.poll_next_output(cx));

    Poll::Ready(match output {
      Some(output) => Output::Update {
        action: (self.map)(output),
        source: Source::Subtree(Box::new(debug_info)),
      },
      None => Output::ChildDidUpdate(debug_info),
    })
  }

  fn debug_snapshot(&self) -> DebugSnapshot {
    self.node.make_debug_snapshot()
  }

  fn tree_snapshot(&self) -> TreeSnapshot {
    self.node.snapshot()
  }
}
