use std::any::type_name;
use std::future::poll_fn;
use std::task::{Context, Poll, ready};

use tracing::{debug, instrument};

use crate::debug::DebugSnapshot;
use crate::output::{NodeOutput, Output, UpdateDebugInfo};
use crate::snapshot::TreeSnapshot;
use crate::subtree::SubtreeManager;
use crate::workflow::Workflow;

/// A live workflow instance: its current input, its state, and the subtree
/// it rendered last.
pub struct WorkflowNode<W: Workflow> {
  workflow: W,
  state: W::State,
  manager: SubtreeManager<W::Action>,
}

impl<W: Workflow> WorkflowNode<W> {
  pub fn new(workflow: W) -> Self {
    Self::with_snapshot(workflow, None)
  }

  /// Create a node whose state, and whose children's state, come from
  /// `snapshot` when one is given.
  pub fn with_snapshot(workflow: W, snapshot: Option<TreeSnapshot>) -> Self {
    let TreeSnapshot { state, children } = snapshot.unwrap_or_default();
    let initial = workflow.initial_state(state.as_ref());

    Self {
      workflow,
      state: initial,
      manager: SubtreeManager::with_restored(type_name::<W>(), children.into_iter().collect()),
    }
  }

  pub fn workflow(&self) -> &W {
    &self.workflow
  }

  pub fn state(&self) -> &W::State {
    &self.state
  }

  pub fn manager(&self) -> &SubtreeManager<W::Action> {
    &self.manager
  }

  /// Replace the node's input. The new value sees the old one through
  /// `workflow_did_change` before taking its place.
  pub fn update_workflow(&mut self, workflow: W) {
    workflow.workflow_did_change(&self.workflow, &mut self.state);
    self.workflow = workflow;
  }

  /// Run one render pass over the current input and state.
  #[instrument(name = "render", skip(self), fields(workflow_type = type_name::<W>()))]
  pub fn render(&mut self) -> W::Rendering {
    let Self {
      workflow,
      state,
      manager,
    } = self;
    manager.render(|context| workflow.render(state, context))
  }

  /// Take the next ready output from this node's subtree and apply it.
  ///
  /// Actions for this node go through [`Workflow::update`]; child activity
  /// that produced nothing for this node is passed along as a child update.
  pub fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<NodeOutput<W::Output>> {
    let workflow_type = type_name::<W>();

    Poll::Ready(match ready!(self.manager.poll_next_output(cx)) {
      Output::Update { action, source } => {
        let output = self.workflow.update(&mut self.state, action);
        debug!(
          workflow_type,
          produced_output = output.is_some(),
          "action_applied"
        );
        NodeOutput {
          output,
          debug_info: UpdateDebugInfo::did_update(workflow_type, source),
        }
      }
      Output::ChildDidUpdate(child) => NodeOutput {
        output: None,
        debug_info: UpdateDebugInfo::child_did_update(workflow_type, child),
      },
    })
  }

  pub async fn next_output(&mut self) -> NodeOutput<W::Output> {
    poll_fn(|cx| self.poll_next_output(cx)).await
  }

  pub fn make_debug_snapshot(&self) -> DebugSnapshot {
    DebugSnapshot {
      workflow_type: type_name::<W>().to_string(),
      state_description: format!("{:?}", self.state),
      children: self.manager.debug_children(),
    }
  }

  /// Persistence snapshot of this node and every child that has state to save.
  pub fn snapshot(&self) -> TreeSnapshot {
    TreeSnapshot {
      state: self.workflow.snapshot_state(&self.state),
      children: self.manager.snapshot_children(),
    }
  }
}
