//! Render pass orchestration for one node's subtree.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tracing::debug;

use crate::child::AnyChild;
use crate::context::{RenderContext, RenderParts};
use crate::debug::{DebugSnapshot, DebugSnapshotChild};
use crate::key::ChildKey;
use crate::merger::EventSourceMerger;
use crate::output::Output;
use crate::sink::{Forwarder, HandleContext};
use crate::snapshot::TreeSnapshot;
use crate::worker::AnyWorker;

/// Owns the children, workers, sinks and subscriptions of one node and
/// reconciles them on every render pass.
///
/// It is also the node's single merge point: [`poll_next_output`] yields one
/// [`Output`] at a time from whichever committed source is ready.
///
/// [`poll_next_output`]: SubtreeManager::poll_next_output
pub struct SubtreeManager<A> {
  workflow_type: &'static str,
  children: HashMap<ChildKey, Box<dyn AnyChild<A>>>,
  workers: Vec<Box<dyn AnyWorker<A>>>,
  sinks: Vec<Arc<HandleContext<A>>>,
  /// Shared by every pass. Late sends are rejected by the sink state, so
  /// anything queued here was accepted while its sink was valid.
  forwarder: Forwarder<A>,
  sink_events: mpsc::UnboundedReceiver<Output<A>>,
  merger: EventSourceMerger<A>,
  /// Child snapshots waiting for their child to be created.
  restored: HashMap<String, TreeSnapshot>,
  passes: u64,
}

impl<A: Send + 'static> SubtreeManager<A> {
  pub fn new(workflow_type: &'static str) -> Self {
    Self::with_restored(workflow_type, HashMap::new())
  }

  pub(crate) fn with_restored(
    workflow_type: &'static str,
    restored: HashMap<String, TreeSnapshot>,
  ) -> Self {
    let (forwarder, sink_events) = mpsc::unbounded_channel();
    Self {
      workflow_type,
      children: HashMap::new(),
      workers: Vec::new(),
      sinks: Vec::new(),
      forwarder,
      sink_events,
      merger: EventSourceMerger::default(),
      restored,
      passes: 0,
    }
  }

  /// Run one render pass.
  ///
  /// Sinks from the previous pass are invalidated before `render` runs.
  /// Afterwards, children and workers that were not requested again are torn
  /// down, and only then are the new sinks activated and the new
  /// subscriptions merged.
  pub fn render<R>(&mut self, render: impl FnOnce(&mut RenderContext<'_, A>) -> R) -> R {
    self.invalidate_sinks();

    let mut context = RenderContext::new(
      self.workflow_type,
      mem::take(&mut self.children),
      mem::take(&mut self.workers),
      &mut self.restored,
    );
    let rendering = render(&mut context);
    let parts = context.into_parts();

    self.commit(parts);
    rendering
  }

  /// Yield the next output from any committed source.
  ///
  /// Sources are checked in a fixed order: sinks, workers, subscriptions,
  /// then children. The order is not fair: a source that is always ready
  /// starves every source checked after it.
  pub fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<Output<A>> {
    if let Poll::Ready(Some(output)) = self.sink_events.poll_recv(cx) {
      return Poll::Ready(output);
    }

    for worker in &mut self.workers {
      if let Poll::Ready(output) = worker.poll_next_output(cx) {
        return Poll::Ready(output);
      }
    }

    if let Poll::Ready(output) = self.merger.poll_next_output(cx) {
      return Poll::Ready(output);
    }

    for child in self.children.values_mut() {
      if let Poll::Ready(output) = child.poll_next_output(cx) {
        return Poll::Ready(output);
      }
    }

    Poll::Pending
  }

  /// Completed render passes.
  pub fn passes(&self) -> u64 {
    self.passes
  }

  pub fn child_count(&self) -> usize {
    self.children.len()
  }

  /// Keys of the committed children, sorted.
  pub fn child_keys(&self) -> Vec<&str> {
    let mut keys: Vec<&str> = self.children.keys().map(ChildKey::key).collect();
    keys.sort_unstable();
    keys
  }

  pub fn worker_count(&self) -> usize {
    self.workers.len()
  }

  pub fn sink_count(&self) -> usize {
    self.sinks.len()
  }

  pub fn subscription_count(&self) -> usize {
    self.merger.len()
  }

  pub(crate) fn debug_children(&self) -> Vec<DebugSnapshotChild> {
    let mut children: Vec<DebugSnapshotChild> = self
      .children
      .iter()
      .map(|(key, child)| DebugSnapshotChild {
        key: key.key().to_string(),
        snapshot: child.debug_snapshot(),
      })
      .collect();
    DebugSnapshot::sort_children(&mut children);
    children
  }

  pub(crate) fn snapshot_children(&self) -> BTreeMap<String, TreeSnapshot> {
    self
      .children
      .iter()
      .map(|(key, child)| (key.snapshot_key(), child.tree_snapshot()))
      .filter(|(_, snapshot)| !snapshot.is_empty())
      .collect()
  }

  /// Stop accepting sends through the previous pass's sinks. Events they
  /// already accepted stay queued and are still delivered.
  fn invalidate_sinks(&mut self) {
    for sink in self.sinks.drain(..) {
      sink.invalidate();
    }
  }

  fn commit(&mut self, parts: RenderParts<A>) {
    let RenderParts {
      children,
      workers,
      sinks,
      subscriptions,
      stale_children,
      stale_workers,
    } = parts;

    for (key, child) in stale_children {
      debug!(
        parent = self.workflow_type,
        child = %key,
        child_type = child.workflow_type(),
        "child_torn_down"
      );
      drop(child);
    }
    for worker in stale_workers {
      debug!(
        parent = self.workflow_type,
        worker = worker.worker_type(),
        "worker_torn_down"
      );
      drop(worker);
    }

    self.children = children;
    self.workers = workers;

    for sink in &sinks {
      sink.make_valid(self.forwarder.clone());
    }
    self.sinks = sinks;
    self.merger = EventSourceMerger::new(subscriptions);
    self.passes += 1;
  }
}

impl<A> Drop for SubtreeManager<A> {
  fn drop(&mut self) {
    for sink in &self.sinks {
      sink.invalidate();
    }
  }
}
