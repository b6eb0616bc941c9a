//! The registration surface handed to a workflow's render function.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::child::{AnyChild, ChildNode};
use crate::error::ContractViolation;
use crate::key::ChildKey;
use crate::sink::{HandleContext, Sink};
use crate::snapshot::TreeSnapshot;
use crate::worker::{AnyWorker, OutputMap, Worker, WorkerHandle};
use crate::workflow::Workflow;

/// Records every child, worker, sink and subscription requested during one
/// render pass of a node whose action type is `A`.
///
/// Only reachable through `&mut` for the duration of the render call.
pub struct RenderContext<'a, A> {
  workflow_type: &'static str,
  previous_children: HashMap<ChildKey, Box<dyn AnyChild<A>>>,
  previous_workers: Vec<Box<dyn AnyWorker<A>>>,
  children: HashMap<ChildKey, Box<dyn AnyChild<A>>>,
  workers: Vec<Box<dyn AnyWorker<A>>>,
  sinks: Vec<Arc<HandleContext<A>>>,
  subscriptions: Vec<BoxStream<'static, A>>,
  restored: &'a mut HashMap<String, TreeSnapshot>,
}

/// Everything a finished render pass requested, plus what it left behind.
pub(crate) struct RenderParts<A> {
  pub children: HashMap<ChildKey, Box<dyn AnyChild<A>>>,
  pub workers: Vec<Box<dyn AnyWorker<A>>>,
  pub sinks: Vec<Arc<HandleContext<A>>>,
  pub subscriptions: Vec<BoxStream<'static, A>>,
  pub stale_children: HashMap<ChildKey, Box<dyn AnyChild<A>>>,
  pub stale_workers: Vec<Box<dyn AnyWorker<A>>>,
}

impl<'a, A: Send + 'static> RenderContext<'a, A> {
  pub(crate) fn new(
    workflow_type: &'static str,
    previous_children: HashMap<ChildKey, Box<dyn AnyChild<A>>>,
    previous_workers: Vec<Box<dyn AnyWorker<A>>>,
    restored: &'a mut HashMap<String, TreeSnapshot>,
  ) -> Self {
    Self {
      workflow_type,
      previous_children,
      previous_workers,
      children: HashMap::new(),
      workers: Vec::new(),
      sinks: Vec::new(),
      subscriptions: Vec::new(),
      restored,
    }
  }

  /// Render a child under the empty key.
  ///
  /// See [`render_child_with_key`](Self::render_child_with_key).
  pub fn render_child<C, F>(&mut self, child: C, map: F) -> C::Rendering
  where
    C: Workflow,
    F: Fn(C::Output) -> A + Send + 'static,
  {
    self.render_child_with_key(child, "", map)
  }

  /// Render a child workflow and return its rendering.
  ///
  /// A child rendered under the same type and key as in the previous pass is
  /// reused: it receives `child` as its new input and `map` as its new output
  /// map, and keeps its state. Otherwise a new child node is created.
  ///
  /// # Panics
  ///
  /// Rendering two children with the same type and key in one pass is a
  /// [`ContractViolation::DuplicateChildKey`] and aborts the pass.
  pub fn render_child_with_key<C, F>(
    &mut self,
    child: C,
    key: impl Into<String>,
    map: F,
  ) -> C::Rendering
  where
    C: Workflow,
    F: Fn(C::Output) -> A + Send + 'static,
  {
    let key = ChildKey::of::<C>(key);
    if self.children.contains_key(&key) {
      panic!(
        "{}",
        ContractViolation::DuplicateChildKey {
          workflow_type: key.type_name().to_string(),
          key: key.key().to_string(),
        }
      );
    }

    let map: OutputMap<C::Output, A> = Box::new(map);
    let previous = self
      .previous_children
      .remove(&key)
      .map(|existing| existing.into_any().downcast::<ChildNode<C, A>>());

    let mut node = match previous {
      Some(Ok(mut existing)) => {
        debug!(parent = self.workflow_type, child = %key, "child_reused");
        existing.update(child, map);
        existing
      }
      _ => {
        debug!(parent = self.workflow_type, child = %key, "child_created");
        let snapshot = self.restored.remove(&key.snapshot_key());
        Box::new(ChildNode::new(child, map, snapshot))
      }
    };

    let rendering = node.render();
    self.children.insert(key, node);
    rendering
  }

  /// Create a sink that delivers actions to this node.
  ///
  /// The sink becomes valid once this render pass commits and stops being
  /// valid when the next pass starts.
  pub fn make_sink(&mut self) -> Sink<A> {
    let context = Arc::new(HandleContext::new());
    self.sinks.push(Arc::clone(&context));
    Sink::new(context)
  }

  /// Merge an external stream of actions into this node for the lifetime of
  /// the rendering being produced.
  pub fn subscribe<S>(&mut self, stream: S)
  where
    S: Stream<Item = A> + Send + 'static,
  {
    self.subscriptions.push(stream.boxed());
  }

  /// Keep `worker` running and map its results with `map`.
  ///
  /// A running worker of the same type that reports itself equivalent is
  /// kept and only has its output map replaced; otherwise `worker` is
  /// started now.
  pub fn await_worker<W, F>(&mut self, worker: W, map: F)
  where
    W: Worker,
    F: Fn(W::Output) -> A + Send + 'static,
  {
    let map: OutputMap<W::Output, A> = Box::new(map);
    let position = self.previous_workers.iter().position(|existing| {
      existing
        .as_any()
        .downcast_ref::<WorkerHandle<W, A>>()
        .is_some_and(|handle| handle.worker().is_equivalent(&worker))
    });

    if let Some(position) = position {
      let mut existing = self.previous_workers.remove(position);
      if let Some(handle) = existing.as_any_mut().downcast_mut::<WorkerHandle<W, A>>() {
        handle.replace_map(map);
      }
      debug!(parent = self.workflow_type, worker = type_name::<W>(), "worker_reused");
      self.workers.push(existing);
      return;
    }

    self.workers.push(Box::new(WorkerHandle::start(worker, map)));
  }

  pub(crate) fn into_parts(self) -> RenderParts<A> {
    RenderParts {
      children: self.children,
      workers: self.workers,
      sinks: self.sinks,
      subscriptions: self.subscriptions,
      stale_children: self.previous_children,
      stale_workers: self.previous_workers,
    }
  }
}
