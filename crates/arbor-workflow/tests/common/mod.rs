//! Workflows and workers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use arbor_workflow::{
  ContractViolation, NodeOutput, RenderContext, Sink, Snapshot, Worker, Workflow, WorkflowNode,
};
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Wait for the next output from `node`, failing the test after one second.
pub async fn next<W: Workflow>(node: &mut WorkflowNode<W>) -> NodeOutput<W::Output> {
  tokio::time::timeout(Duration::from_secs(1), node.next_output())
    .await
    .expect("no output within timeout")
}

/// Assert that `node` has nothing to deliver.
pub async fn assert_quiet<W: Workflow>(node: &mut WorkflowNode<W>) {
  let result = tokio::time::timeout(Duration::from_millis(50), node.next_output()).await;
  assert!(result.is_err(), "unexpected output from a quiet node");
}

// -- Leaf / Parent ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafAction {
  /// Bump the counter and report it.
  Increment,
  /// Change internal state without reporting anything.
  Touch,
}

pub struct Leaf {
  pub label: String,
}

#[derive(Debug, Default)]
pub struct LeafState {
  pub count: u32,
  pub touches: u32,
}

pub struct LeafRendering {
  pub label: String,
  pub count: u32,
  pub sink: Sink<LeafAction>,
}

impl Workflow for Leaf {
  type State = LeafState;
  type Action = LeafAction;
  type Output = u32;
  type Rendering = LeafRendering;

  fn initial_state(&self, snapshot: Option<&Snapshot>) -> LeafState {
    let count = snapshot
      .and_then(|snapshot| serde_json::from_slice(snapshot.as_bytes()).ok())
      .unwrap_or(0);
    LeafState { count, touches: 0 }
  }

  fn update(&self, state: &mut LeafState, action: LeafAction) -> Option<u32> {
    match action {
      LeafAction::Increment => {
        state.count += 1;
        Some(state.count)
      }
      LeafAction::Touch => {
        state.touches += 1;
        None
      }
    }
  }

  fn render(&self, state: &LeafState, context: &mut RenderContext<'_, LeafAction>) -> LeafRendering {
    LeafRendering {
      label: self.label.clone(),
      count: state.count,
      sink: context.make_sink(),
    }
  }

  fn snapshot_state(&self, state: &LeafState) -> Option<Snapshot> {
    serde_json::to_vec(&state.count).ok().map(Snapshot::new)
  }
}

/// Renders one [`Leaf`] per key, in order.
pub struct Parent {
  pub keys: Vec<String>,
}

impl Parent {
  pub fn new(keys: &[&str]) -> Self {
    Self {
      keys: keys.iter().map(|key| key.to_string()).collect(),
    }
  }
}

#[derive(Debug, Default)]
pub struct ParentState {
  pub reports: Vec<(String, u32)>,
}

impl Workflow for Parent {
  type State = ParentState;
  type Action = (String, u32);
  type Output = String;
  type Rendering = Vec<LeafRendering>;

  fn initial_state(&self, _snapshot: Option<&Snapshot>) -> ParentState {
    ParentState::default()
  }

  fn update(&self, state: &mut ParentState, (key, count): (String, u32)) -> Option<String> {
    let output = format!("{}={}", key, count);
    state.reports.push((key, count));
    Some(output)
  }

  fn render(
    &self,
    _state: &ParentState,
    context: &mut RenderContext<'_, (String, u32)>,
  ) -> Vec<LeafRendering> {
    self
      .keys
      .iter()
      .map(|key| {
        let reported = key.clone();
        context.render_child_with_key(
          Leaf { label: key.clone() },
          key.clone(),
          move |count| (reported.clone(), count),
        )
      })
      .collect()
  }
}

/// Renders a [`Leaf`] and a [`Labeled`] under the same key, plus an optional
/// second [`Labeled`] with that key.
pub struct Mixed {
  pub key: String,
  pub repeat_labeled: bool,
}

impl Workflow for Mixed {
  type State = ();
  type Action = ();
  type Output = ();
  type Rendering = (String, String);

  fn initial_state(&self, _snapshot: Option<&Snapshot>) {}

  fn update(&self, _state: &mut (), _action: ()) -> Option<()> {
    None
  }

  fn render(&self, _state: &(), context: &mut RenderContext<'_, ()>) -> (String, String) {
    let leaf = context.render_child_with_key(
      Leaf {
        label: self.key.clone(),
      },
      self.key.clone(),
      |_| (),
    );
    let labeled = Labeled {
      name: self.key.clone(),
      input: "X".to_string(),
      index: 0,
    };
    let labeled = context.render_child_with_key(labeled, self.key.clone(), |()| ());
    if self.repeat_labeled {
      let again = Labeled {
        name: self.key.clone(),
        input: "X".to_string(),
        index: 1,
      };
      context.render_child_with_key(again, self.key.clone(), |()| ());
    }
    (leaf.label, labeled)
  }
}

// -- Workers ------------------------------------------------------------------

/// Never produces anything; counts how often it was started.
#[derive(Clone)]
pub struct Feed {
  pub id: u32,
  pub runs: Arc<AtomicUsize>,
}

impl Feed {
  pub fn new(id: u32, runs: &Arc<AtomicUsize>) -> Self {
    Self {
      id,
      runs: Arc::clone(runs),
    }
  }
}

impl Worker for Feed {
  type Output = u32;

  fn run(&self) -> BoxStream<'static, u32> {
    self.runs.fetch_add(1, Ordering::SeqCst);
    futures::stream::pending().boxed()
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

/// Forwards whatever the test pushes into its channel.
#[derive(Clone)]
pub struct Relay {
  source: Arc<Mutex<Option<mpsc::UnboundedReceiver<u32>>>>,
}

impl Relay {
  pub fn channel() -> (mpsc::UnboundedSender<u32>, Self) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let relay = Self {
      source: Arc::new(Mutex::new(Some(receiver))),
    };
    (sender, relay)
  }
}

impl Worker for Relay {
  type Output = u32;

  fn run(&self) -> BoxStream<'static, u32> {
    match self.source.lock().take() {
      Some(receiver) => UnboundedReceiverStream::new(receiver).boxed(),
      None => futures::stream::empty().boxed(),
    }
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.source, &other.source)
  }
}

struct DropFlag(Arc<AtomicBool>);

impl DropFlag {
  fn mark(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

impl Drop for DropFlag {
  fn drop(&mut self) {
    self.0.store(true, Ordering::SeqCst);
  }
}

/// Runs forever; flips `dropped` once its stream is released.
#[derive(Clone)]
pub struct Sleeper {
  pub dropped: Arc<AtomicBool>,
}

impl Worker for Sleeper {
  type Output = u32;

  fn run(&self) -> BoxStream<'static, u32> {
    let flag = DropFlag(Arc::clone(&self.dropped));
    futures::stream::pending()
      .map(move |value: u32| {
        flag.mark();
        value
      })
      .boxed()
  }

  fn is_equivalent(&self, _other: &Self) -> bool {
    true
  }
}

// -- Workflows around workers, sinks and streams ------------------------------

/// Runs an optional worker and reports each result plus `offset`.
pub struct Background<W> {
  pub worker: Option<W>,
  pub offset: u32,
}

impl<W> Background<W> {
  pub fn running(worker: W) -> Self {
    Self {
      worker: Some(worker),
      offset: 0,
    }
  }

  pub fn idle() -> Self {
    Self {
      worker: None,
      offset: 0,
    }
  }
}

impl<W: Worker<Output = u32> + Clone> Workflow for Background<W> {
  type State = ();
  type Action = u32;
  type Output = u32;
  type Rendering = ();

  fn initial_state(&self, _snapshot: Option<&Snapshot>) {}

  fn update(&self, _state: &mut (), action: u32) -> Option<u32> {
    Some(action)
  }

  fn render(&self, _state: &(), context: &mut RenderContext<'_, u32>) {
    if let Some(worker) = &self.worker {
      let offset = self.offset;
      context.await_worker(worker.clone(), move |value| value + offset);
    }
  }
}

/// Reports `0, 1, 2, ...` for each value its relay produces.
pub struct Counter {
  pub relay: Relay,
}

impl Workflow for Counter {
  type State = u32;
  type Action = ();
  type Output = u32;
  type Rendering = u32;

  fn initial_state(&self, _snapshot: Option<&Snapshot>) -> u32 {
    0
  }

  fn update(&self, state: &mut u32, _action: ()) -> Option<u32> {
    let current = *state;
    *state += 1;
    Some(current)
  }

  fn render(&self, state: &u32, context: &mut RenderContext<'_, ()>) -> u32 {
    context.await_worker(self.relay.clone(), |_| ());
    *state
  }
}

/// Creates a sink every pass and tries it before the pass has committed.
pub struct Echo;

pub struct EchoRendering {
  pub sink: Sink<u32>,
  pub during_render: Result<(), ContractViolation>,
}

impl Workflow for Echo {
  type State = ();
  type Action = u32;
  type Output = u32;
  type Rendering = EchoRendering;

  fn initial_state(&self, _snapshot: Option<&Snapshot>) {}

  fn update(&self, _state: &mut (), action: u32) -> Option<u32> {
    Some(action)
  }

  fn render(&self, _state: &(), context: &mut RenderContext<'_, u32>) -> EchoRendering {
    let sink = context.make_sink();
    let during_render = sink.send(0);
    EchoRendering {
      sink,
      during_render,
    }
  }
}

/// Subscribes to its receiver on the first pass only.
pub struct Listener {
  pub source: Arc<Mutex<Option<mpsc::UnboundedReceiver<u32>>>>,
}

impl Listener {
  pub fn channel() -> (mpsc::UnboundedSender<u32>, Self) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let listener = Self {
      source: Arc::new(Mutex::new(Some(receiver))),
    };
    (sender, listener)
  }
}

impl Workflow for Listener {
  type State = ();
  type Action = u32;
  type Output = u32;
  type Rendering = ();

  fn initial_state(&self, _snapshot: Option<&Snapshot>) {}

  fn update(&self, _state: &mut (), action: u32) -> Option<u32> {
    Some(action)
  }

  fn render(&self, _state: &(), context: &mut RenderContext<'_, u32>) {
    if let Some(receiver) = self.source.lock().take() {
      context.subscribe(UnboundedReceiverStream::new(receiver));
    }
  }
}

// -- Labeled tree -------------------------------------------------------------

/// Renders `"{name}:{input}[{index}]"` and counts input changes.
pub struct Labeled {
  pub name: String,
  pub input: String,
  pub index: usize,
}

impl Workflow for Labeled {
  type State = u32;
  type Action = ();
  type Output = ();
  type Rendering = String;

  fn initial_state(&self, _snapshot: Option<&Snapshot>) -> u32 {
    0
  }

  fn workflow_did_change(&self, previous: &Self, state: &mut u32) {
    if previous.input != self.input {
      *state += 1;
    }
  }

  fn update(&self, _state: &mut u32, _action: ()) -> Option<()> {
    None
  }

  fn render(&self, _state: &u32, _context: &mut RenderContext<'_, ()>) -> String {
    format!("{}:{}[{}]", self.name, self.input, self.index)
  }
}

pub struct Root {
  pub input: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TreeRendering {
  pub label: String,
  pub children: Vec<(String, String)>,
}

impl TreeRendering {
  pub fn child(&self, key: &str) -> Option<&str> {
    self
      .children
      .iter()
      .find(|(child, _)| child == key)
      .map(|(_, rendering)| rendering.as_str())
  }
}

impl Workflow for Root {
  type State = ();
  type Action = ();
  type Output = ();
  type Rendering = TreeRendering;

  fn initial_state(&self, _snapshot: Option<&Snapshot>) {}

  fn update(&self, _state: &mut (), _action: ()) -> Option<()> {
    None
  }

  fn render(&self, _state: &(), context: &mut RenderContext<'_, ()>) -> TreeRendering {
    let children = ["leaf1", "leaf2"]
      .into_iter()
      .enumerate()
      .map(|(index, key)| {
        let child = Labeled {
          name: key.to_string(),
          input: self.input.clone(),
          index,
        };
        (key.to_string(), context.render_child_with_key(child, key, |()| ()))
      })
      .collect();

    TreeRendering {
      label: format!("root:{}", self.input),
      children,
    }
  }
}
