//! Demonstration workflows bundled with the CLI.

use std::time::Duration;

use arbor_workflow::{RenderContext, Snapshot, Worker, Workflow};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;

/// Root of the demo tree: renders `root:{input}` over two keyed leaves.
pub struct TreeRoot {
  pub input: String,
}

#[derive(Debug, Serialize)]
pub struct TreeRendering {
  pub label: String,
  pub children: Vec<LeafRendering>,
}

#[derive(Debug, Serialize)]
pub struct LeafRendering {
  pub key: String,
  pub label: String,
}

impl Workflow for TreeRoot {
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
        let leaf = TreeLeaf {
          name: key.to_string(),
          input: self.input.clone(),
          index,
        };
        LeafRendering {
          key: key.to_string(),
          label: context.render_child_with_key(leaf, key, |()| ()),
        }
      })
      .collect();

    TreeRendering {
      label: format!("root:{}", self.input),
      children,
    }
  }
}

struct TreeLeaf {
  name: String,
  input: String,
  index: usize,
}

impl Workflow for TreeLeaf {
  type State = ();
  type Action = ();
  type Output = ();
  type Rendering = String;

  fn initial_state(&self, _snapshot: Option<&Snapshot>) {}

  fn update(&self, _state: &mut (), _action: ()) -> Option<()> {
    None
  }

  fn render(&self, _state: &(), _context: &mut RenderContext<'_, ()>) -> String {
    format!("{}:{}[{}]", self.name, self.input, self.index)
  }
}

/// Emits `ticks` values, one per `interval`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
  pub ticks: u32,
  pub interval: Duration,
}

impl Worker for Ticker {
  type Output = u32;

  fn run(&self) -> BoxStream<'static, u32> {
    let ticks = self.ticks;
    let interval = self.interval;
    futures::stream::unfold(0, move |tick| async move {
      if tick >= ticks {
        return None;
      }
      tokio::time::sleep(interval).await;
      Some((tick, tick + 1))
    })
    .boxed()
  }

  fn is_equivalent(&self, other: &Self) -> bool {
    self == other
  }
}

/// Reports `0, 1, 2, ...`, one value per tick, and persists its count.
pub struct Counter {
  pub ticker: Ticker,
}

#[derive(Debug, Serialize)]
pub struct CounterRendering {
  pub count: u32,
}

impl Workflow for Counter {
  type State = u32;
  type Action = ();
  type Output = u32;
  type Rendering = CounterRendering;

  fn initial_state(&self, snapshot: Option<&Snapshot>) -> u32 {
    snapshot
      .and_then(|snapshot| serde_json::from_slice(snapshot.as_bytes()).ok())
      .unwrap_or(0)
  }

  fn update(&self, state: &mut u32, _action: ()) -> Option<u32> {
    let current = *state;
    *state += 1;
    Some(current)
  }

  fn render(&self, state: &u32, context: &mut RenderContext<'_, ()>) -> CounterRendering {
    context.await_worker(self.ticker.clone(), |_| ());
    CounterRendering { count: *state }
  }

  fn snapshot_state(&self, state: &u32) -> Option<Snapshot> {
    serde_json::to_vec(state).ok().map(Snapshot::new)
  }
}
