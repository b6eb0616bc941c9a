//! Root driver with channel-based publishing.
//!
//! The `WorkflowRunner` owns the root [`WorkflowNode`] on a spawned task,
//! feeds it new inputs, waits for updates from anywhere in the tree, and
//! republishes renderings, outputs and snapshots after every step.

use std::any::{Any, type_name};
use std::future::poll_fn;
use std::sync::Arc;

use arbor_config::RuntimeConfig;
use arbor_workflow::{DebugSnapshot, NodeOutput, TreeSnapshot, Workflow, WorkflowNode};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::RuntimeError;
use crate::notifier::{NoopNotifier, RunnerEvent, UpdateNotifier};

/// Builds and starts a driver task for one workflow tree.
///
/// # Usage
///
/// ```ignore
/// let mut handle = WorkflowRunner::new(root, RuntimeConfig::default())
///   .with_notifier(Arc::new(TracingNotifier))
///   .start(inputs);
///
/// let mut renderings = handle.renderings();
/// while let Some(rendering) = renderings.next().await {
///   // ...
/// }
///
/// handle.cancel();
/// handle.join().await?;
/// ```
pub struct WorkflowRunner<W: Workflow> {
  workflow: W,
  config: RuntimeConfig,
  snapshot: Option<TreeSnapshot>,
  notifier: Arc<dyn UpdateNotifier>,
}

impl<W> WorkflowRunner<W>
where
  W: Workflow,
  W::Rendering: Send + 'static,
{
  pub fn new(workflow: W, config: RuntimeConfig) -> Self {
    Self {
      workflow,
      config,
      snapshot: None,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Restore the tree from bytes previously read from [`RunnerHandle::snapshot`].
  pub fn with_snapshot(mut self, bytes: &[u8]) -> Result<Self, RuntimeError> {
    let snapshot =
      TreeSnapshot::from_bytes(bytes).map_err(|source| RuntimeError::Snapshot { source })?;
    self.snapshot = Some(snapshot);
    Ok(self)
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn UpdateNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Spawn the driver task.
  ///
  /// Each value from `inputs` replaces the root workflow and triggers a render.
  /// Must be called from within a tokio runtime.
  pub fn start<S>(self, inputs: S) -> RunnerHandle<W>
  where
    S: Stream<Item = W> + Send + 'static,
  {
    let runner_id = uuid::Uuid::new_v4().to_string();
    let cancel = CancellationToken::new();

    let (renderings, rendering_stream) = Publisher::new(self.config.output_buffer);
    let (outputs, output_receiver) = mpsc::unbounded_channel();
    let (snapshots, snapshot_receiver) = watch::channel(Bytes::new());
    let (debug_snapshots, debug_receiver) = watch::channel(None);

    let driver = Driver {
      runner_id: runner_id.clone(),
      root: WorkflowNode::with_snapshot(self.workflow, self.snapshot),
      config: self.config,
      notifier: self.notifier,
      renderings,
      outputs,
      snapshots,
      debug_snapshots,
      cancel: cancel.clone(),
    };
    let task = tokio::spawn(driver.run(inputs.boxed()));

    RunnerHandle {
      runner_id,
      renderings: Some(rendering_stream),
      outputs: Some(output_receiver),
      snapshot: snapshot_receiver,
      debug_snapshot: debug_receiver,
      cancel,
      task: Some(task),
    }
  }
}

/// Start driving `workflow`, with later inputs taken from `inputs`.
pub fn start<W, S>(workflow: W, inputs: S, config: RuntimeConfig) -> RunnerHandle<W>
where
  W: Workflow,
  W::Rendering: Send + 'static,
  S: Stream<Item = W> + Send + 'static,
{
  WorkflowRunner::new(workflow, config).start(inputs)
}

/// Like [`start`], restoring the tree from a persisted snapshot first.
pub fn start_with_snapshot<W, S>(
  workflow: W,
  inputs: S,
  config: RuntimeConfig,
  snapshot: &[u8],
) -> Result<RunnerHandle<W>, RuntimeError>
where
  W: Workflow,
  W::Rendering: Send + 'static,
  S: Stream<Item = W> + Send + 'static,
{
  Ok(
    WorkflowRunner::new(workflow, config)
      .with_snapshot(snapshot)?
      .start(inputs),
  )
}

/// Host-side view of a running tree.
///
/// Dropping the handle cancels the driver task.
pub struct RunnerHandle<W: Workflow> {
  runner_id: String,
  renderings: Option<BoxStream<'static, W::Rendering>>,
  outputs: Option<mpsc::UnboundedReceiver<W::Output>>,
  snapshot: watch::Receiver<Bytes>,
  debug_snapshot: watch::Receiver<Option<DebugSnapshot>>,
  cancel: CancellationToken,
  task: Option<JoinHandle<Result<(), RuntimeError>>>,
}

impl<W: Workflow> RunnerHandle<W> {
  pub fn runner_id(&self) -> &str {
    &self.runner_id
  }

  /// Every rendering of the root, starting with the initial one.
  ///
  /// The stream can be taken once; later calls return an empty stream.
  pub fn renderings(&mut self) -> BoxStream<'static, W::Rendering>
  where
    W::Rendering: Send + 'static,
  {
    self
      .renderings
      .take()
      .unwrap_or_else(|| futures::stream::empty().boxed())
  }

  /// Every output the root produced, in delivery order.
  ///
  /// The stream can be taken once; later calls return an empty stream.
  pub fn outputs(&mut self) -> BoxStream<'static, W::Output> {
    match self.outputs.take() {
      Some(receiver) => UnboundedReceiverStream::new(receiver).boxed(),
      None => futures::stream::empty().boxed(),
    }
  }

  /// Latest encoded [`TreeSnapshot`]. Empty until the first render when
  /// snapshot publishing is enabled, and always empty when it is not.
  pub fn snapshot(&self) -> Bytes {
    self.snapshot.borrow().clone()
  }

  /// Latest debug snapshot of the tree, if publishing is enabled.
  pub fn debug_snapshot(&self) -> Option<DebugSnapshot> {
    self.debug_snapshot.borrow().clone()
  }

  /// Wait until a snapshot newer than the last one read has been published.
  pub async fn snapshot_changed(&mut self) -> Option<Bytes> {
    self.snapshot.changed().await.ok()?;
    Some(self.snapshot.borrow_and_update().clone())
  }

  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Wait for the driver task to finish.
  ///
  /// A panic inside the tree, such as a duplicate child key, surfaces as
  /// [`RuntimeError::Aborted`].
  pub async fn join(mut self) -> Result<(), RuntimeError> {
    let Some(task) = self.task.take() else {
      return Ok(());
    };

    match task.await {
      Ok(result) => result,
      Err(e) => Err(join_error(e)),
    }
  }
}

impl<W: Workflow> Drop for RunnerHandle<W> {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

fn join_error(e: JoinError) -> RuntimeError {
  if e.is_cancelled() {
    return RuntimeError::Cancelled;
  }
  if e.is_panic() {
    return RuntimeError::Aborted {
      message: panic_message(e.into_panic()),
    };
  }
  RuntimeError::Join {
    message: e.to_string(),
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  match payload.downcast::<String>() {
    Ok(message) => *message,
    Err(payload) => match payload.downcast::<&'static str>() {
      Ok(message) => message.to_string(),
      Err(_) => "driver task panicked".to_string(),
    },
  }
}

/// Sending half of the renderings channel.
enum Publisher<T> {
  Bounded(mpsc::Sender<T>),
  Unbounded(mpsc::UnboundedSender<T>),
}

impl<T: Send + 'static> Publisher<T> {
  fn new(buffer: Option<usize>) -> (Self, BoxStream<'static, T>) {
    match buffer {
      Some(capacity) => {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::Bounded(sender), ReceiverStream::new(receiver).boxed())
      }
      None => {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
          Self::Unbounded(sender),
          UnboundedReceiverStream::new(receiver).boxed(),
        )
      }
    }
  }

  /// Waits for room on a bounded channel unless `cancel` fires first.
  async fn publish(&self, value: T, cancel: &CancellationToken) -> Published {
    let sent = match self {
      Self::Bounded(sender) => tokio::select! {
        biased;
        _ = cancel.cancelled() => return Published::Cancelled,
        sent = sender.send(value) => sent.is_ok(),
      },
      Self::Unbounded(sender) => sender.send(value).is_ok(),
    };

    if sent {
      Published::Sent
    } else {
      Published::Closed
    }
  }
}

enum Published {
  Sent,
  /// The consumer has gone away.
  Closed,
  Cancelled,
}

struct Driver<W: Workflow> {
  runner_id: String,
  root: WorkflowNode<W>,
  config: RuntimeConfig,
  notifier: Arc<dyn UpdateNotifier>,
  renderings: Publisher<W::Rendering>,
  outputs: mpsc::UnboundedSender<W::Output>,
  snapshots: watch::Sender<Bytes>,
  debug_snapshots: watch::Sender<Option<DebugSnapshot>>,
  cancel: CancellationToken,
}

impl<W> Driver<W>
where
  W: Workflow,
  W::Rendering: Send + 'static,
{
  /// The driver loop.
  ///
  /// Runs until cancelled. One step is either a new input or a single update
  /// from the tree, and every step ends with a render and a publish.
  #[instrument(
    name = "runner",
    skip(self, inputs),
    fields(
      runner_id = %self.runner_id,
      workflow_type = type_name::<W>(),
    )
  )]
  async fn run(mut self, mut inputs: BoxStream<'static, W>) -> Result<(), RuntimeError> {
    info!(runner_id = %self.runner_id, "runner_started");
    self.notifier.notify(RunnerEvent::Started {
      runner_id: self.runner_id.clone(),
      workflow_type: type_name::<W>().to_string(),
    });

    let cancel = self.cancel.clone();
    let result = self.drive(&mut inputs, &cancel).await;

    match &result {
      Ok(()) => info!(runner_id = %self.runner_id, "runner_stopped"),
      Err(e) => error!(runner_id = %self.runner_id, error = %e, "runner_failed"),
    }
    self.notifier.notify(RunnerEvent::Stopped {
      runner_id: self.runner_id.clone(),
    });

    result
  }

  async fn drive(
    &mut self,
    inputs: &mut BoxStream<'static, W>,
    cancel: &CancellationToken,
  ) -> Result<(), RuntimeError> {
    self.render_and_publish().await?;

    let mut inputs_closed = false;
    loop {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          info!(runner_id = %self.runner_id, "runner_cancelled");
          return Ok(());
        }
        input = inputs.next(), if !inputs_closed => match input {
          Some(workflow) => {
            debug!(runner_id = %self.runner_id, "input_changed");
            self.root.update_workflow(workflow);
            self.notifier.notify(RunnerEvent::InputChanged {
              runner_id: self.runner_id.clone(),
            });
            self.render_and_publish().await?;
          }
          None => {
            debug!(runner_id = %self.runner_id, "input_stream_closed");
            inputs_closed = true;
          }
        },
        update = poll_fn(|cx| self.root.poll_next_output(cx)) => {
          self.deliver(update).await?;
        }
      }
    }
  }

  async fn deliver(&mut self, update: NodeOutput<W::Output>) -> Result<(), RuntimeError> {
    let NodeOutput { output, debug_info } = update;

    self.render_and_publish().await?;

    let produced_output = output.is_some();
    if let Some(output) = output {
      // Ignore send errors - the host may not be reading outputs
      let _ = self.outputs.send(output);
    }

    self.notifier.notify(RunnerEvent::Updated {
      runner_id: self.runner_id.clone(),
      debug_info,
      produced_output,
    });
    Ok(())
  }

  async fn render_and_publish(&mut self) -> Result<(), RuntimeError> {
    let rendering = self.root.render();
    let pass = self.root.manager().passes();

    // Snapshots go out first so they are current by the time a host sees the rendering.
    if self.config.publish_snapshots {
      let bytes = self
        .root
        .snapshot()
        .to_bytes()
        .map_err(|source| RuntimeError::Snapshot { source })?;
      self.snapshots.send_replace(bytes);
    }
    if self.config.publish_debug_snapshots {
      self
        .debug_snapshots
        .send_replace(Some(self.root.make_debug_snapshot()));
    }

    match self.renderings.publish(rendering, &self.cancel).await {
      Published::Sent => {}
      Published::Closed => debug!(runner_id = %self.runner_id, pass, "rendering_dropped"),
      // The driver loop sees the cancellation on its next turn.
      Published::Cancelled => return Ok(()),
    }

    self.notifier.notify(RunnerEvent::Rendered {
      runner_id: self.runner_id.clone(),
      pass,
    });
    Ok(())
  }
}
