//! Background workers and their per-node handles.

use std::any::{Any, type_name};
use std::task::{Context, Poll};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::output::{Output, Source};

/// Maps a source's raw value into the owning node's action type.
pub(crate) type OutputMap<T, A> = Box<dyn Fn(T) -> A + Send>;

/// A unit of asynchronous work whose results become actions.
///
/// A worker requested again on a later render is kept running when the new
/// request [`is_equivalent`](Worker::is_equivalent) to the running one.
pub trait Worker: Send + 'static {
  type Output: Send + 'static;

  /// Start the work. Called once per started execution.
  fn run(&self) -> BoxStream<'static, Self::Output>;

  /// Whether `other` describes the same ongoing work as `self`.
  fn is_equivalent(&self, other: &Self) -> bool;
}

/// Type-erased view of a [`WorkerHandle`] held by a subtree manager.
pub(crate) trait AnyWorker<A>: Send {
  fn as_any(&self) -> &dyn Any;

  fn as_any_mut(&mut self) -> &mut dyn Any;

  fn worker_type(&self) -> &'static str;

  fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<Output<A>>;
}

/// One running worker execution.
///
/// Results are buffered in a channel until the owning manager polls them,
/// and mapped with whichever output map is current at delivery time.
pub(crate) struct WorkerHandle<W: Worker, A> {
  worker: W,
  map: OutputMap<W::Output, A>,
  receiver: mpsc::UnboundedReceiver<W::Output>,
  cancel: CancellationToken,
  task: JoinHandle<()>,
  finished: bool,
}

impl<W: Worker, A: Send + 'static> WorkerHandle<W, A> {
  /// Start executing `worker` on the tokio runtime.
  ///
  /// Must be called from within a tokio runtime.
  pub(crate) fn start(worker: W, map: OutputMap<W::Output, A>) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_worker(worker.run(), sender, cancel.clone()));

    debug!(worker = type_name::<W>(), "worker_started");

    Self {
      worker,
      map,
      receiver,
      cancel,
      task,
      finished: false,
    }
  }

  pub(crate) fn worker(&self) -> &W {
    &self.worker
  }

  /// Swap the output map; the execution is left untouched.
  pub(crate) fn replace_map(&mut self, map: OutputMap<W::Output, A>) {
    self.map = map;
  }
}

impl<W: Worker, A: Send + 'static> AnyWorker<A> for WorkerHandle<W, A> {
  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }

  fn worker_type(&self) -> &'static str {
    type_name::<W>()
  }

  fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<Output<A>> {
    if self.finished {
      return Poll::Pending;
    }

    match self.receiver.poll_recv(cx) {
      Poll::Ready(Some(output)) => Poll::Ready(Output::Update {
        action: (self.map)(output),
        source: Source::Worker,
      }),
      Poll::Ready(None) => {
        debug!(worker = type_name::<W>(), "worker_finished");
        self.finished = true;
        Poll::Pending
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

impl<W: Worker, A> Drop for WorkerHandle<W, A> {
  fn drop(&mut self) {
    self.cancel.cancel();
    self.task.abort();
    if !self.finished {
      debug!(worker = type_name::<W>(), "worker_cancelled");
    }
  }
}

async fn run_worker<T: Send>(
  mut stream: BoxStream<'static, T>,
  sender: mpsc::UnboundedSender<T>,
  cancel: CancellationToken,
) {
  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      next = stream.next() => match next {
        Some(output) => {
          if sender.send(output).is_err() {
            break;
          }
        }
        None => break,
      },
    }
  }
}
