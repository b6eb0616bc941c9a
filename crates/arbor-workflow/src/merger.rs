use std::task::{Context, Poll};

use futures::StreamExt;
use futures::stream::{BoxStream, SelectAll};

use crate::output::{Output, Source};

/// Merges every external stream subscribed during one committed render pass.
///
/// Replaced wholesale by the next pass; dropping it detaches all its streams.
pub struct EventSourceMerger<A> {
  streams: SelectAll<BoxStream<'static, A>>,
}

impl<A: Send + 'static> EventSourceMerger<A> {
  pub(crate) fn new(streams: Vec<BoxStream<'static, A>>) -> Self {
    Self {
      streams: futures::stream::select_all(streams),
    }
  }

  /// Number of streams still producing.
  pub fn len(&self) -> usize {
    self.streams.len()
  }

  pub fn is_empty(&self) -> bool {
    self.streams.is_empty()
  }

  pub(crate) fn poll_next_output(&mut self, cx: &mut Context<'_>) -> Poll<Output<A>> {
    match self.streams.poll_next_unpin(cx) {
      Poll::Ready(Some(action)) => Poll::Ready(Output::Update {
        action,
        source: Source::External,
      }),
      // An exhausted merger stays quiet until the next pass replaces it.
      Poll::Ready(None) | Poll::Pending => Poll::Pending,
    }
  }
}

impl<A: Send + 'static> Default for EventSourceMerger<A> {
  fn default() -> Self {
    Self::new(Vec::new())
  }
}
