//! Externally exposed event handles and their validity window.
//!
//! A [`Sink`] is only live for the single rendering produced by the pass that
//! created it:
//!
//! ```text
//! preparing ──(pass commits)──▶ valid ──(next pass starts)──▶ invalid
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ContractViolation;
use crate::output::{Output, Source};

/// Where a valid sink forwards its events: the owning pass's event channel.
pub(crate) type Forwarder<A> = mpsc::UnboundedSender<Output<A>>;

enum SinkState<A> {
  Preparing,
  Valid(Forwarder<A>),
  Invalid,
}

/// Lifecycle guard for one sink.
pub struct HandleContext<A> {
  state: Mutex<SinkState<A>>,
}

impl<A> HandleContext<A> {
  pub(crate) fn invalidate(&self) {
    *self.state.lock() = SinkState::Invalid;
  }
}

impl<A: Send + 'static> HandleContext<A> {
  pub(crate) fn new() -> Self {
    Self {
      state: Mutex::new(SinkState::Preparing),
    }
  }

  /// Install the forwarding target. Only the first call out of `preparing` counts.
  pub(crate) fn make_valid(&self, forwarder: Forwarder<A>) {
    let mut state = self.state.lock();
    match *state {
      SinkState::Preparing => *state = SinkState::Valid(forwarder),
      _ => debug!("ignoring second activation of a sink"),
    }
  }

  pub fn is_valid(&self) -> bool {
    matches!(*self.state.lock(), SinkState::Valid(_))
  }

  fn send(&self, action: A) -> Result<(), ContractViolation> {
    // The lock is held across the forward so invalidation cannot interleave.
    let mut state = self.state.lock();
    let delivered = match &*state {
      SinkState::Preparing => return Err(ContractViolation::SinkNotYetValid),
      SinkState::Invalid => return Err(ContractViolation::SinkInvalidated),
      SinkState::Valid(forwarder) => forwarder
        .send(Output::Update {
          action,
          source: Source::External,
        })
        .is_ok(),
    };

    if !delivered {
      *state = SinkState::Invalid;
      return Err(ContractViolation::SinkInvalidated);
    }

    Ok(())
  }
}

/// Caller-facing handle for injecting actions into a node.
///
/// Cheap to clone and safe to move to other threads; every clone shares the
/// same validity window.
pub struct Sink<A> {
  context: Arc<HandleContext<A>>,
}

impl<A: Send + 'static> Sink<A> {
  pub(crate) fn new(context: Arc<HandleContext<A>>) -> Self {
    Self { context }
  }

  /// Deliver `action` to the node that rendered this sink.
  ///
  /// Fails with a [`ContractViolation`] when called before the creating render
  /// pass committed or after the next pass started.
  pub fn send(&self, action: A) -> Result<(), ContractViolation> {
    self.context.send(action)
  }

  pub fn is_valid(&self) -> bool {
    self.context.is_valid()
  }
}

impl<A> Clone for Sink<A> {
  fn clone(&self) -> Self {
    Self {
      context: Arc::clone(&self.context),
    }
  }
}

impl<A> fmt::Debug for Sink<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match *self.context.state.lock() {
      SinkState::Preparing => "preparing",
      SinkState::Valid(_) => "valid",
      SinkState::Invalid => "invalid",
    };
    f.debug_struct("Sink").field("state", &state).finish()
  }
}
