//! Runner events and notifiers for observability.
//!
//! Events are emitted by the driver loop so consumers can observe renders and
//! updates, stream them to a UI, record them, etc.

use arbor_workflow::UpdateDebugInfo;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Events emitted while a runner drives its tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerEvent {
  /// The driver task has started.
  Started {
    runner_id: String,
    workflow_type: String,
  },

  /// A new root input replaced the previous one.
  InputChanged { runner_id: String },

  /// The tree finished a render pass.
  Rendered { runner_id: String, pass: u64 },

  /// An update travelled up to the root.
  Updated {
    runner_id: String,
    debug_info: UpdateDebugInfo,
    produced_output: bool,
  },

  /// The driver loop exited.
  Stopped { runner_id: String },
}

/// Trait for receiving runner events.
///
/// The runner calls `notify` for each event; implementations decide what to
/// do with them.
pub trait UpdateNotifier: Send + Sync {
  fn notify(&self, event: RunnerEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl UpdateNotifier for NoopNotifier {
  fn notify(&self, _event: RunnerEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the driver loop.
  sender: mpsc::UnboundedSender<RunnerEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunnerEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunnerEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl UpdateNotifier for ChannelNotifier {
  fn notify(&self, event: RunnerEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// A notifier that logs every event at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl UpdateNotifier for TracingNotifier {
  fn notify(&self, event: RunnerEvent) {
    match event {
      RunnerEvent::Started {
        runner_id,
        workflow_type,
      } => debug!(runner_id = %runner_id, workflow_type = %workflow_type, "runner_event_started"),
      RunnerEvent::InputChanged { runner_id } => {
        debug!(runner_id = %runner_id, "runner_event_input_changed")
      }
      RunnerEvent::Rendered { runner_id, pass } => {
        debug!(runner_id = %runner_id, pass, "runner_event_rendered")
      }
      RunnerEvent::Updated {
        runner_id,
        debug_info,
        produced_output,
      } => debug!(
        runner_id = %runner_id,
        origin = %debug_info.origin().workflow_type,
        depth = debug_info.depth(),
        produced_output,
        "runner_event_updated"
      ),
      RunnerEvent::Stopped { runner_id } => {
        debug!(runner_id = %runner_id, "runner_event_stopped")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use arbor_workflow::Source;

  #[test]
  fn test_channel_notifier_forwards_events() {
    let (notifier, mut events) = ChannelNotifier::channel();

    notifier.notify(RunnerEvent::Stopped {
      runner_id: "r1".to_string(),
    });

    assert_eq!(
      events.try_recv().unwrap(),
      RunnerEvent::Stopped {
        runner_id: "r1".to_string()
      }
    );
  }

  #[test]
  fn test_channel_notifier_ignores_closed_receiver() {
    let (notifier, events) = ChannelNotifier::channel();
    drop(events);

    notifier.notify(RunnerEvent::InputChanged {
      runner_id: "r1".to_string(),
    });
  }

  #[test]
  fn test_tracing_notifier_accepts_every_event() {
    let notifier = TracingNotifier;
    notifier.notify(RunnerEvent::Updated {
      runner_id: "r1".to_string(),
      debug_info: UpdateDebugInfo::did_update("Root", Source::External),
      produced_output: true,
    });
    NoopNotifier.notify(RunnerEvent::Rendered {
      runner_id: "r1".to_string(),
      pass: 1,
    });
  }
}
