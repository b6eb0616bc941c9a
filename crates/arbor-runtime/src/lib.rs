//! Arbor Runtime
//!
//! This crate drives a workflow tree from the root. It owns the root
//! [`WorkflowNode`](arbor_workflow::WorkflowNode) on a spawned tokio task and
//! exposes renderings, outputs and snapshots to the host through a
//! [`RunnerHandle`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RunnerHandle                           │
//! │  - renderings() / outputs() streams                         │
//! │  - snapshot() / debug_snapshot() (watch channels)           │
//! │  - cancel() / join()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ publish after every step
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     driver task                             │
//! │  - select! over cancel, inputs, root.poll_next_output()     │
//! │  - render → publish → notify                                │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   WorkflowNode (root)                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use arbor_config::RuntimeConfig;
//! use arbor_runtime::start;
//!
//! let mut handle = start(root, futures::stream::pending(), RuntimeConfig::default());
//! let first = handle.renderings().next().await;
//!
//! handle.cancel();
//! handle.join().await?;
//! ```

mod error;
mod notifier;
mod runner;

pub use error::RuntimeError;
pub use notifier::{ChannelNotifier, NoopNotifier, RunnerEvent, TracingNotifier, UpdateNotifier};
pub use runner::{RunnerHandle, WorkflowRunner, start, start_with_snapshot};
