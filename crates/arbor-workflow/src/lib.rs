//! Arbor Workflow Engine
//!
//! This crate provides the subtree reconciliation and event-merging core of
//! arbor. A tree of [`Workflow`]s is rendered top-down; every node owns a
//! [`SubtreeManager`] that diffs the children, workers, sinks and
//! subscriptions requested in each pass against the previous pass, and merges
//! their events back into one ordered stream of outputs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WorkflowNode<W>                         │
//! │  - owns input (W) and state (W::State)                      │
//! │  - render() → W::Rendering                                  │
//! │  - poll_next_output() applies actions via Workflow::update  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SubtreeManager<A>                        │
//! │  - render(f): invalidate sinks, run f, diff, commit         │
//! │  - single merge point for all committed sources             │
//! └─────────────────────────────────────────────────────────────┘
//!          │              │               │               │
//!          ▼              ▼               ▼               ▼
//!     ┌─────────┐   ┌────────────┐  ┌───────────┐  ┌─────────────┐
//!     │  Sinks  │   │  Workers   │  │  Streams  │  │  Children   │
//!     │ (mpsc)  │   │ (tasks)    │  │ (merger)  │  │ (ChildNode) │
//!     └─────────┘   └────────────┘  └───────────┘  └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use arbor_workflow::{RenderContext, Snapshot, Workflow, WorkflowNode};
//!
//! let mut node = WorkflowNode::new(Root { input: "X".into() });
//! let rendering = node.render();
//!
//! // Wait for the next event anywhere in the tree, then re-render.
//! let update = node.next_output().await;
//! let rendering = node.render();
//! ```

mod child;
mod context;
mod debug;
mod error;
mod key;
mod merger;
mod node;
mod output;
mod sink;
mod snapshot;
mod subtree;
mod worker;
mod workflow;

pub use context::RenderContext;
pub use debug::{DebugSnapshot, DebugSnapshotChild};
pub use error::{ContractViolation, SnapshotError};
pub use key::ChildKey;
pub use merger::EventSourceMerger;
pub use node::WorkflowNode;
pub use output::{NodeOutput, Output, Source, UpdateDebugInfo, UpdateKind};
pub use sink::{HandleContext, Sink};
pub use snapshot::{Snapshot, TreeSnapshot};
pub use subtree::SubtreeManager;
pub use worker::Worker;
pub use workflow::Workflow;
