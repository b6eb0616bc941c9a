use thiserror::Error;

/// Programmer errors in how the engine is driven.
///
/// These are never retried or recovered from. A duplicate child key aborts
/// the render pass that produced it, and a sink used outside its validity
/// window refuses the event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
  /// Two children with the same workflow type and key were rendered in one pass.
  #[error("contract violation: duplicate child key '{key}' for workflow type {workflow_type}")]
  DuplicateChildKey { workflow_type: String, key: String },

  /// A sink was used while its render pass was still in progress.
  #[error("contract violation: sink used before its render pass committed")]
  SinkNotYetValid,

  /// A sink was used after the rendering it belongs to was superseded.
  #[error("contract violation: sink used after its rendering was superseded")]
  SinkInvalidated,
}

/// Errors encoding or decoding persisted tree snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
  #[error("failed to encode snapshot: {0}")]
  Encode(#[source] serde_json::Error),

  #[error("failed to decode snapshot: {0}")]
  Decode(#[source] serde_json::Error),
}
