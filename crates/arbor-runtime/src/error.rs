//! Runtime errors.

use arbor_workflow::SnapshotError;

/// Errors that can occur while driving a workflow tree.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// The driver task panicked, e.g. on a contract violation during render.
  #[error("runner aborted: {message}")]
  Aborted { message: String },

  /// The driver task was cancelled before it could finish.
  #[error("runner cancelled")]
  Cancelled,

  /// A persistence snapshot could not be encoded or decoded.
  #[error("snapshot failed")]
  Snapshot {
    #[source]
    source: SnapshotError,
  },

  /// The driver task could not be joined.
  #[error("failed to join runner task: {message}")]
  Join { message: String },
}
