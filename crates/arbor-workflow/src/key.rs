use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a requested child: its concrete workflow type plus a string key.
///
/// Equality and hashing use the type id and the key; the type name is kept
/// for logging and snapshots only.
#[derive(Debug, Clone)]
pub struct ChildKey {
  type_id: TypeId,
  type_name: &'static str,
  key: String,
}

impl ChildKey {
  /// Key for a child workflow of type `W`.
  pub fn of<W: 'static>(key: impl Into<String>) -> Self {
    Self {
      type_id: TypeId::of::<W>(),
      type_name: type_name::<W>(),
      key: key.into(),
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Key under which this child's persisted state is stored in its parent.
  pub(crate) fn snapshot_key(&self) -> String {
    format!("{}:{}", self.type_name, self.key)
  }
}

impl PartialEq for ChildKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.key == other.key
  }
}

impl Eq for ChildKey {}

impl Hash for ChildKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
    self.key.hash(state);
  }
}

impl fmt::Display for ChildKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{:?}]", self.type_name, self.key)
  }
}
