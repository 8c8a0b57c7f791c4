use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role record. Referenced by users through the registry's association
/// set, never owned by them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Role {
  pub id: Uuid,
  pub name: String,
  pub description: String,
}

impl Role {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      description: description.into(),
    }
  }
}
