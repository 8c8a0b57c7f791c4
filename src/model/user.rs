use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user record as handed over by the credential store. Roles are not
/// embedded; they are resolved through the role registry so that grants and
/// revocations take effect immediately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  /// Opaque salted hash, never the raw secret.
  pub password_hash: String,
  pub is_active: bool,
  pub is_verified: bool,
}

impl User {
  pub fn new(email: impl Into<String>, password_hash: String) -> Self {
    Self {
      id: Uuid::new_v4(),
      email: email.into(),
      password_hash,
      is_active: true,
      is_verified: false,
    }
  }
}
