use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::user::User;

/// Credential store contract. Pure data access, no business rules; the
/// embedding application supplies the real implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
  /// Case-insensitive email lookup.
  async fn find_by_email(&self, email: &str)
    -> Result<Option<User>, StoreError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
  /// Insert-or-replace keyed by id, atomic per entity.
  async fn save(&self, user: User) -> Result<(), StoreError>;
}

/// In-memory store. The reference implementation for tests and small
/// embeddings; every mutation holds the write lock for its full duration so
/// readers never observe a partial update.
pub struct InMemoryUserStore {
  users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
  pub fn new() -> Self {
    Self {
      users: RwLock::new(Vec::new()),
    }
  }
}

impl Default for InMemoryUserStore {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
  async fn find_by_email(
    &self,
    email: &str,
  ) -> Result<Option<User>, StoreError> {
    let users = self.users.read().unwrap(); // Acquire read lock
    Ok(
      users
        .iter()
        .find(|user| user.email.eq_ignore_ascii_case(email))
        .cloned(),
    )
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
    let users = self.users.read().unwrap();
    Ok(users.iter().find(|user| user.id == id).cloned())
  }

  async fn save(&self, user: User) -> Result<(), StoreError> {
    let mut users = self.users.write().unwrap(); // Acquire write lock
    // Emails are unique across the store; only an update of the same record
    // may reuse one.
    if users.iter().any(|existing| {
      existing.id != user.id && existing.email.eq_ignore_ascii_case(&user.email)
    }) {
      return Err(StoreError::DuplicateEmail(user.email));
    }
    match users.iter_mut().find(|existing| existing.id == user.id) {
      Some(existing) => *existing = user,
      None => users.push(user),
    }
    Ok(())
  }
}
