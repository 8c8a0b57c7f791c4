use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::role::Role;

/// Authoritative source for roles and the user↔role association. Grants and
/// revocations are visible to the next `roles_of` call immediately.
#[async_trait]
pub trait RoleRegistry: Send + Sync {
  async fn get_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError>;
  /// Rejects a duplicate role name with `StoreError::DuplicateRoleName`.
  async fn create(&self, role: Role) -> Result<(), StoreError>;
  async fn roles_of(&self, user_id: Uuid) -> Result<HashSet<Role>, StoreError>;
  /// Idempotent: granting an already-held role is a no-op.
  async fn grant(&self, user_id: Uuid, role_id: Uuid)
    -> Result<(), StoreError>;
  /// Idempotent: revoking an unheld role is a no-op.
  async fn revoke(
    &self,
    user_id: Uuid,
    role_id: Uuid,
  ) -> Result<(), StoreError>;
}

struct RegistryState {
  roles: HashMap<Uuid, Role>,
  // Set semantics: at most one entry per (user, role) pair.
  assignments: HashSet<(Uuid, Uuid)>,
}

pub struct InMemoryRoleRegistry {
  state: RwLock<RegistryState>,
}

impl InMemoryRoleRegistry {
  pub fn new() -> Self {
    Self {
      state: RwLock::new(RegistryState {
        roles: HashMap::new(),
        assignments: HashSet::new(),
      }),
    }
  }
}

impl Default for InMemoryRoleRegistry {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl RoleRegistry for InMemoryRoleRegistry {
  async fn get_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
    let state = self.state.read().unwrap();
    Ok(state.roles.get(&id).cloned())
  }

  async fn create(&self, role: Role) -> Result<(), StoreError> {
    let mut state = self.state.write().unwrap();
    if state.roles.values().any(|existing| existing.name == role.name) {
      return Err(StoreError::DuplicateRoleName(role.name));
    }
    state.roles.insert(role.id, role);
    Ok(())
  }

  async fn roles_of(
    &self,
    user_id: Uuid,
  ) -> Result<HashSet<Role>, StoreError> {
    let state = self.state.read().unwrap();
    Ok(
      state
        .assignments
        .iter()
        .filter(|(user, _)| *user == user_id)
        .filter_map(|(_, role_id)| state.roles.get(role_id).cloned())
        .collect(),
    )
  }

  async fn grant(
    &self,
    user_id: Uuid,
    role_id: Uuid,
  ) -> Result<(), StoreError> {
    let mut state = self.state.write().unwrap();
    state.assignments.insert((user_id, role_id));
    Ok(())
  }

  async fn revoke(
    &self,
    user_id: Uuid,
    role_id: Uuid,
  ) -> Result<(), StoreError> {
    let mut state = self.state.write().unwrap();
    state.assignments.remove(&(user_id, role_id));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_grant_is_idempotent() {
    let registry = InMemoryRoleRegistry::new();
    let role = Role::new("writer", "He who writes");
    let user_id = Uuid::new_v4();
    registry.create(role.clone()).await.unwrap();

    registry.grant(user_id, role.id).await.unwrap();
    registry.grant(user_id, role.id).await.unwrap();

    let roles = registry.roles_of(user_id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert!(roles.contains(&role));
  }

  #[tokio::test]
  async fn test_revoke_unheld_role_is_noop() {
    let registry = InMemoryRoleRegistry::new();
    let role = Role::new("administrator", "X");
    let user_id = Uuid::new_v4();
    registry.create(role.clone()).await.unwrap();

    registry.revoke(user_id, role.id).await.unwrap();
    assert!(registry.roles_of(user_id).await.unwrap().is_empty());

    registry.grant(user_id, role.id).await.unwrap();
    registry.revoke(user_id, role.id).await.unwrap();
    registry.revoke(user_id, role.id).await.unwrap();
    assert!(registry.roles_of(user_id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_duplicate_role_name_rejected() {
    let registry = InMemoryRoleRegistry::new();
    registry.create(Role::new("administrator", "X")).await.unwrap();

    let error = registry
      .create(Role::new("administrator", "again"))
      .await
      .unwrap_err();
    assert_eq!(
      error,
      StoreError::DuplicateRoleName(String::from("administrator"))
    );
  }

  #[tokio::test]
  async fn test_revocation_visible_immediately() {
    let registry = InMemoryRoleRegistry::new();
    let role = Role::new("writer", "He who writes");
    let user_id = Uuid::new_v4();
    registry.create(role.clone()).await.unwrap();
    registry.grant(user_id, role.id).await.unwrap();
    assert!(!registry.roles_of(user_id).await.unwrap().is_empty());

    registry.revoke(user_id, role.id).await.unwrap();
    assert!(registry.roles_of(user_id).await.unwrap().is_empty());
  }
}
