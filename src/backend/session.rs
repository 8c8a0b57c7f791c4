use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use nanoid::nanoid;
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

use super::{resolve_identity, Artifact, AuthBackend, Identity};
use crate::error::AuthError;
use crate::store::role_registry::RoleRegistry;
use crate::store::user_store::UserStore;

/// Per-artifact lifecycle: issued, then active until it expires or is
/// revoked by logout.
#[derive(Clone, Debug)]
struct SessionRecord {
  user_id: Uuid,
  issued_at: i64,
  expires_at: i64,
  revoked: bool,
}

impl SessionRecord {
  fn is_live(&self, now: i64) -> bool {
    !self.revoked && now < self.expires_at
  }
}

/// Server-side session backend. The client only ever holds an opaque id; the
/// record, including expiry and revocation state, stays in this store. All
/// operations on one id go through the single map lock, so a concurrently
/// revoked session can never resolve.
pub struct SessionBackend<US, RR> {
  users: Arc<US>,
  roles: Arc<RR>,
  ttl_secs: u64,
  sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl<US, RR> SessionBackend<US, RR>
where
  US: UserStore,
  RR: RoleRegistry,
{
  pub fn new(users: Arc<US>, roles: Arc<RR>, ttl_secs: u64) -> Self {
    Self {
      users,
      roles,
      ttl_secs,
      sessions: RwLock::new(HashMap::new()),
    }
  }

  /// Constant-time lookup of a live session, reaping dead records on the way.
  /// Returns the owning user id.
  fn lookup_live(&self, session_id: &str) -> Option<Uuid> {
    let now = Utc::now().timestamp();
    let mut sessions = self.sessions.write().unwrap();
    sessions.retain(|_, record| record.is_live(now));
    // Avoid hash-lookup timing leaking id prefixes to an online attacker.
    sessions
      .iter()
      .find(|(id, _)| id.as_bytes().ct_eq(session_id.as_bytes()).into())
      .map(|(_, record)| record.user_id)
  }
}

#[async_trait]
impl<US, RR> AuthBackend for SessionBackend<US, RR>
where
  US: UserStore,
  RR: RoleRegistry,
{
  async fn issue(&self, identity: &Identity) -> Result<Artifact, AuthError> {
    let now = Utc::now().timestamp();
    let record = SessionRecord {
      user_id: identity.user_id,
      issued_at: now,
      expires_at: now + self.ttl_secs as i64,
      revoked: false,
    };
    let id = nanoid!();
    let mut sessions = self.sessions.write().unwrap();
    sessions.insert(id.clone(), record);
    Ok(Artifact::Session { id })
  }

  async fn resolve(
    &self,
    artifact: &Artifact,
  ) -> Result<Identity, AuthError> {
    let Artifact::Session { id } = artifact else {
      return Err(AuthError::SessionNotFound);
    };
    // Missing, expired and revoked are indistinguishable to the caller.
    let user_id =
      self.lookup_live(id).ok_or(AuthError::SessionNotFound)?;
    resolve_identity(&*self.users, &*self.roles, user_id).await
  }

  async fn revoke(&self, artifact: &Artifact) -> Result<(), AuthError> {
    let Artifact::Session { id } = artifact else {
      return Err(AuthError::SessionNotFound);
    };
    let mut sessions = self.sessions.write().unwrap();
    match sessions.get_mut(id) {
      Some(record) => {
        record.revoked = true;
        debug!(issued_at = record.issued_at, "session revoked");
        Ok(())
      }
      None => Err(AuthError::SessionNotFound),
    }
  }
}
