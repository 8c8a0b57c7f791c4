pub mod session;
pub mod token;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::config::{AuthConfig, BackendKind};
use crate::error::{AuthError, StoreError};
use crate::hash_worker::Hasher;
use crate::store::role_registry::RoleRegistry;
use crate::store::user_store::UserStore;
use session::SessionBackend;
use token::{TokenBackend, TokenDelivery};

/// Login payload handed in by the embedding application.
#[derive(Clone, Debug, Deserialize, validator_derive::Validate)]
pub struct Credentials {
  #[validate(email)]
  pub email: String,
  #[validate(length(min = 1, message = "Secret must not be empty"))]
  pub secret: String,
}

/// The resolved, authenticated representation of a user for the lifetime of
/// one request. Role names are snapshotted from the registry at resolve time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
  pub user_id: Uuid,
  pub email: String,
  pub roles: HashSet<String>,
}

/// Proof of authentication: an opaque server-side session reference, or a
/// self-describing signed token with its delivery channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Artifact {
  Session { id: String },
  Token { token: String, delivery: TokenDelivery },
}

/// One proof-of-identity strategy. `issue` and `resolve` are the round-trip;
/// `revoke` ends an artifact's life early where the variant supports it.
#[async_trait]
pub trait AuthBackend: Send + Sync {
  async fn issue(&self, identity: &Identity) -> Result<Artifact, AuthError>;
  async fn resolve(&self, artifact: &Artifact) -> Result<Identity, AuthError>;
  async fn revoke(&self, artifact: &Artifact) -> Result<(), AuthError>;
}

/// Credential verification shared by every backend variant.
pub struct Authenticator<US, RR, H> {
  users: Arc<US>,
  roles: Arc<RR>,
  hasher: Arc<H>,
  require_verified: bool,
  // Unknown emails are verified against this hash so the miss path costs the
  // same as a password mismatch.
  decoy_hash: String,
}

impl<US, RR, H> std::fmt::Debug for Authenticator<US, RR, H> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Authenticator")
      .field("require_verified", &self.require_verified)
      .finish_non_exhaustive()
  }
}

impl<US, RR, H> Authenticator<US, RR, H>
where
  US: UserStore,
  RR: RoleRegistry,
  H: Hasher,
{
  pub async fn new(
    users: Arc<US>,
    roles: Arc<RR>,
    hasher: Arc<H>,
    require_verified: bool,
  ) -> Result<Self, AuthError> {
    let decoy_hash = hasher
      .hash_password(&nanoid::nanoid!())
      .await
      .map_err(hashing_unavailable)?;
    Ok(Self {
      users,
      roles,
      hasher,
      require_verified,
      decoy_hash,
    })
  }

  pub async fn authenticate(
    &self,
    credentials: &Credentials,
  ) -> Result<Identity, AuthError> {
    if credentials.validate().is_err() {
      // Malformed input costs the same bcrypt verify as a mismatch, so it is
      // not timing-distinguishable from a well-formed attempt.
      let _ = self
        .hasher
        .verify_password(&credentials.secret, &self.decoy_hash)
        .await;
      debug!("authentication failed: malformed credentials");
      return Err(AuthError::InvalidCredentials);
    }

    let user = self.users.find_by_email(&credentials.email).await?;
    let Some(user) = user else {
      // Burn the same bcrypt cost as the match path. Lookup failure and
      // password mismatch must be indistinguishable to the caller.
      let _ = self
        .hasher
        .verify_password(&credentials.secret, &self.decoy_hash)
        .await;
      debug!("authentication failed: unknown email");
      return Err(AuthError::InvalidCredentials);
    };

    let matches = self
      .hasher
      .verify_password(&credentials.secret, &user.password_hash)
      .await
      .map_err(hashing_unavailable)?;
    if !matches {
      debug!(user_id = %user.id, "authentication failed: password mismatch");
      return Err(AuthError::InvalidCredentials);
    }
    if !user.is_active {
      debug!(user_id = %user.id, "authentication failed: account inactive");
      return Err(AuthError::AccountInactive);
    }
    if self.require_verified && !user.is_verified {
      debug!(user_id = %user.id, "authentication failed: account unverified");
      return Err(AuthError::AccountUnverified);
    }

    resolve_identity(&*self.users, &*self.roles, user.id).await
  }
}

/// Re-fetches the user and snapshots its role names. Rejects deactivated
/// accounts so deactivation takes effect on the very next resolve.
pub(crate) async fn resolve_identity<US: UserStore + ?Sized, RR: RoleRegistry + ?Sized>(
  users: &US,
  roles: &RR,
  user_id: Uuid,
) -> Result<Identity, AuthError> {
  let user = users
    .find_by_id(user_id)
    .await?
    .ok_or(AuthError::InvalidCredentials)?;
  if !user.is_active {
    return Err(AuthError::AccountInactive);
  }
  let role_names = roles
    .roles_of(user.id)
    .await?
    .into_iter()
    .map(|role| role.name)
    .collect();
  Ok(Identity {
    user_id: user.id,
    email: user.email,
    roles: role_names,
  })
}

pub(crate) fn hashing_unavailable(
  error: crate::hash_worker::HashWorkerError,
) -> AuthError {
  AuthError::Store(StoreError::Unavailable(error.to_string()))
}

/// The configured backend variant, tagged. Session state lives server-side;
/// both token variants share the signed-token implementation and differ only
/// in delivery.
pub enum Backend<US, RR> {
  Session(SessionBackend<US, RR>),
  Token(TokenBackend<US, RR>),
}

impl<US, RR> Backend<US, RR>
where
  US: UserStore,
  RR: RoleRegistry,
{
  pub fn from_config(
    config: &AuthConfig,
    users: Arc<US>,
    roles: Arc<RR>,
  ) -> Self {
    match config.backend {
      BackendKind::Session => Self::Session(SessionBackend::new(
        users,
        roles,
        config.session_ttl_secs,
      )),
      BackendKind::Jwt => Self::Token(TokenBackend::new(
        users,
        roles,
        config,
        TokenDelivery::Bearer,
      )),
      BackendKind::JwtCookie => Self::Token(TokenBackend::new(
        users,
        roles,
        config,
        TokenDelivery::Cookie {
          name: config.cookie_name.clone(),
        },
      )),
    }
  }
}

#[async_trait]
impl<US, RR> AuthBackend for Backend<US, RR>
where
  US: UserStore,
  RR: RoleRegistry,
{
  async fn issue(&self, identity: &Identity) -> Result<Artifact, AuthError> {
    match self {
      Self::Session(backend) => backend.issue(identity).await,
      Self::Token(backend) => backend.issue(identity).await,
    }
  }

  async fn resolve(
    &self,
    artifact: &Artifact,
  ) -> Result<Identity, AuthError> {
    match self {
      Self::Session(backend) => backend.resolve(artifact).await,
      Self::Token(backend) => backend.resolve(artifact).await,
    }
  }

  async fn revoke(&self, artifact: &Artifact) -> Result<(), AuthError> {
    match self {
      Self::Session(backend) => backend.revoke(artifact).await,
      Self::Token(backend) => backend.revoke(artifact).await,
    }
  }
}
