use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{
  decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{resolve_identity, Artifact, AuthBackend, Identity};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::store::role_registry::RoleRegistry;
use crate::store::user_store::UserStore;

/// How the signed token reaches the client: bearer header or a named cookie.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenDelivery {
  Bearer,
  Cookie { name: String },
}

#[derive(Serialize, Deserialize)]
struct Claims {
  sub: String,
  iat: u64,
  exp: u64,
  jti: String,
}

/// Self-contained HS256 tokens. Resolving verifies signature and expiry
/// without a session-store round trip; the user record is still re-fetched
/// so deactivation and role changes are picked up. Tokens expire solely by
/// time unless the revocation list is enabled in config.
pub struct TokenBackend<US, RR> {
  users: Arc<US>,
  roles: Arc<RR>,
  encoding_key: EncodingKey,
  decoding_key: DecodingKey,
  ttl_secs: u64,
  delivery: TokenDelivery,
  revoked: Option<RwLock<HashSet<String>>>,
}

impl<US, RR> TokenBackend<US, RR>
where
  US: UserStore,
  RR: RoleRegistry,
{
  pub fn new(
    users: Arc<US>,
    roles: Arc<RR>,
    config: &AuthConfig,
    delivery: TokenDelivery,
  ) -> Self {
    Self {
      users,
      roles,
      encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
      decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
      ttl_secs: config.token_ttl_secs,
      delivery,
      revoked: config
        .token_revocation
        .then(|| RwLock::new(HashSet::new())),
    }
  }

  fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is exact, no leeway.
    validation.leeway = 0;
    let data = decode::<Claims>(token, &self.decoding_key, &validation)
      .map_err(|error| match error.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
          AuthError::TokenExpired
        }
        _ => AuthError::TokenInvalid,
      })?;
    Ok(data.claims)
  }
}

#[async_trait]
impl<US, RR> AuthBackend for TokenBackend<US, RR>
where
  US: UserStore,
  RR: RoleRegistry,
{
  async fn issue(&self, identity: &Identity) -> Result<Artifact, AuthError> {
    let now = Utc::now().timestamp() as u64;
    let claims = Claims {
      sub: identity.user_id.to_string(),
      iat: now,
      exp: now + self.ttl_secs,
      jti: nanoid!(),
    };
    let token = encode(
      &Header::new(Algorithm::HS256),
      &claims,
      &self.encoding_key,
    )
    .map_err(|_| AuthError::TokenInvalid)?;
    Ok(Artifact::Token {
      token,
      delivery: self.delivery.clone(),
    })
  }

  async fn resolve(
    &self,
    artifact: &Artifact,
  ) -> Result<Identity, AuthError> {
    let Artifact::Token { token, .. } = artifact else {
      return Err(AuthError::TokenInvalid);
    };
    let claims = self.decode_claims(token)?;
    if let Some(revoked) = &self.revoked {
      if revoked.read().unwrap().contains(&claims.jti) {
        debug!("token rejected: revoked jti");
        return Err(AuthError::TokenInvalid);
      }
    }
    let user_id =
      Uuid::parse_str(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;
    resolve_identity(&*self.users, &*self.roles, user_id).await
  }

  async fn revoke(&self, artifact: &Artifact) -> Result<(), AuthError> {
    let Artifact::Token { token, .. } = artifact else {
      return Err(AuthError::TokenInvalid);
    };
    let Some(revoked) = &self.revoked else {
      return Err(AuthError::RevocationUnsupported);
    };
    let claims = self.decode_claims(token)?;
    revoked.write().unwrap().insert(claims.jti);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::user::User;
  use crate::store::role_registry::InMemoryRoleRegistry;
  use crate::store::user_store::InMemoryUserStore;

  fn config(secret: &str, revocation: bool) -> AuthConfig {
    AuthConfig {
      secret: secret.to_string(),
      token_ttl_secs: 60,
      token_revocation: revocation,
      ..AuthConfig::default()
    }
  }

  async fn backend_with_user(
    config: &AuthConfig,
    delivery: TokenDelivery,
  ) -> (TokenBackend<InMemoryUserStore, InMemoryRoleRegistry>, Identity) {
    let users = Arc::new(InMemoryUserStore::new());
    let roles = Arc::new(InMemoryRoleRegistry::new());
    let user = User::new("admin@example.com", String::from("$2b$04$decoy"));
    users.save(user.clone()).await.unwrap();
    let identity = Identity {
      user_id: user.id,
      email: user.email,
      roles: Default::default(),
    };
    (TokenBackend::new(users, roles, config, delivery), identity)
  }

  #[tokio::test]
  async fn test_issue_then_resolve_round_trip() {
    let config = config("test-secret", false);
    let (backend, identity) =
      backend_with_user(&config, TokenDelivery::Bearer).await;

    let artifact = backend.issue(&identity).await.unwrap();
    let resolved = backend.resolve(&artifact).await.unwrap();
    assert_eq!(resolved.user_id, identity.user_id);
  }

  #[tokio::test]
  async fn test_cookie_delivery_is_preserved() {
    let config = config("test-secret", false);
    let delivery = TokenDelivery::Cookie {
      name: String::from("keygate_token"),
    };
    let (backend, identity) =
      backend_with_user(&config, delivery.clone()).await;

    let artifact = backend.issue(&identity).await.unwrap();
    let Artifact::Token { delivery: issued, .. } = &artifact else {
      panic!("expected a token artifact");
    };
    assert_eq!(issued, &delivery);
  }

  #[tokio::test]
  async fn test_expired_token_rejected() {
    let config = config("test-secret", false);
    let (backend, identity) =
      backend_with_user(&config, TokenDelivery::Bearer).await;

    let past = Utc::now().timestamp() as u64 - 600;
    let claims = Claims {
      sub: identity.user_id.to_string(),
      iat: past,
      exp: past + 60,
      jti: nanoid!(),
    };
    let token = encode(
      &Header::new(Algorithm::HS256),
      &claims,
      &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();

    let error = backend
      .resolve(&Artifact::Token {
        token,
        delivery: TokenDelivery::Bearer,
      })
      .await
      .unwrap_err();
    assert_eq!(error, AuthError::TokenExpired);
  }

  #[tokio::test]
  async fn test_tampered_token_rejected() {
    let issuing_config = config("one-secret", false);
    let (backend, identity) =
      backend_with_user(&issuing_config, TokenDelivery::Bearer).await;

    let claims = Claims {
      sub: identity.user_id.to_string(),
      iat: Utc::now().timestamp() as u64,
      exp: Utc::now().timestamp() as u64 + 60,
      jti: nanoid!(),
    };
    let forged = encode(
      &Header::new(Algorithm::HS256),
      &claims,
      &EncodingKey::from_secret(b"another-secret"),
    )
    .unwrap();

    let error = backend
      .resolve(&Artifact::Token {
        token: forged,
        delivery: TokenDelivery::Bearer,
      })
      .await
      .unwrap_err();
    assert_eq!(error, AuthError::TokenInvalid);
  }

  #[tokio::test]
  async fn test_revocation_list_when_enabled() {
    let config = config("test-secret", true);
    let (backend, identity) =
      backend_with_user(&config, TokenDelivery::Bearer).await;

    let artifact = backend.issue(&identity).await.unwrap();
    backend.revoke(&artifact).await.unwrap();

    let error = backend.resolve(&artifact).await.unwrap_err();
    assert_eq!(error, AuthError::TokenInvalid);
  }

  #[tokio::test]
  async fn test_revocation_unsupported_by_default() {
    let config = config("test-secret", false);
    let (backend, identity) =
      backend_with_user(&config, TokenDelivery::Bearer).await;

    let artifact = backend.issue(&identity).await.unwrap();
    let error = backend.revoke(&artifact).await.unwrap_err();
    assert_eq!(error, AuthError::RevocationUnsupported);
  }

  #[tokio::test]
  async fn test_session_artifact_rejected() {
    let config = config("test-secret", false);
    let (backend, _) =
      backend_with_user(&config, TokenDelivery::Bearer).await;

    let error = backend
      .resolve(&Artifact::Session { id: nanoid!() })
      .await
      .unwrap_err();
    assert_eq!(error, AuthError::TokenInvalid);
  }
}
