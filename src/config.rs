use std::env;

/// Which proof-of-identity strategy the core issues and resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
  Session,
  Jwt,
  JwtCookie,
}

/// Configuration handed in by the embedding application at startup. The core
/// treats it as immutable for its lifetime.
#[derive(Clone, Debug)]
pub struct AuthConfig {
  pub backend: BackendKind,
  /// Shared signing secret for token backends.
  pub secret: String,
  pub session_ttl_secs: u64,
  pub token_ttl_secs: u64,
  /// When true, `authenticate` rejects users whose email is unverified.
  pub require_verified: bool,
  /// Cookie name used by the jwt_cookie variant.
  pub cookie_name: String,
  /// Enables the server-side revocation list on token backends.
  pub token_revocation: bool,
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self {
      backend: BackendKind::Session,
      secret: String::from("DEV_SIGNING_SECRET"),
      session_ttl_secs: 24 * 60 * 60,
      token_ttl_secs: 15 * 60,
      require_verified: false,
      cookie_name: String::from("keygate_token"),
      token_revocation: false,
    }
  }
}

impl AuthConfig {
  pub fn from_env() -> Self {
    let defaults = Self::default();
    let backend = match env::var("AUTH_BACKEND").as_deref() {
      Ok("jwt") => BackendKind::Jwt,
      Ok("jwt_cookie") => BackendKind::JwtCookie,
      _ => BackendKind::Session,
    };
    let secret = env::var("AUTH_SECRET").unwrap_or(defaults.secret);
    let session_ttl_secs = env::var("AUTH_SESSION_TTL_SECS")
      .ok()
      .and_then(|raw| raw.parse().ok())
      .unwrap_or(defaults.session_ttl_secs);
    let token_ttl_secs = env::var("AUTH_TOKEN_TTL_SECS")
      .ok()
      .and_then(|raw| raw.parse().ok())
      .unwrap_or(defaults.token_ttl_secs);
    let require_verified = env::var("AUTH_REQUIRE_VERIFIED")
      .map(|raw| raw == "true" || raw == "1")
      .unwrap_or(defaults.require_verified);
    let cookie_name =
      env::var("AUTH_COOKIE_NAME").unwrap_or(defaults.cookie_name);
    let token_revocation = env::var("AUTH_TOKEN_REVOCATION")
      .map(|raw| raw == "true" || raw == "1")
      .unwrap_or(defaults.token_revocation);
    Self {
      backend,
      secret,
      session_ttl_secs,
      token_ttl_secs,
      require_verified,
      cookie_name,
      token_revocation,
    }
  }
}
