use thiserror::Error;

/// Infrastructure failure in a backing store. Kept apart from [`AuthError`]
/// so callers can retry it without treating it as an authentication verdict.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
  #[error("store unavailable: {0}")]
  Unavailable(String),

  #[error("role name already taken: {0}")]
  DuplicateRoleName(String),

  #[error("email already taken: {0}")]
  DuplicateEmail(String),
}

/// Every way an authentication or authorization check can fail. All of these
/// are terminal for the current request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
  /// Unknown email or password mismatch. The two are deliberately
  /// indistinguishable to prevent account enumeration.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("account is deactivated")]
  AccountInactive,

  #[error("account is not verified")]
  AccountUnverified,

  /// Session missing, expired or revoked.
  #[error("session not found")]
  SessionNotFound,

  #[error("token is invalid")]
  TokenInvalid,

  #[error("token has expired")]
  TokenExpired,

  /// No identity was resolved at all.
  #[error("unauthenticated")]
  Unauthenticated,

  /// An identity was resolved but its roles do not satisfy the guard.
  #[error("forbidden")]
  Forbidden,

  /// Revocation requested on a backend configured without a revocation list.
  #[error("backend does not support revocation")]
  RevocationUnsupported,

  #[error(transparent)]
  Store(#[from] StoreError),
}
