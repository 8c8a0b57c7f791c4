use crate::backend::Identity;
use crate::error::AuthError;

/// A predicate over an identity's roles gating access to an operation.
///
/// Checks distinguish two failures: no identity at all (`Unauthenticated`)
/// and an identity whose roles do not satisfy the predicate (`Forbidden`).
#[derive(Clone, Debug)]
pub enum Guard {
  /// Passes if the identity holds at least one of the named roles.
  RolesAccepted(Vec<String>),
  /// Passes only if the identity holds all of the named roles.
  RolesRequired(Vec<String>),
  /// Conjunction: every inner guard must pass.
  All(Vec<Guard>),
}

pub fn roles_accepted<I, S>(names: I) -> Guard
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  Guard::RolesAccepted(names.into_iter().map(Into::into).collect())
}

pub fn roles_required<I, S>(names: I) -> Guard
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  Guard::RolesRequired(names.into_iter().map(Into::into).collect())
}

impl Guard {
  pub fn all(guards: impl IntoIterator<Item = Guard>) -> Self {
    Self::All(guards.into_iter().collect())
  }

  pub fn check(&self, identity: Option<&Identity>) -> Result<(), AuthError> {
    let identity = identity.ok_or(AuthError::Unauthenticated)?;
    self.evaluate(identity)
  }

  fn evaluate(&self, identity: &Identity) -> Result<(), AuthError> {
    let passes = match self {
      Self::RolesAccepted(names) => {
        names.iter().any(|name| identity.roles.contains(name))
      }
      Self::RolesRequired(names) => {
        names.iter().all(|name| identity.roles.contains(name))
      }
      Self::All(guards) => {
        return guards
          .iter()
          .try_for_each(|guard| guard.evaluate(identity));
      }
    };
    if passes {
      Ok(())
    } else {
      Err(AuthError::Forbidden)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;
  use uuid::Uuid;

  fn identity_with_roles(names: &[&str]) -> Identity {
    Identity {
      user_id: Uuid::new_v4(),
      email: String::from("user@example.com"),
      roles: names.iter().map(|name| name.to_string()).collect::<HashSet<_>>(),
    }
  }

  #[test]
  fn test_roles_accepted_needs_any_match() {
    let guard = roles_accepted(["administrator"]);

    let admin_writer = identity_with_roles(&["administrator", "writer"]);
    assert!(guard.check(Some(&admin_writer)).is_ok());

    let writer_only = identity_with_roles(&["writer"]);
    assert_eq!(
      guard.check(Some(&writer_only)).unwrap_err(),
      AuthError::Forbidden
    );
  }

  #[test]
  fn test_roles_required_needs_all_matches() {
    let guard = roles_required(["administrator", "writer"]);

    assert!(guard
      .check(Some(&identity_with_roles(&["administrator", "writer"])))
      .is_ok());
    assert_eq!(
      guard
        .check(Some(&identity_with_roles(&["administrator"])))
        .unwrap_err(),
      AuthError::Forbidden
    );
  }

  #[test]
  fn test_conjunction_requires_every_guard() {
    // The admin-management surface pairs both predicates on one route.
    let guard = Guard::all([
      roles_accepted(["administrator"]),
      roles_required(["administrator"]),
    ]);

    assert!(guard
      .check(Some(&identity_with_roles(&["administrator"])))
      .is_ok());
    assert_eq!(
      guard
        .check(Some(&identity_with_roles(&["writer"])))
        .unwrap_err(),
      AuthError::Forbidden
    );
  }

  #[test]
  fn test_missing_identity_is_unauthenticated() {
    let guard = roles_accepted(["administrator"]);
    assert_eq!(guard.check(None).unwrap_err(), AuthError::Unauthenticated);
  }

  #[test]
  fn test_empty_accepted_list_denies() {
    let guard = roles_accepted(Vec::<String>::new());
    assert_eq!(
      guard
        .check(Some(&identity_with_roles(&["administrator"])))
        .unwrap_err(),
      AuthError::Forbidden
    );
  }
}
