//! Embeddable role-based authentication and authorization core.
//!
//! The embedding application wires up a [`store::user_store::UserStore`], a
//! [`store::role_registry::RoleRegistry`] and an [`AuthConfig`], then drives
//! three operations: `authenticate` credentials into an [`Identity`],
//! `issue`/`resolve` proof-of-identity artifacts through the configured
//! [`backend::Backend`], and gate operations with role [`Guard`]s.

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod hash_worker;
pub mod model;
pub mod store;

pub use backend::token::TokenDelivery;
pub use backend::{
  Artifact, AuthBackend, Authenticator, Backend, Credentials, Identity,
};
pub use config::{AuthConfig, BackendKind};
pub use error::{AuthError, StoreError};
pub use guard::{roles_accepted, roles_required, Guard};
pub use hash_worker::{HashWorker, Hasher};
pub use model::{role::Role, user::User};
pub use store::role_registry::{InMemoryRoleRegistry, RoleRegistry};
pub use store::user_store::{InMemoryUserStore, UserStore};
