pub mod role_registry;
pub mod user_store;
