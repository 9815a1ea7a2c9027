//! In-process credential management: token cache, refresh, persistence.

pub mod manager;

pub use manager::CredentialManager;
