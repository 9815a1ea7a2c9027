//! Token store — PostgreSQL backend for the persisted OAuth credential record.
//!
//! Persistence is best-effort: when no database is configured or the pool
//! cannot be built, the store degrades to a no-op (reads see no record,
//! writes are skipped) and tokens live only in process memory.

pub mod db;

pub use db::{CredentialRecord, TokenStore};
