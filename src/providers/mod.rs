//! OAuth token endpoint abstraction.
//!
//! The trait seam exists so the credential manager and tests can swap the
//! real Google endpoint for a stub.

pub mod google;
pub mod traits;

pub use google::GoogleTokenEndpoint;
pub use traits::{TokenEndpoint, TokenGrant};
