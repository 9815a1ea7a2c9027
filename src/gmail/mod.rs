//! Gmail REST API client: authenticated list/get with auto-refresh on 401.

pub mod client;
pub mod transport;
pub mod types;

pub use client::MailClient;
pub use transport::{HttpTransport, MailTransport, TransportResponse};
