// baobab-api: Async HTTP client for the BAOBAB JSON/REST server

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod transport;

pub use client::BaobabClient;
pub use endpoints::join_ids;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
