// nebularr-api: Async Rust client for the Servarr REST API family.

pub mod error;
pub mod servarr;
pub mod transport;

pub use error::Error;
pub use servarr::{ApiVersion, ServarrClient};
pub use transport::{TlsMode, TransportConfig};
