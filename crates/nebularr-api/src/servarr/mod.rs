// Servarr REST client (Radarr, Sonarr, Lidarr, Prowlarr).
//
// All four services share one API surface; they differ in the version
// prefix and in which endpoints exist. Managed resources are moved as raw
// JSON so unknown fields round-trip untouched.

pub mod client;
pub mod endpoints;
pub mod models;

pub use client::{ApiVersion, ServarrClient};
pub use endpoints::{ConfigEndpoint, Endpoint};
