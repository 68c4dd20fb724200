/// Token Service Library
///
/// Grants short-lived, purpose-scoped, usage-limited access to email
/// recipients so that links embedded in outgoing digests can be opened
/// without an account or password, while bounding the blast radius of a
/// leaked link through expiry, usage caps, purpose binding, and soft
/// device binding.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Token record store and audit sink (Postgres + in-memory)
/// - `error`: Error types
/// - `http`: HTTP API for collaborator services
/// - `models`: Data models
/// - `security`: Signed token codec and device fingerprinting
/// - `services`: Issuance, validation, usage limiting, revocation, audit
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod security;
pub mod services;

// Re-export commonly used types
pub use error::{Result, TokenError};
