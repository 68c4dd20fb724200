/// Security primitives for the token subsystem
///
/// Provides the pure, freely parallelizable pieces of validation:
/// - Signed token encoding/decoding (HS256, compact three-segment format)
/// - Token hashing for storage lookup (SHA-256)
/// - Advisory device fingerprinting
pub mod codec;
pub mod fingerprint;

pub use codec::{hash_token, TokenClaims, TokenCodec};
pub use fingerprint::{DeviceContext, DeviceFingerprinter};
