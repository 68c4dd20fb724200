//! Advisory device fingerprinting from request metadata.

use sha2::{Digest, Sha256};

/// Request metadata captured for fingerprinting.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub user_agent: String,
    pub network_address: String,
}

/// Derives a low-entropy, non-identifying fingerprint from request
/// context.
///
/// Both inputs are spoofable, so this is not a security boundary on
/// its own; it discourages casual link sharing underneath the real
/// authorization layers (purpose, expiry, usage cap). Fingerprints
/// compare by exact equality, no fuzzy matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFingerprinter;

impl DeviceFingerprinter {
    pub fn new() -> Self {
        Self
    }

    /// One-way hash of user agent and client network address.
    pub fn fingerprint(&self, user_agent: &str, network_address: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user_agent.as_bytes());
        // Field separator, so ("ab", "c") != ("a", "bc").
        hasher.update([0x1f]);
        hasher.update(network_address.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn fingerprint_context(&self, ctx: &DeviceContext) -> String {
        self.fingerprint(&ctx.user_agent, &ctx.network_address)
    }
}
