/// Service layer for token-service
///
/// Provides the business logic around token records:
/// - Issuance (purpose-driven caps and lifetimes)
/// - Validation (ordered, short-circuiting state machine)
/// - Usage limiting (atomic check-and-increment)
/// - Revocation (single token and subject-wide)
/// - Security audit logging
pub mod audit_log;
pub mod issuer;
pub mod limiter;
pub mod revocation;
pub mod validator;

pub use audit_log::SecurityAuditLog;
pub use issuer::{IssuedToken, TokenIssuer};
pub use limiter::UsageLimiter;
pub use revocation::RevocationManager;
pub use validator::TokenValidator;
