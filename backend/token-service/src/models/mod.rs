/// Data models for the token subsystem
pub mod audit;
pub mod token;

pub use audit::{RejectReason, SecurityEvent, SecurityEventType, Severity};
pub use token::{TokenPurpose, TokenRecord};
