//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no business meaning:
//! - Cryptographic utilities (SHA-256, signed tokens, Base64)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Cookie management and client identification
//! - Rate limiting infrastructure
//! - Environment configuration helpers

pub mod client;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
