//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases and configuration
//! - `infra/` - PostgreSQL and in-memory implementations
//! - `presentation/` - HTTP handlers, DTOs, router, session middleware
//!
//! ## Features
//! - Sign up with email + password + role (student, institution, employer)
//! - Server-side sessions with signed cookie tokens
//! - Binding institution / employer accounts to their organization
//! - Session resolution into `kernel::actor::CurrentUser` for other crates
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B style policy)
//! - Sessions bound to client fingerprint (User-Agent)
//! - Lockout for 15 minutes after 5 consecutive failed sign-ins
//! - `admin` is never self-assignable

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

pub use application::config::AuthConfig;
pub use domain::repository::{OrganizationAffiliation, OrganizationDirectory};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryAuthRepository, PgAuthRepository, StaticOrganizationDirectory};
pub use presentation::middleware::{AuthMiddlewareState, resolve_current_user};
pub use presentation::router::auth_router_generic;

pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
