//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the infra layer.

use kernel::actor::UserRole;
use kernel::id::{OrganizationId, UserId};
use uuid::Uuid;

use crate::domain::entity::{auth::Auth, auth_session::AuthSession, user::User};
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert the user and its credentials in one transaction
    async fn register(&self, user: &User, auth: &Auth) -> AuthResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    async fn update(&self, user: &User) -> AuthResult<()>;
}

#[trait_variant::make(AuthRepository: Send)]
pub trait LocalAuthRepository {
    async fn find_by_user_id(&self, user_id: &UserId) -> AuthResult<Option<Auth>>;

    async fn update(&self, auth: &Auth) -> AuthResult<()>;
}

#[trait_variant::make(AuthSessionRepository: Send)]
pub trait LocalAuthSessionRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()>;

    /// Find an unexpired session. A fingerprint that does not match the one
    /// recorded at sign-in is an error, not a miss.
    async fn find_by_id(
        &self,
        session_id: Uuid,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Option<AuthSession>>;

    /// Persist expiry and last activity
    async fn update(&self, session: &AuthSession) -> AuthResult<()>;

    async fn delete(&self, session_id: Uuid) -> AuthResult<()>;

    /// Delete all sessions for a user, optionally keeping one
    async fn delete_all_for_user(&self, user_id: &UserId, except: Option<Uuid>) -> AuthResult<u64>;

    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// What kind of organization an id refers to, as far as membership is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationAffiliation {
    University,
    Company,
}

impl OrganizationAffiliation {
    pub fn code(&self) -> &'static str {
        match self {
            OrganizationAffiliation::University => "university",
            OrganizationAffiliation::Company => "company",
        }
    }

    /// Institutions join universities, employers join companies, admins join anything
    pub fn admits(&self, role: UserRole) -> bool {
        matches!(
            (self, role),
            (_, UserRole::Admin)
                | (OrganizationAffiliation::University, UserRole::Institution)
                | (OrganizationAffiliation::Company, UserRole::Employer)
        )
    }
}

/// Organization lookup owned by another module (the marketplace)
#[trait_variant::make(OrganizationDirectory: Send)]
pub trait LocalOrganizationDirectory {
    async fn affiliation(
        &self,
        organization_id: OrganizationId,
    ) -> AuthResult<Option<OrganizationAffiliation>>;
}
