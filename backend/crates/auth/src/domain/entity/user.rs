//! User Entity
//!
//! Profile and authorization data. Password material lives in [`super::auth::Auth`].

use chrono::{DateTime, Utc};
use kernel::actor::{CurrentUser, UserRole};
use kernel::id::{OrganizationId, UserId};

use crate::domain::value_object::{
    display_name::DisplayName, email::Email, user_status::UserStatus,
};

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    /// Sign-in identifier, unique
    pub email: Email,
    pub display_name: DisplayName,
    pub user_role: UserRole,
    pub user_status: UserStatus,
    /// University (institutions) or company (employers) the user acts for
    pub organization_id: Option<OrganizationId>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: Email, display_name: DisplayName, user_role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            email,
            display_name,
            user_role,
            user_status: UserStatus::default(),
            organization_id: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn can_login(&self) -> bool {
        self.user_status.can_login()
    }

    /// Only institution and employer accounts act on behalf of an organization
    pub fn can_join_organization(&self) -> bool {
        matches!(
            self.user_role,
            UserRole::Institution | UserRole::Employer | UserRole::Admin
        )
    }

    pub fn set_organization(&mut self, organization_id: OrganizationId) {
        self.organization_id = Some(organization_id);
        self.updated_at = Utc::now();
    }

    pub fn as_actor(&self) -> CurrentUser {
        CurrentUser::new(self.user_id, self.user_role, self.organization_id)
    }
}
