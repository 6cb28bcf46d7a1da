//! Actor - The authenticated caller of a request
//!
//! The auth middleware resolves the session cookie into a [`CurrentUser`] and
//! stores it in the request extensions. Every other crate only needs this
//! type to make authorization decisions, so it lives in the kernel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::app_error::{AppError, AppResult};
use crate::id::{OrganizationId, UserId};

/// ユーザーロール
///
/// `Admin` はサインアップで自己申告できません (auth 側で拒否)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    Student = 0,
    Institution = 1,
    Employer = 2,
    Admin = 3,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            Student => "student",
            Institution => "institution",
            Employer => "employer",
            Admin => "admin",
        }
    }

    #[inline]
    pub const fn from_id(id: i16) -> Option<Self> {
        use UserRole::*;
        match id {
            0 => Some(Student),
            1 => Some(Institution),
            2 => Some(Employer),
            3 => Some(Admin),
            _ => None,
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        use UserRole::*;
        match code {
            "student" => Some(Student),
            "institution" => Some(Institution),
            "employer" => Some(Employer),
            "admin" => Some(Admin),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Roles a user may pick for themselves at sign-up
    #[inline]
    pub const fn is_self_assignable(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 認証済みのリクエスト主体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub role: UserRole,
    pub organization_id: Option<OrganizationId>,
}

impl CurrentUser {
    pub fn new(user_id: UserId, role: UserRole, organization_id: Option<OrganizationId>) -> Self {
        Self {
            user_id,
            role,
            organization_id,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Succeeds when the actor has one of `allowed`. Admins always pass.
    pub fn require_role(&self, allowed: &[UserRole]) -> AppResult<()> {
        if self.is_admin() || allowed.contains(&self.role) {
            return Ok(());
        }
        Err(AppError::forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            self.role
        )))
    }

    /// The organization the actor belongs to, or 403.
    pub fn require_organization(&self) -> AppResult<OrganizationId> {
        self.organization_id.ok_or_else(|| {
            AppError::forbidden("You must belong to an organization")
                .with_action("Bind your account to an organization first")
        })
    }

    /// `true` when the actor is a member of `organization_id`.
    #[inline]
    pub fn belongs_to(&self, organization_id: OrganizationId) -> bool {
        self.organization_id == Some(organization_id)
    }
}

#[cfg(feature = "axum")]
mod extract {
    use std::convert::Infallible;

    use axum::extract::{FromRequestParts, OptionalFromRequestParts};
    use http::request::Parts;

    use super::CurrentUser;
    use crate::error::app_error::AppError;

    impl<S> FromRequestParts<S> for CurrentUser
    where
        S: Send + Sync,
    {
        type Rejection = AppError;

        async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
            parts
                .extensions
                .get::<CurrentUser>()
                .copied()
                .ok_or_else(|| AppError::unauthorized("Authentication required"))
        }
    }

    impl<S> OptionalFromRequestParts<S> for CurrentUser
    where
        S: Send + Sync,
    {
        type Rejection = Infallible;

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Option<Self>, Self::Rejection> {
            Ok(parts.extensions.get::<CurrentUser>().copied())
        }
    }
}
