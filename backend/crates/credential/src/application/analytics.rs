//! Credential analytics

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::id::OrganizationId;

use crate::domain::repository::CredentialRepository;
use crate::domain::service::analytics::CredentialAnalytics;
use crate::error::CredentialResult;

pub const MAX_ANALYTICS_MONTHS: u32 = 60;

pub struct AnalyticsUseCase<R>
where
    R: CredentialRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    default_months: u32,
}

impl<R> AnalyticsUseCase<R>
where
    R: CredentialRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, default_months: u32) -> Self {
        Self {
            repo,
            default_months,
        }
    }

    /// Admins see everything (optionally narrowed to one institution);
    /// institution members only ever see their own institution.
    pub async fn execute(
        &self,
        actor: &CurrentUser,
        institution_id: Option<OrganizationId>,
        months: Option<u32>,
    ) -> CredentialResult<CredentialAnalytics> {
        actor.require_role(&[UserRole::Institution])?;
        let scope = if actor.is_admin() {
            institution_id
        } else {
            Some(actor.require_organization()?)
        };
        let months = months
            .unwrap_or(self.default_months)
            .clamp(1, MAX_ANALYTICS_MONTHS);

        self.repo
            .analytics(scope, months, Utc::now().date_naive())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::*;
    use crate::domain::value_object::CredentialStatus;
    use crate::error::CredentialError;

    #[tokio::test]
    async fn test_analytics_scope() {
        let env = TestEnv::new().await;
        env.uploaded(&env.student()).await;
        env.requested(&env.student()).await;
        let use_case = AnalyticsUseCase::new(env.store.clone(), 12);

        let own = use_case.execute(&env.registrar(), None, None).await.unwrap();
        assert_eq!(own.total, 2);
        assert_eq!(own.by_status.get(&CredentialStatus::Pending), Some(&2));
        assert_eq!(own.verification.pending, 1);
        assert_eq!(own.monthly_issuance.len(), 12);

        // An institution cannot peek at another institution
        let other = use_case
            .execute(&env.other_registrar(), Some(env.university), Some(3))
            .await
            .unwrap();
        assert_eq!(other.total, 0);
        assert_eq!(other.monthly_issuance.len(), 3);

        let global = use_case.execute(&env.admin(), None, Some(500)).await.unwrap();
        assert_eq!(global.total, 2);
        assert_eq!(global.monthly_issuance.len(), MAX_ANALYTICS_MONTHS as usize);

        assert!(matches!(
            use_case.execute(&env.student(), None, None).await,
            Err(CredentialError::App(_))
        ));
    }
}
