//! Job application entity

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, CredentialId, JobId, UserId};

use crate::domain::entity::organization::non_blank;
use crate::domain::value_object::ApplicationStatus;
use crate::error::{MarketplaceError, MarketplaceResult};

const COVER_LETTER_MAX_LENGTH: usize = 5000;
const MAX_ATTACHED_CREDENTIALS: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct NewApplication {
    pub cover_letter: Option<String>,
    /// Credentials the applicant wants the employer to check
    pub credential_ids: Vec<CredentialId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub cover_letter: Option<String>,
    pub credential_ids: Vec<CredentialId>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn submit(
        job_id: JobId,
        applicant_id: UserId,
        input: NewApplication,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Self> {
        let cover_letter = non_blank(input.cover_letter);
        if cover_letter
            .as_ref()
            .is_some_and(|c| c.chars().count() > COVER_LETTER_MAX_LENGTH)
        {
            return Err(MarketplaceError::Validation(format!(
                "coverLetter must be at most {COVER_LETTER_MAX_LENGTH} characters"
            )));
        }

        let mut credential_ids = input.credential_ids;
        credential_ids.sort();
        credential_ids.dedup();
        if credential_ids.len() > MAX_ATTACHED_CREDENTIALS {
            return Err(MarketplaceError::Validation(format!(
                "at most {MAX_ATTACHED_CREDENTIALS} credentials can be attached"
            )));
        }

        Ok(Self {
            application_id: ApplicationId::new(),
            job_id,
            applicant_id,
            cover_letter,
            credential_ids,
            status: ApplicationStatus::Submitted,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the previous status. Moving to the current status is a no-op
    /// and reports `None`.
    pub fn transition(
        &mut self,
        next: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Option<ApplicationStatus>> {
        if self.status == next {
            return Ok(None);
        }
        if !self.status.can_transition_to(next) {
            return Err(MarketplaceError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let previous = self.status;
        self.status = next;
        self.updated_at = now;
        Ok(Some(previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_dedups_credentials() {
        let credential = CredentialId::new();
        let application = Application::submit(
            JobId::new(),
            UserId::new(),
            NewApplication {
                cover_letter: Some("  ".to_string()),
                credential_ids: vec![credential, credential],
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(application.status, ApplicationStatus::Submitted);
        assert_eq!(application.credential_ids, vec![credential]);
        assert_eq!(application.cover_letter, None);
    }

    #[test]
    fn test_too_many_credentials() {
        let input = NewApplication {
            cover_letter: None,
            credential_ids: (0..21).map(|_| CredentialId::new()).collect(),
        };
        assert!(matches!(
            Application::submit(JobId::new(), UserId::new(), input, Utc::now()),
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[test]
    fn test_transition() {
        let mut application =
            Application::submit(JobId::new(), UserId::new(), NewApplication::default(), Utc::now())
                .unwrap();

        assert_eq!(
            application
                .transition(ApplicationStatus::Reviewing, Utc::now())
                .unwrap(),
            Some(ApplicationStatus::Submitted)
        );
        assert_eq!(
            application
                .transition(ApplicationStatus::Reviewing, Utc::now())
                .unwrap(),
            None
        );
        assert!(matches!(
            application.transition(ApplicationStatus::Hired, Utc::now()),
            Err(MarketplaceError::InvalidTransition { .. })
        ));
    }
}
