//! Job posting entity

use chrono::{DateTime, Utc};
use credential::CredentialType;
use kernel::id::{JobId, OrganizationId, UserId};

use crate::domain::entity::organization::non_blank;
use crate::domain::value_object::{EmploymentType, JobStatus};
use crate::error::{MarketplaceError, MarketplaceResult};

const TITLE_MAX_LENGTH: usize = 200;
const DESCRIPTION_MAX_LENGTH: usize = 10_000;
const LOCATION_MAX_LENGTH: usize = 200;

#[derive(Debug, Clone)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub required_credentials: Vec<CredentialType>,
}

/// Fields left `None` keep their current value
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub required_credentials: Option<Vec<CredentialType>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: JobId,
    pub organization_id: OrganizationId,
    pub posted_by: UserId,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub required_credentials: Vec<CredentialType>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn post(
        organization_id: OrganizationId,
        posted_by: UserId,
        draft: JobDraft,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Self> {
        let mut job = Self {
            job_id: JobId::new(),
            organization_id,
            posted_by,
            title: String::new(),
            description: String::new(),
            location: None,
            employment_type: draft.employment_type,
            salary_min: None,
            salary_max: None,
            required_credentials: Vec::new(),
            status: JobStatus::Open,
            created_at: now,
            updated_at: now,
        };
        job.apply(
            JobPatch {
                title: Some(draft.title),
                description: Some(draft.description),
                location: draft.location,
                employment_type: Some(draft.employment_type),
                salary_min: draft.salary_min,
                salary_max: draft.salary_max,
                required_credentials: Some(draft.required_credentials),
            },
            now,
        )?;
        Ok(job)
    }

    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }

    /// Validate the merged result before touching `self`
    pub fn apply(&mut self, patch: JobPatch, now: DateTime<Utc>) -> MarketplaceResult<()> {
        let title = patch.title.map_or_else(|| self.title.clone(), |t| t.trim().to_string());
        if title.is_empty() || title.chars().count() > TITLE_MAX_LENGTH {
            return Err(MarketplaceError::Validation(format!(
                "title must be 1 to {TITLE_MAX_LENGTH} characters"
            )));
        }

        let description = patch
            .description
            .map_or_else(|| self.description.clone(), |d| d.trim().to_string());
        if description.is_empty() || description.chars().count() > DESCRIPTION_MAX_LENGTH {
            return Err(MarketplaceError::Validation(format!(
                "description must be 1 to {DESCRIPTION_MAX_LENGTH} characters"
            )));
        }

        let location = match patch.location {
            Some(l) => non_blank(Some(l)),
            None => self.location.clone(),
        };
        if location
            .as_ref()
            .is_some_and(|l| l.chars().count() > LOCATION_MAX_LENGTH)
        {
            return Err(MarketplaceError::Validation(format!(
                "location must be at most {LOCATION_MAX_LENGTH} characters"
            )));
        }

        let salary_min = patch.salary_min.or(self.salary_min);
        let salary_max = patch.salary_max.or(self.salary_max);
        if salary_min.is_some_and(|s| s < 0) || salary_max.is_some_and(|s| s < 0) {
            return Err(MarketplaceError::Validation(
                "salary cannot be negative".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (salary_min, salary_max) {
            if min > max {
                return Err(MarketplaceError::Validation(
                    "salaryMin must not exceed salaryMax".to_string(),
                ));
            }
        }

        let mut required = patch
            .required_credentials
            .unwrap_or_else(|| self.required_credentials.clone());
        required.sort();
        required.dedup();

        self.title = title;
        self.description = description;
        self.location = location;
        self.employment_type = patch.employment_type.unwrap_or(self.employment_type);
        self.salary_min = salary_min;
        self.salary_max = salary_max;
        self.required_credentials = required;
        self.updated_at = now;
        Ok(())
    }

    /// `false` when it was already closed
    pub fn close(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = JobStatus::Closed;
        self.updated_at = now;
        true
    }

    /// Case-insensitive match on title, description and location
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .location
                .as_ref()
                .is_some_and(|l| l.to_lowercase().contains(&needle))
    }
}
