//! Organization entity
//!
//! Universities verify credentials, companies post jobs. Users bind to one
//! through the auth module, which asks the marketplace what kind it is.

use chrono::{DateTime, Utc};
use kernel::id::{OrganizationId, UserId};

use crate::domain::value_object::OrganizationKind;
use crate::error::{MarketplaceError, MarketplaceResult};

const NAME_MAX_LENGTH: usize = 200;
const WEBSITE_MAX_LENGTH: usize = 500;
const DESCRIPTION_MAX_LENGTH: usize = 5000;

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub kind: OrganizationKind,
    pub website: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub organization_id: OrganizationId,
    pub name: String,
    pub kind: OrganizationKind,
    pub website: Option<String>,
    pub description: Option<String>,
    /// Set by an administrator
    pub verified: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(input: NewOrganization, created_by: UserId, now: DateTime<Utc>) -> MarketplaceResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() || name.chars().count() > NAME_MAX_LENGTH {
            return Err(MarketplaceError::Validation(format!(
                "name must be 1 to {NAME_MAX_LENGTH} characters"
            )));
        }

        let website = non_blank(input.website);
        if let Some(url) = &website {
            if !(url.starts_with("https://") || url.starts_with("http://"))
                || url.len() > WEBSITE_MAX_LENGTH
            {
                return Err(MarketplaceError::Validation(
                    "website must be an http(s) URL".to_string(),
                ));
            }
        }

        let description = non_blank(input.description);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_LENGTH)
        {
            return Err(MarketplaceError::Validation(format!(
                "description must be at most {DESCRIPTION_MAX_LENGTH} characters"
            )));
        }

        Ok(Self {
            organization_id: OrganizationId::new(),
            name,
            kind: input.kind,
            website,
            description,
            verified: false,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// `false` when it was already verified
    pub fn verify(&mut self, now: DateTime<Utc>) -> bool {
        if self.verified {
            return false;
        }
        self.verified = true;
        self.updated_at = now;
        true
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
