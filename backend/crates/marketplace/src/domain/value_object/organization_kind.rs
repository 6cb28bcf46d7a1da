use std::fmt;

use auth::OrganizationAffiliation;
use kernel::actor::UserRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationKind {
    University,
    Company,
}

impl OrganizationKind {
    pub const fn code(&self) -> &'static str {
        match self {
            OrganizationKind::University => "university",
            OrganizationKind::Company => "company",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "university" => Some(OrganizationKind::University),
            "company" => Some(OrganizationKind::Company),
            _ => None,
        }
    }

    pub const fn affiliation(&self) -> OrganizationAffiliation {
        match self {
            OrganizationKind::University => OrganizationAffiliation::University,
            OrganizationKind::Company => OrganizationAffiliation::Company,
        }
    }

    /// Role allowed to register and join this kind of organization
    pub fn registrable_by(&self, role: UserRole) -> bool {
        self.affiliation().admits(role)
    }
}

impl fmt::Display for OrganizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrable_by() {
        assert!(OrganizationKind::University.registrable_by(UserRole::Institution));
        assert!(!OrganizationKind::University.registrable_by(UserRole::Employer));
        assert!(OrganizationKind::Company.registrable_by(UserRole::Employer));
        assert!(OrganizationKind::Company.registrable_by(UserRole::Admin));
        assert!(!OrganizationKind::Company.registrable_by(UserRole::Student));
    }
}
