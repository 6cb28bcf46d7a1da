use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Degree,
    Diploma,
    Certificate,
    Transcript,
    License,
    Other,
}

impl CredentialType {
    pub const ALL: &'static [CredentialType] = &[
        CredentialType::Degree,
        CredentialType::Diploma,
        CredentialType::Certificate,
        CredentialType::Transcript,
        CredentialType::License,
        CredentialType::Other,
    ];

    pub const fn code(&self) -> &'static str {
        match self {
            CredentialType::Degree => "degree",
            CredentialType::Diploma => "diploma",
            CredentialType::Certificate => "certificate",
            CredentialType::Transcript => "transcript",
            CredentialType::License => "license",
            CredentialType::Other => "other",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
