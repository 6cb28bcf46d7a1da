//! Workflow states
//!
//! ```text
//! pending ──┬──> verified ──┬──> revoked
//! issued  ──┤               └──> expired
//!           ├──> revoked
//!           └──> expired
//! ```
//!
//! `revoked` and `expired` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! coded_enum {
    ($name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Uploaded by the student, awaiting verification
    Pending,
    /// Issued directly by the institution
    Issued,
    Verified,
    Revoked,
    Expired,
}

coded_enum!(CredentialStatus {
    Pending => "pending",
    Issued => "issued",
    Verified => "verified",
    Revoked => "revoked",
    Expired => "expired",
});

impl CredentialStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, CredentialStatus::Revoked | CredentialStatus::Expired)
    }

    pub const fn can_transition_to(&self, next: CredentialStatus) -> bool {
        use CredentialStatus::*;
        matches!(
            (self, next),
            (Pending | Issued, Verified | Revoked | Expired) | (Verified, Revoked | Expired)
        )
    }

    /// A verification request may be opened in this state
    pub const fn accepts_verification(&self) -> bool {
        matches!(self, CredentialStatus::Pending | CredentialStatus::Issued)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

coded_enum!(RequestStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl RequestStatus {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// Ledger anchoring state as seen on the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    #[default]
    None,
    Pending,
    Anchored,
    Failed,
}

coded_enum!(AnchorStatus {
    None => "none",
    Pending => "pending",
    Anchored => "anchored",
    Failed => "failed",
});

/// State of one outbox row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Anchored,
    Failed,
}

coded_enum!(OutboxStatus {
    Pending => "pending",
    Anchored => "anchored",
    Failed => "failed",
});

#[cfg(test)]
mod tests {
    use super::*;
    use CredentialStatus::*;

    #[test]
    fn test_transition_table() {
        let allowed = [
            (Pending, Verified),
            (Pending, Revoked),
            (Pending, Expired),
            (Issued, Verified),
            (Issued, Revoked),
            (Issued, Expired),
            (Verified, Revoked),
            (Verified, Expired),
        ];

        for from in CredentialStatus::ALL {
            for to in CredentialStatus::ALL {
                assert_eq!(
                    from.can_transition_to(*to),
                    allowed.contains(&(*from, *to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(Revoked.is_terminal());
        assert!(Expired.is_terminal());
        assert!(!Verified.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
    }

    #[test]
    fn test_codes() {
        for status in CredentialStatus::ALL {
            assert_eq!(CredentialStatus::from_code(status.code()), Some(*status));
        }
        assert_eq!(AnchorStatus::from_code("anchored"), Some(AnchorStatus::Anchored));
        assert_eq!(OutboxStatus::from_code("bogus"), None);
        assert_eq!(RequestStatus::Rejected.to_string(), "rejected");
    }
}
