//! Endorsement policy
//!
//! A static "k-of-n members" rule. Only set membership and counts are
//! checked; there are no signatures.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndorsementPolicy {
    /// MSP ids allowed to endorse
    pub members: BTreeSet<String>,
    /// Distinct member endorsements needed
    pub required: usize,
}

impl EndorsementPolicy {
    /// `required` is clamped to `1..=members.len()`
    pub fn new<I, S>(members: I, required: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: BTreeSet<String> = members.into_iter().map(Into::into).collect();
        let required = required.clamp(1, members.len().max(1));
        Self { members, required }
    }

    /// More than half of the members
    pub fn majority<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: BTreeSet<String> = members.into_iter().map(Into::into).collect();
        let required = members.len() / 2 + 1;
        Self { members, required }
    }

    pub fn check<S: AsRef<str>>(&self, endorsers: &[S]) -> LedgerResult<()> {
        if let Some(outsider) = endorsers
            .iter()
            .map(AsRef::as_ref)
            .find(|e| !self.members.contains(*e))
        {
            return Err(LedgerError::EndorsementPolicyFailure(format!(
                "{outsider} is not a member of the endorsement policy"
            )));
        }

        let distinct: BTreeSet<&str> = endorsers.iter().map(AsRef::as_ref).collect();
        if distinct.len() < self.required {
            return Err(LedgerError::EndorsementPolicyFailure(format!(
                "{} of {} required endorsements",
                distinct.len(),
                self.required
            )));
        }

        Ok(())
    }

    /// e.g. `2-of-3 {Org1MSP, Org2MSP, Org3MSP}`
    pub fn describe(&self) -> String {
        let members: Vec<&str> = self.members.iter().map(String::as_str).collect();
        format!(
            "{}-of-{} {{{}}}",
            self.required,
            self.members.len(),
            members.join(", ")
        )
    }
}
