//! Credential data as submitted by a client

use chrono::NaiveDate;

use crate::domain::entity::NewCredential;
use crate::domain::value_object::{CredentialType, DocumentHash};
use crate::error::CredentialResult;

#[derive(Debug, Clone)]
pub struct CredentialDraft {
    pub title: String,
    pub credential_type: CredentialType,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub document_hash: Option<String>,
}

impl CredentialDraft {
    pub fn into_new_credential(self) -> CredentialResult<NewCredential> {
        let document_hash = self
            .document_hash
            .filter(|h| !h.trim().is_empty())
            .map(DocumentHash::new)
            .transpose()?;

        NewCredential {
            title: self.title,
            credential_type: self.credential_type,
            description: self.description,
            issue_date: self.issue_date,
            expiry_date: self.expiry_date,
            document_hash,
        }
        .validate()
    }
}
