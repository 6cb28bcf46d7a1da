//! Credential analytics
//!
//! Aggregates are computed by the repository (SQL for PostgreSQL, the
//! functions below for the in-memory store); both produce the same shape.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use kernel::id::OrganizationId;
use serde::Serialize;

use crate::domain::entity::{Credential, VerificationRequest};
use crate::domain::value_object::{
    AnchorStatus, CredentialStatus, CredentialType, RequestStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionCount {
    pub institution_id: OrganizationId,
    pub total: u64,
    pub verified: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub average_decision_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialAnalytics {
    pub total: u64,
    pub by_status: BTreeMap<CredentialStatus, u64>,
    pub by_type: BTreeMap<CredentialType, u64>,
    pub by_institution: Vec<InstitutionCount>,
    pub monthly_issuance: Vec<MonthlyCount>,
    pub verification: VerificationStats,
    pub anchoring: BTreeMap<AnchorStatus, u64>,
}

/// First day of each of the last `months` months, oldest first, ending with
/// the month containing `today`.
pub fn month_starts(months: u32, today: NaiveDate) -> Vec<NaiveDate> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..months as i32)
        .rev()
        .filter_map(|back| {
            let index = current - back;
            NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        })
        .collect()
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Zero-filled status, type and anchoring maps
pub(crate) fn empty_analytics(months: u32, today: NaiveDate) -> CredentialAnalytics {
    CredentialAnalytics {
        total: 0,
        by_status: CredentialStatus::ALL.iter().map(|s| (*s, 0)).collect(),
        by_type: CredentialType::ALL.iter().map(|t| (*t, 0)).collect(),
        by_institution: Vec::new(),
        monthly_issuance: month_starts(months, today)
            .into_iter()
            .map(|start| MonthlyCount {
                month: month_label(start),
                count: 0,
            })
            .collect(),
        verification: VerificationStats::default(),
        anchoring: AnchorStatus::ALL.iter().map(|s| (*s, 0)).collect(),
    }
}

pub fn aggregate(
    credentials: &[Credential],
    requests: &[VerificationRequest],
    months: u32,
    today: NaiveDate,
) -> CredentialAnalytics {
    let mut analytics = empty_analytics(months, today);
    let mut per_institution: BTreeMap<OrganizationId, InstitutionCount> = BTreeMap::new();

    for credential in credentials {
        analytics.total += 1;
        *analytics.by_status.entry(credential.status).or_default() += 1;
        *analytics.by_type.entry(credential.credential_type).or_default() += 1;
        *analytics.anchoring.entry(credential.anchor_status).or_default() += 1;

        let entry = per_institution
            .entry(credential.institution_id)
            .or_insert_with(|| InstitutionCount {
                institution_id: credential.institution_id,
                total: 0,
                verified: 0,
            });
        entry.total += 1;
        if credential.status == CredentialStatus::Verified {
            entry.verified += 1;
        }

        let label = month_label(credential.issue_date);
        if let Some(bucket) = analytics
            .monthly_issuance
            .iter_mut()
            .find(|bucket| bucket.month == label)
        {
            bucket.count += 1;
        }
    }

    let mut by_institution: Vec<InstitutionCount> = per_institution.into_values().collect();
    by_institution.sort_by(|a, b| b.total.cmp(&a.total).then(a.institution_id.cmp(&b.institution_id)));
    analytics.by_institution = by_institution;

    let mut decision_secs = Vec::new();
    for request in requests {
        analytics.verification.total += 1;
        match request.status {
            RequestStatus::Pending => analytics.verification.pending += 1,
            RequestStatus::Approved => analytics.verification.approved += 1,
            RequestStatus::Rejected => analytics.verification.rejected += 1,
        }
        if let Some(secs) = request.decision_secs() {
            decision_secs.push(secs as f64);
        }
    }
    if !decision_secs.is_empty() {
        let mean = decision_secs.iter().sum::<f64>() / decision_secs.len() as f64;
        analytics.verification.average_decision_hours = Some(mean / 3600.0);
    }

    analytics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewCredential;
    use chrono::{Duration, TimeZone, Utc};
    use kernel::id::UserId;

    fn credential(institution: OrganizationId, issue_date: NaiveDate) -> Credential {
        Credential::issue(
            UserId::new(),
            institution,
            NewCredential {
                title: "Certificate".to_string(),
                credential_type: CredentialType::Certificate,
                description: None,
                issue_date,
                expiry_date: None,
                document_hash: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_month_starts_cross_year() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        let labels: Vec<String> = month_starts(4, today).into_iter().map(month_label).collect();
        assert_eq!(labels, vec!["2025-11", "2025-12", "2026-01", "2026-02"]);
    }

    #[test]
    fn test_aggregate() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let a = OrganizationId::new();
        let b = OrganizationId::new();

        let mut verified = credential(a, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        verified.verify(UserId::new(), Utc::now()).unwrap();
        let credentials = vec![
            verified,
            credential(a, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()),
            // Outside the window
            credential(b, NaiveDate::from_ymd_opt(2020, 1, 5).unwrap()),
        ];

        let opened = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut decided = VerificationRequest::new(
            credentials[0].credential_id,
            credentials[0].owner_id,
            a,
            None,
            opened,
        )
        .unwrap();
        decided
            .approve(UserId::new(), None, opened + Duration::hours(6))
            .unwrap();
        let pending =
            VerificationRequest::new(credentials[1].credential_id, UserId::new(), a, None, opened)
                .unwrap();

        let analytics = aggregate(&credentials, &[decided, pending], 3, today);

        assert_eq!(analytics.total, 3);
        assert_eq!(analytics.by_status[&CredentialStatus::Verified], 1);
        assert_eq!(analytics.by_status[&CredentialStatus::Issued], 2);
        assert_eq!(analytics.by_status[&CredentialStatus::Revoked], 0);
        assert_eq!(analytics.by_type[&CredentialType::Certificate], 3);
        assert_eq!(analytics.anchoring[&AnchorStatus::Pending], 3);

        assert_eq!(analytics.by_institution[0].institution_id, a);
        assert_eq!(analytics.by_institution[0].total, 2);
        assert_eq!(analytics.by_institution[0].verified, 1);

        let monthly: Vec<u64> = analytics.monthly_issuance.iter().map(|m| m.count).collect();
        assert_eq!(monthly, vec![1, 0, 1]);

        assert_eq!(analytics.verification.total, 2);
        assert_eq!(analytics.verification.pending, 1);
        assert_eq!(analytics.verification.average_decision_hours, Some(6.0));
    }
}
