//! Decide Verification Use Case
//!
//! Approve or reject a pending verification request. The credential change,
//! the request change, the ledger outbox row and the owner's notification
//! are committed as one unit; events are published only after the commit.

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::error::app_error::AppError;
use kernel::id::VerificationRequestId;
use ledger::LedgerOperation;
use notification::{EventActor, Notification, NotificationKind};

use crate::application::context::WorkflowContext;
use crate::domain::entity::{Credential, LedgerAnchor, VerificationRequest};
use crate::domain::repository::{ChangeSet, CredentialRepository, CredentialUnitOfWork};
use crate::domain::service::workflow::{Decision, DecisionOutcome, apply_decision};
use crate::error::{CredentialError, CredentialResult};

/// Attempts before a version conflict is reported to the client
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct DecisionOutput {
    pub credential: Credential,
    pub request: VerificationRequest,
    /// `false` when the same decision had already been recorded
    pub applied: bool,
}

pub struct DecideVerificationUseCase<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    repo: Arc<R>,
    ctx: WorkflowContext,
}

impl<R> DecideVerificationUseCase<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, ctx: WorkflowContext) -> Self {
        Self { repo, ctx }
    }

    pub async fn execute(
        &self,
        actor: &CurrentUser,
        request_id: VerificationRequestId,
        decision: Decision,
        reason: Option<String>,
    ) -> CredentialResult<DecisionOutput> {
        actor.require_role(&[UserRole::Institution])?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_decide(actor, request_id, decision, reason.clone()).await {
                Err(CredentialError::ConcurrentModification) if attempt < MAX_ATTEMPTS => {
                    tracing::debug!(%request_id, attempt, "Decision raced, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_decide(
        &self,
        actor: &CurrentUser,
        request_id: VerificationRequestId,
        decision: Decision,
        reason: Option<String>,
    ) -> CredentialResult<DecisionOutput> {
        let mut request = self
            .repo
            .find_request(request_id)
            .await?
            .ok_or(CredentialError::RequestNotFound)?;

        if !actor.is_admin() && !actor.belongs_to(request.institution_id) {
            return Err(AppError::forbidden(
                "Only the credential's institution can decide this request",
            )
            .into());
        }

        let mut credential = self
            .repo
            .find_credential(request.credential_id)
            .await?
            .ok_or_else(|| CredentialError::Internal("Request without credential".to_string()))?;

        let now = Utc::now();
        let outcome = apply_decision(
            &mut credential,
            &mut request,
            decision,
            actor.user_id,
            reason,
            now,
        )?;

        let anchor = match outcome {
            DecisionOutcome::AlreadyDecided => {
                return Ok(DecisionOutput {
                    credential,
                    request,
                    applied: false,
                });
            }
            DecisionOutcome::Applied { anchor } => anchor,
        };

        let notice = decision_notification(&credential, &request, decision);
        let mut changes = ChangeSet::new()
            .update_request(request.clone())
            .notify(notice.clone());
        if let Some(operation) = anchor {
            changes = changes
                .update_credential(credential.clone())
                .enqueue_anchor(LedgerAnchor::new(
                    credential.credential_id,
                    operation,
                    credential.payload_hash(operation),
                    actor.user_id.to_string(),
                    self.ctx.config.anchor_max_retries,
                    now,
                ));
        }

        self.repo.commit(changes).await?;

        tracing::info!(
            request_id = %request.request_id,
            credential_id = %credential.credential_id,
            decision = ?decision,
            credential_status = %credential.status,
            "Verification decided"
        );

        if anchor.is_some() {
            self.ctx.wakeup.wake();
        }
        let event_type = match decision {
            Decision::Approve => "verification.approved",
            Decision::Reject => "verification.rejected",
        };
        self.ctx.publish_credential(
            event_type,
            &credential,
            Some(&request),
            EventActor::user(actor.user_id),
        );
        if anchor == Some(LedgerOperation::RevokeCredential) {
            self.ctx.publish_credential(
                "credential.revoked",
                &credential,
                Some(&request),
                EventActor::user(actor.user_id),
            );
        }
        self.ctx.announce(&[notice]);

        Ok(DecisionOutput {
            credential,
            request,
            applied: true,
        })
    }
}

fn decision_notification(
    credential: &Credential,
    request: &VerificationRequest,
    decision: Decision,
) -> Notification {
    let (kind, title, body) = match decision {
        Decision::Approve => (
            NotificationKind::VerificationApproved,
            "Credential verified",
            format!("\"{}\" was verified by your institution", credential.title),
        ),
        Decision::Reject => (
            NotificationKind::VerificationRejected,
            "Verification rejected",
            format!(
                "\"{}\" was not verified: {}",
                credential.title,
                request.decision_reason.as_deref().unwrap_or_default()
            ),
        ),
    };
    Notification::new(request.requested_by, kind, title, body)
        .with_link(format!("/credentials/{}", credential.credential_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::*;
    use crate::domain::value_object::{AnchorStatus, CredentialStatus, OutboxStatus, RequestStatus};

    #[tokio::test]
    async fn test_approve_commits_everything_together() {
        let env = TestEnv::new().await;
        let student = env.student();
        let request = env.requested(&student).await;
        let mut rx = env.ctx.bus.subscribe();

        let output = DecideVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(&env.registrar(), request.request_id, Decision::Approve, None)
            .await
            .unwrap();

        assert!(output.applied);
        assert_eq!(output.request.status, RequestStatus::Approved);
        assert_eq!(output.credential.status, CredentialStatus::Verified);
        assert_eq!(output.credential.anchor_status, AnchorStatus::Pending);

        let stored = env.stored_credential(output.credential.credential_id).await;
        assert_eq!(stored.status, CredentialStatus::Verified);
        let anchors = env.store.anchors().await;
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].operation, LedgerOperation::VerifyCredential);
        assert_eq!(anchors[0].status, OutboxStatus::Pending);

        let notices = env.notifications.all_for(student.user_id).await;
        assert_eq!(notices.last().unwrap().kind, NotificationKind::VerificationApproved);

        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.envelope.event_type.clone());
        }
        assert_eq!(types, vec!["verification.approved", "notification.created"]);
    }

    #[tokio::test]
    async fn test_reject_revokes_credential() {
        let env = TestEnv::new().await;
        let request = env.requested(&env.student()).await;

        let output = DecideVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(
                &env.registrar(),
                request.request_id,
                Decision::Reject,
                Some("Grades do not match our records".into()),
            )
            .await
            .unwrap();

        assert_eq!(output.credential.status, CredentialStatus::Revoked);
        assert_eq!(
            output.credential.revoked_reason.as_deref(),
            Some("Grades do not match our records")
        );
        assert_eq!(
            env.store.anchors().await[0].operation,
            LedgerOperation::RevokeCredential
        );
    }

    #[tokio::test]
    async fn test_repeat_decision_has_no_side_effects() {
        let env = TestEnv::new().await;
        let student = env.student();
        let request = env.requested(&student).await;
        let use_case = DecideVerificationUseCase::new(env.store.clone(), env.ctx.clone());

        use_case
            .execute(&env.registrar(), request.request_id, Decision::Approve, None)
            .await
            .unwrap();
        let again = use_case
            .execute(&env.registrar(), request.request_id, Decision::Approve, None)
            .await
            .unwrap();

        assert!(!again.applied);
        assert_eq!(again.credential.status, CredentialStatus::Verified);
        assert_eq!(env.store.anchors().await.len(), 1);
        assert_eq!(env.notifications.all_for(student.user_id).await.len(), 1);

        let opposite = use_case
            .execute(&env.registrar(), request.request_id, Decision::Reject, None)
            .await;
        assert!(matches!(
            opposite,
            Err(CredentialError::DecisionConflict(RequestStatus::Approved))
        ));
    }

    #[tokio::test]
    async fn test_other_institution_cannot_decide() {
        let env = TestEnv::new().await;
        let request = env.requested(&env.student()).await;
        let use_case = DecideVerificationUseCase::new(env.store.clone(), env.ctx.clone());

        let result = use_case
            .execute(&env.other_registrar(), request.request_id, Decision::Approve, None)
            .await;
        assert!(matches!(result, Err(CredentialError::App(_))));

        // Admins may decide for any institution
        assert!(use_case
            .execute(&env.admin(), request.request_id, Decision::Approve, None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_decisions_apply_once() {
        let env = TestEnv::new().await;
        let request = env.requested(&env.student()).await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let use_case = DecideVerificationUseCase::new(env.store.clone(), env.ctx.clone());
            let registrar = env.registrar();
            let id = request.request_id;
            handles.push(tokio::spawn(async move {
                use_case.execute(&registrar, id, Decision::Approve, None).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().applied {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(env.store.anchors().await.len(), 1);
    }
}
