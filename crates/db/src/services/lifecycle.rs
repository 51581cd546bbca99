//! The report lifecycle engine. Every status transition runs as one
//! transaction: re-read the current row, evaluate the gate and the
//! transition table, write the new status plus its audit row, commit. A
//! failure at any step rolls the whole unit back.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use tripledger_core::authz;
use tripledger_core::domain::history::HistoryEntryId;
use tripledger_core::domain::report::{
    ExpenseReport, LifecycleAction, NewReport, ReportId, ReportPatch, ReportStatus,
};
use tripledger_core::domain::user::Actor;
use tripledger_core::errors::DomainError;
use tripledger_core::ApprovalHistoryEntry;

use crate::connection::DbPool;
use crate::repositories::{history, items, reports, users, PendingHistoryEntry};
use crate::services::{new_id, ServiceError};

#[derive(Clone)]
pub struct ReportLifecycle {
    pool: DbPool,
}

impl ReportLifecycle {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_report(
        &self,
        actor: &Actor,
        draft: NewReport,
    ) -> Result<ExpenseReport, ServiceError> {
        draft.validate()?;

        let mut conn = self.pool.acquire().await?;
        let owner = users::find_by_id(&mut conn, &actor.id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let now = Utc::now();
        let report = ExpenseReport {
            id: ReportId(new_id()),
            owner_id: owner.id,
            title: draft.title,
            trip_purpose: draft.trip_purpose,
            trip_start_date: draft.trip_start_date,
            trip_end_date: draft.trip_end_date,
            status: ReportStatus::Draft,
            total_amount: Decimal::ZERO,
            submitted_at: None,
            approved_at: None,
            approved_by: None,
            owner_name: owner.name,
            owner_email: owner.email,
            approver_name: None,
            created_at: now,
            updated_at: now,
        };
        reports::insert(&mut conn, &report).await?;

        info!(
            event_name = "report.lifecycle.created",
            report_id = %report.id.0,
            owner_id = %actor.id.0,
            "expense report created"
        );
        Ok(report)
    }

    /// Read through the actor's visibility scope: an inaccessible report is
    /// indistinguishable from a missing one.
    pub async fn get_report(
        &self,
        id: &ReportId,
        actor: &Actor,
    ) -> Result<ExpenseReport, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let scope = authz::read_scope(actor);
        reports::find_by_id(&mut conn, id, &scope)
            .await?
            .ok_or_else(|| DomainError::NotFound.into())
    }

    pub async fn list_reports(&self, actor: &Actor) -> Result<Vec<ExpenseReport>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let scope = authz::read_scope(actor);
        Ok(reports::list(&mut conn, &scope).await?)
    }

    pub async fn update_report(
        &self,
        id: &ReportId,
        patch: ReportPatch,
        actor: &Actor,
    ) -> Result<ExpenseReport, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut report = reports::find_by_id(&mut tx, id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !authz::can_access_report(&report, actor) {
            return Err(DomainError::Forbidden("you do not have access to this report").into());
        }
        // Guards run before the empty-patch shortcut, so an empty update on
        // a submitted report fails instead of silently succeeding.
        if !report.status.is_editable() {
            return Err(
                DomainError::InvalidStatus { status: report.status, action: "edit" }.into()
            );
        }
        patch.validate_against(&report)?;
        if patch.is_empty() {
            return Ok(report);
        }

        patch.apply_to(&mut report);
        report.updated_at = Utc::now();
        let affected = reports::update_fields(&mut tx, &report).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        tx.commit().await?;

        info!(
            event_name = "report.lifecycle.updated",
            report_id = %report.id.0,
            actor_id = %actor.id.0,
            "expense report fields updated"
        );
        Ok(report)
    }

    pub async fn delete_report(&self, id: &ReportId, actor: &Actor) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let report = reports::find_by_id(&mut tx, id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !authz::can_access_report(&report, actor) {
            return Err(DomainError::Forbidden("you do not have access to this report").into());
        }
        if !report.status.is_editable() {
            return Err(
                DomainError::InvalidStatus { status: report.status, action: "delete" }.into()
            );
        }

        let affected = reports::delete_draft(&mut tx, id).await?;
        if affected == 0 {
            return Err(DomainError::DeleteFailed.into());
        }
        tx.commit().await?;

        info!(
            event_name = "report.lifecycle.deleted",
            report_id = %id.0,
            actor_id = %actor.id.0,
            "draft expense report deleted"
        );
        Ok(())
    }

    /// The ≥1-item guard is read inside the same transaction that flips the
    /// status; a concurrent item delete either lands before this transaction
    /// (submit fails with NoItems) or after it (delete fails, report no
    /// longer draft). There is no window in between.
    pub async fn submit_report(
        &self,
        id: &ReportId,
        actor: &Actor,
    ) -> Result<ExpenseReport, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut report = reports::find_by_id(&mut tx, id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !authz::is_owner(&report, actor) {
            return Err(DomainError::Forbidden("only the report owner can submit it").into());
        }
        let next = report.status.transition(LifecycleAction::Submit)?;

        if items::count_for_report(&mut tx, id).await? == 0 {
            return Err(DomainError::NoItems.into());
        }

        let now = Utc::now();
        report.status = next;
        report.submitted_at = Some(now);
        report.updated_at = now;
        let affected = reports::apply_transition(&mut tx, &report).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        history::append(
            &mut tx,
            &PendingHistoryEntry {
                id: HistoryEntryId(new_id()),
                report_id: report.id.clone(),
                action: LifecycleAction::Submit.into(),
                actor_id: actor.id.clone(),
                comment: None,
                created_at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "report.lifecycle.submitted",
            report_id = %report.id.0,
            owner_id = %actor.id.0,
            "expense report submitted for approval"
        );
        Ok(report)
    }

    pub async fn approve_report(
        &self,
        id: &ReportId,
        comment: Option<String>,
        actor: &Actor,
    ) -> Result<ExpenseReport, ServiceError> {
        if !authz::can_approve(actor) {
            return Err(DomainError::Forbidden("only accounting can approve reports").into());
        }

        let mut tx = self.pool.begin().await?;
        let mut report = reports::find_by_id(&mut tx, id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        let next = report.status.transition(LifecycleAction::Approve)?;
        let approver = users::find_by_id(&mut tx, &actor.id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let now = Utc::now();
        report.status = next;
        report.approved_at = Some(now);
        report.approved_by = Some(approver.id.clone());
        report.approver_name = Some(approver.name);
        report.updated_at = now;
        let affected = reports::apply_transition(&mut tx, &report).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        history::append(
            &mut tx,
            &PendingHistoryEntry {
                id: HistoryEntryId(new_id()),
                report_id: report.id.clone(),
                action: LifecycleAction::Approve.into(),
                actor_id: actor.id.clone(),
                comment,
                created_at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "report.lifecycle.approved",
            report_id = %report.id.0,
            approver_id = %actor.id.0,
            "expense report approved"
        );
        Ok(report)
    }

    pub async fn reject_report(
        &self,
        id: &ReportId,
        comment: String,
        actor: &Actor,
    ) -> Result<ExpenseReport, ServiceError> {
        if !authz::can_reject(actor) {
            return Err(DomainError::Forbidden("only accounting can reject reports").into());
        }
        let comment = comment.trim().to_string();
        if comment.is_empty() {
            return Err(DomainError::InvalidComment.into());
        }

        let mut tx = self.pool.begin().await?;
        let mut report = reports::find_by_id(&mut tx, id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        let next = report.status.transition(LifecycleAction::Reject)?;
        let approver = users::find_by_id(&mut tx, &actor.id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let now = Utc::now();
        report.status = next;
        report.approved_at = Some(now);
        report.approved_by = Some(approver.id.clone());
        report.approver_name = Some(approver.name);
        report.updated_at = now;
        let affected = reports::apply_transition(&mut tx, &report).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        history::append(
            &mut tx,
            &PendingHistoryEntry {
                id: HistoryEntryId(new_id()),
                report_id: report.id.clone(),
                action: LifecycleAction::Reject.into(),
                actor_id: actor.id.clone(),
                comment: Some(comment),
                created_at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "report.lifecycle.rejected",
            report_id = %report.id.0,
            approver_id = %actor.id.0,
            "expense report rejected"
        );
        Ok(report)
    }

    pub async fn mark_paid(
        &self,
        id: &ReportId,
        comment: Option<String>,
        actor: &Actor,
    ) -> Result<ExpenseReport, ServiceError> {
        if !authz::can_mark_paid(actor) {
            return Err(DomainError::Forbidden("only accounting can mark reports paid").into());
        }

        let mut tx = self.pool.begin().await?;
        let mut report = reports::find_by_id(&mut tx, id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        let next = report.status.transition(LifecycleAction::MarkPaid)?;

        let now = Utc::now();
        report.status = next;
        report.updated_at = now;
        let affected = reports::apply_transition(&mut tx, &report).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        history::append(
            &mut tx,
            &PendingHistoryEntry {
                id: HistoryEntryId(new_id()),
                report_id: report.id.clone(),
                action: LifecycleAction::MarkPaid.into(),
                actor_id: actor.id.clone(),
                comment,
                created_at: now,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "report.lifecycle.paid",
            report_id = %report.id.0,
            actor_id = %actor.id.0,
            "expense report marked as paid"
        );
        Ok(report)
    }

    /// Newest-first audit trail for one report, visible only through the
    /// actor's read scope.
    pub async fn approval_history(
        &self,
        report_id: &ReportId,
        actor: &Actor,
    ) -> Result<Vec<ApprovalHistoryEntry>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let scope = authz::read_scope(actor);
        reports::find_by_id(&mut conn, report_id, &scope)
            .await?
            .ok_or(DomainError::NotFound)?;
        Ok(history::list_for_report(&mut conn, report_id).await?)
    }
}
