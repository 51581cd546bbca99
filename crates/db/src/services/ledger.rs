//! The item ledger. Access and draft-status checks are re-read inside the
//! same transaction that mutates the item and rewrites the parent report's
//! total, so there is no gap between check and use and the total can never
//! be observed stale.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use tripledger_core::authz;
use tripledger_core::domain::item::{
    summarize_by_category, total_of, ExpenseCategory, ExpenseItem, ItemId, ItemPatch, NewItem,
};
use tripledger_core::domain::report::{ExpenseReport, ReportId};
use tripledger_core::domain::user::Actor;
use tripledger_core::errors::DomainError;

use crate::connection::DbPool;
use crate::repositories::{items, reports};
use crate::services::{new_id, ServiceError};

#[derive(Clone)]
pub struct ItemLedger {
    pool: DbPool,
}

impl ItemLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn add_item(
        &self,
        report_id: &ReportId,
        fields: NewItem,
        actor: &Actor,
    ) -> Result<ExpenseItem, ServiceError> {
        fields.validate(Utc::now().date_naive())?;

        let mut tx = self.pool.begin().await?;
        let report = self.editable_report(&mut tx, report_id, actor, "add items to").await?;

        let now = Utc::now();
        let item = ExpenseItem {
            id: ItemId(new_id()),
            report_id: report.id.clone(),
            category: fields.category,
            description: fields.description,
            amount: fields.amount,
            receipt_url: fields.receipt_url,
            expense_date: fields.expense_date,
            created_at: now,
            updated_at: now,
        };
        items::insert(&mut tx, &item).await?;
        let total = Self::recompute_total(&mut tx, report_id).await?;
        tx.commit().await?;

        info!(
            event_name = "report.ledger.item_added",
            report_id = %report_id.0,
            item_id = %item.id.0,
            total = %total,
            "expense item added"
        );
        Ok(item)
    }

    pub async fn update_item(
        &self,
        report_id: &ReportId,
        item_id: &ItemId,
        patch: ItemPatch,
        actor: &Actor,
    ) -> Result<ExpenseItem, ServiceError> {
        patch.validate(Utc::now().date_naive())?;

        let mut tx = self.pool.begin().await?;
        self.editable_report(&mut tx, report_id, actor, "modify items of").await?;

        let mut item = items::find_by_id(&mut tx, item_id)
            .await?
            .filter(|item| item.report_id == *report_id)
            .ok_or(DomainError::NotFound)?;

        if patch.is_empty() {
            return Ok(item);
        }

        patch.apply_to(&mut item);
        item.updated_at = Utc::now();
        let affected = items::update(&mut tx, &item).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        let total = Self::recompute_total(&mut tx, report_id).await?;
        tx.commit().await?;

        info!(
            event_name = "report.ledger.item_updated",
            report_id = %report_id.0,
            item_id = %item_id.0,
            total = %total,
            "expense item updated"
        );
        Ok(item)
    }

    pub async fn delete_item(
        &self,
        report_id: &ReportId,
        item_id: &ItemId,
        actor: &Actor,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        self.editable_report(&mut tx, report_id, actor, "modify items of").await?;

        let item = items::find_by_id(&mut tx, item_id)
            .await?
            .filter(|item| item.report_id == *report_id)
            .ok_or(DomainError::NotFound)?;

        let affected = items::delete(&mut tx, &item.id).await?;
        if affected == 0 {
            return Err(DomainError::DeleteFailed.into());
        }
        let total = Self::recompute_total(&mut tx, report_id).await?;
        tx.commit().await?;

        info!(
            event_name = "report.ledger.item_deleted",
            report_id = %report_id.0,
            item_id = %item_id.0,
            total = %total,
            "expense item deleted"
        );
        Ok(())
    }

    pub async fn list_items(
        &self,
        report_id: &ReportId,
        actor: &Actor,
    ) -> Result<Vec<ExpenseItem>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let report = reports::find_by_id(&mut conn, report_id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !authz::can_access_report(&report, actor) {
            return Err(DomainError::Forbidden("you do not have access to this report").into());
        }
        Ok(items::list_for_report(&mut conn, report_id).await?)
    }

    /// Per-category totals for one report, for the breakdown view and
    /// reporting exports.
    pub async fn category_summary(
        &self,
        report_id: &ReportId,
        actor: &Actor,
    ) -> Result<BTreeMap<ExpenseCategory, Decimal>, ServiceError> {
        let items = self.list_items(report_id, actor).await?;
        Ok(summarize_by_category(&items))
    }

    /// Fetches the parent report inside the caller's transaction and checks
    /// both access and draft status against that fresh row.
    async fn editable_report(
        &self,
        conn: &mut sqlx::SqliteConnection,
        report_id: &ReportId,
        actor: &Actor,
        action: &'static str,
    ) -> Result<ExpenseReport, ServiceError> {
        let report = reports::find_by_id(conn, report_id, &authz::ReadScope::All)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !authz::can_access_report(&report, actor) {
            return Err(DomainError::Forbidden("you do not have access to this report").into());
        }
        if !report.status.is_editable() {
            return Err(DomainError::InvalidStatus { status: report.status, action }.into());
        }
        Ok(report)
    }

    /// Recompute-on-write: total = sum over the remaining items, evaluated
    /// in the same transaction as the mutation that made it stale.
    async fn recompute_total(
        conn: &mut sqlx::SqliteConnection,
        report_id: &ReportId,
    ) -> Result<Decimal, ServiceError> {
        let remaining = items::list_for_report(conn, report_id).await?;
        let total = total_of(&remaining);
        reports::set_total(conn, report_id, total, Utc::now()).await?;
        Ok(total)
    }
}
