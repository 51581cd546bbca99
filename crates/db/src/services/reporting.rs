//! Accounting dashboard summary. Aggregation happens in Rust over decoded
//! rows so amounts stay in [`Decimal`] end to end.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tripledger_core::authz;
use tripledger_core::domain::item::ExpenseCategory;
use tripledger_core::domain::report::ReportStatus;
use tripledger_core::domain::user::Actor;
use tripledger_core::errors::DomainError;

use crate::connection::DbPool;
use crate::repositories::{history, items, reports, ActivityRecord};
use crate::services::ServiceError;

const RECENT_ACTIVITY_LIMIT: u32 = 10;

/// Optional date window over report creation dates. `None` on either end
/// leaves that end open.
#[derive(Clone, Copy, Debug, Default)]
pub struct SummaryWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SummaryWindow {
    fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusBucket {
    pub status: ReportStatus,
    pub count: u64,
    pub total: Decimal,
}

#[derive(Clone, Debug)]
pub struct SummaryReport {
    pub total_reports: u64,
    pub total_amount: Decimal,
    /// One bucket per lifecycle status, in lifecycle order, zeros included.
    pub by_status: Vec<StatusBucket>,
    pub by_category: BTreeMap<ExpenseCategory, Decimal>,
    pub recent_activity: Vec<ActivityRecord>,
}

#[derive(Clone)]
pub struct SummaryReporting {
    pool: DbPool,
}

impl SummaryReporting {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn summary(
        &self,
        window: SummaryWindow,
        actor: &Actor,
    ) -> Result<SummaryReport, ServiceError> {
        if !authz::can_view_summary(actor) {
            return Err(DomainError::Forbidden("only accounting can view the summary").into());
        }

        let mut conn = self.pool.acquire().await?;

        let all_reports = reports::list(&mut conn, &authz::ReadScope::All).await?;
        let mut total_reports = 0u64;
        let mut total_amount = Decimal::ZERO;
        let mut tallies: BTreeMap<ReportStatus, (u64, Decimal)> = BTreeMap::new();
        for report in &all_reports {
            if !window.contains(report.created_at.date_naive()) {
                continue;
            }
            total_reports += 1;
            total_amount += report.total_amount;
            let tally = tallies.entry(report.status).or_insert((0, Decimal::ZERO));
            tally.0 += 1;
            tally.1 += report.total_amount;
        }
        let by_status = [
            ReportStatus::Draft,
            ReportStatus::Submitted,
            ReportStatus::Approved,
            ReportStatus::Rejected,
            ReportStatus::Paid,
        ]
        .into_iter()
        .map(|status| {
            let (count, total) = tallies.get(&status).copied().unwrap_or((0, Decimal::ZERO));
            StatusBucket { status, count, total }
        })
        .collect();

        let mut by_category: BTreeMap<ExpenseCategory, Decimal> = BTreeMap::new();
        for (category, amount, report_created_at) in
            items::list_category_amounts(&mut conn).await?
        {
            if window.contains(report_created_at.date_naive()) {
                *by_category.entry(category).or_insert(Decimal::ZERO) += amount;
            }
        }

        let recent_activity = history::recent(&mut conn, RECENT_ACTIVITY_LIMIT).await?;

        Ok(SummaryReport { total_reports, total_amount, by_status, by_category, recent_activity })
    }
}
