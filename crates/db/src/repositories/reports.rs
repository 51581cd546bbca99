use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};

use tripledger_core::authz::ReadScope;
use tripledger_core::domain::report::{ExpenseReport, ReportId, ReportStatus};
use tripledger_core::domain::user::UserId;

use super::{decode_amount, decode_date, decode_datetime, encode_date, RepositoryError};

pub(crate) fn parse_status(s: &str) -> Result<ReportStatus, RepositoryError> {
    match s {
        "draft" => Ok(ReportStatus::Draft),
        "submitted" => Ok(ReportStatus::Submitted),
        "approved" => Ok(ReportStatus::Approved),
        "rejected" => Ok(ReportStatus::Rejected),
        "paid" => Ok(ReportStatus::Paid),
        other => Err(RepositoryError::Decode(format!("invalid report status: `{other}`"))),
    }
}

const SELECT_REPORT: &str = "SELECT er.id, er.user_id, er.title, er.trip_purpose,
        er.trip_start_date, er.trip_end_date, er.status, er.total_amount,
        er.submitted_at, er.approved_at, er.approved_by,
        owner.name AS owner_name, owner.email AS owner_email,
        approver.name AS approver_name,
        er.created_at, er.updated_at
 FROM expense_reports er
 JOIN users owner ON er.user_id = owner.id
 LEFT JOIN users approver ON er.approved_by = approver.id";

fn row_to_report(row: &sqlx::sqlite::SqliteRow) -> Result<ExpenseReport, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let trip_purpose: String =
        row.try_get("trip_purpose").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let trip_start_date: String =
        row.try_get("trip_start_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let trip_end_date: String =
        row.try_get("trip_end_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_amount: String =
        row.try_get("total_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at: Option<String> =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_at: Option<String> =
        row.try_get("approved_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_by: Option<String> =
        row.try_get("approved_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_name: String =
        row.try_get("owner_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_email: String =
        row.try_get("owner_email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_name: Option<String> =
        row.try_get("approver_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ExpenseReport {
        id: ReportId(id),
        owner_id: UserId(user_id),
        title,
        trip_purpose,
        trip_start_date: decode_date("trip_start_date", &trip_start_date)?,
        trip_end_date: decode_date("trip_end_date", &trip_end_date)?,
        status: parse_status(&status)?,
        total_amount: decode_amount("total_amount", &total_amount)?,
        submitted_at: submitted_at
            .map(|raw| decode_datetime("submitted_at", &raw))
            .transpose()?,
        approved_at: approved_at.map(|raw| decode_datetime("approved_at", &raw)).transpose()?,
        approved_by: approved_by.map(UserId),
        owner_name,
        owner_email,
        approver_name,
        created_at: decode_datetime("created_at", &created_at)?,
        updated_at: decode_datetime("updated_at", &updated_at)?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    report: &ExpenseReport,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO expense_reports (id, user_id, title, trip_purpose, trip_start_date,
                                      trip_end_date, status, total_amount, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&report.id.0)
    .bind(&report.owner_id.0)
    .bind(&report.title)
    .bind(&report.trip_purpose)
    .bind(encode_date(report.trip_start_date))
    .bind(encode_date(report.trip_end_date))
    .bind(report.status.as_str())
    .bind(report.total_amount.to_string())
    .bind(report.created_at.to_rfc3339())
    .bind(report.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// The visibility filter is part of the query itself: an out-of-scope id
/// behaves exactly like a missing one.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: &ReportId,
    scope: &ReadScope,
) -> Result<Option<ExpenseReport>, RepositoryError> {
    let row = match scope {
        ReadScope::All => {
            sqlx::query(&format!("{SELECT_REPORT} WHERE er.id = ?"))
                .bind(&id.0)
                .fetch_optional(conn)
                .await?
        }
        ReadScope::OwnedBy(owner) => {
            sqlx::query(&format!("{SELECT_REPORT} WHERE er.id = ? AND er.user_id = ?"))
                .bind(&id.0)
                .bind(&owner.0)
                .fetch_optional(conn)
                .await?
        }
    };

    match row {
        Some(ref r) => Ok(Some(row_to_report(r)?)),
        None => Ok(None),
    }
}

pub async fn list(
    conn: &mut SqliteConnection,
    scope: &ReadScope,
) -> Result<Vec<ExpenseReport>, RepositoryError> {
    let rows: Vec<sqlx::sqlite::SqliteRow> = match scope {
        ReadScope::All => {
            sqlx::query(&format!("{SELECT_REPORT} ORDER BY er.created_at DESC"))
                .fetch_all(conn)
                .await?
        }
        ReadScope::OwnedBy(owner) => {
            sqlx::query(&format!(
                "{SELECT_REPORT} WHERE er.user_id = ? ORDER BY er.created_at DESC"
            ))
            .bind(&owner.0)
            .fetch_all(conn)
            .await?
        }
    };

    rows.iter().map(row_to_report).collect()
}

/// Writes the editable fields. The draft guard in the WHERE clause backs up
/// the in-transaction status check.
pub async fn update_fields(
    conn: &mut SqliteConnection,
    report: &ExpenseReport,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE expense_reports
         SET title = ?, trip_purpose = ?, trip_start_date = ?, trip_end_date = ?, updated_at = ?
         WHERE id = ? AND status = 'draft'",
    )
    .bind(&report.title)
    .bind(&report.trip_purpose)
    .bind(encode_date(report.trip_start_date))
    .bind(encode_date(report.trip_end_date))
    .bind(report.updated_at.to_rfc3339())
    .bind(&report.id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Persists a status transition along with the per-action timestamp fields.
pub async fn apply_transition(
    conn: &mut SqliteConnection,
    report: &ExpenseReport,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE expense_reports
         SET status = ?, submitted_at = ?, approved_at = ?, approved_by = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(report.status.as_str())
    .bind(report.submitted_at.map(|dt| dt.to_rfc3339()))
    .bind(report.approved_at.map(|dt| dt.to_rfc3339()))
    .bind(report.approved_by.as_ref().map(|id| id.0.clone()))
    .bind(report.updated_at.to_rfc3339())
    .bind(&report.id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_total(
    conn: &mut SqliteConnection,
    id: &ReportId,
    total: Decimal,
    updated_at: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result =
        sqlx::query("UPDATE expense_reports SET total_amount = ?, updated_at = ? WHERE id = ?")
            .bind(total.to_string())
            .bind(updated_at.to_rfc3339())
            .bind(&id.0)
            .execute(conn)
            .await?;

    Ok(result.rows_affected())
}

/// Hard delete, draft-only. Items follow via ON DELETE CASCADE.
pub async fn delete_draft(
    conn: &mut SqliteConnection,
    id: &ReportId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM expense_reports WHERE id = ? AND status = 'draft'")
        .bind(&id.0)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
