use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use tripledger_core::domain::history::{ApprovalHistoryEntry, HistoryAction, HistoryEntryId};
use tripledger_core::domain::report::ReportId;
use tripledger_core::domain::user::UserId;

use super::{decode_datetime, RepositoryError};

pub(crate) fn parse_action(s: &str) -> Result<HistoryAction, RepositoryError> {
    match s {
        "submitted" => Ok(HistoryAction::Submitted),
        "approved" => Ok(HistoryAction::Approved),
        "rejected" => Ok(HistoryAction::Rejected),
        "paid" => Ok(HistoryAction::Paid),
        other => Err(RepositoryError::Decode(format!("invalid history action: `{other}`"))),
    }
}

/// Write model for one audit row. Display fields come back on read via the
/// user join; the insert carries only the facts of the transition.
#[derive(Clone, Debug)]
pub struct PendingHistoryEntry {
    pub id: HistoryEntryId,
    pub report_id: ReportId,
    pub action: HistoryAction,
    pub actor_id: UserId,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only: no update or delete statement exists for this table.
pub async fn append(
    conn: &mut SqliteConnection,
    entry: &PendingHistoryEntry,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO approval_history (id, expense_report_id, action, user_id, comment, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id.0)
    .bind(&entry.report_id.0)
    .bind(entry.action.as_str())
    .bind(&entry.actor_id.0)
    .bind(&entry.comment)
    .bind(entry.created_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalHistoryEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let report_id: String =
        row.try_get("expense_report_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_name: String =
        row.try_get("actor_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_email: String =
        row.try_get("actor_email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalHistoryEntry {
        id: HistoryEntryId(id),
        report_id: ReportId(report_id),
        action: parse_action(&action)?,
        actor_id: UserId(actor_id),
        actor_name,
        actor_email,
        comment,
        created_at: decode_datetime("created_at", &created_at)?,
    })
}

pub async fn list_for_report(
    conn: &mut SqliteConnection,
    report_id: &ReportId,
) -> Result<Vec<ApprovalHistoryEntry>, RepositoryError> {
    let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
        "SELECT ah.id, ah.expense_report_id, ah.action, ah.user_id, ah.comment, ah.created_at,
                u.name AS actor_name, u.email AS actor_email
         FROM approval_history ah
         JOIN users u ON ah.user_id = u.id
         WHERE ah.expense_report_id = ?
         ORDER BY ah.created_at DESC, ah.id DESC",
    )
    .bind(&report_id.0)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_entry).collect()
}

/// One line of the cross-report activity feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub report_id: ReportId,
    pub report_title: String,
    pub action: HistoryAction,
    pub actor_name: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn recent(
    conn: &mut SqliteConnection,
    limit: u32,
) -> Result<Vec<ActivityRecord>, RepositoryError> {
    let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
        "SELECT ah.expense_report_id, ah.action, ah.comment, ah.created_at,
                u.name AS actor_name, er.title AS report_title
         FROM approval_history ah
         JOIN users u ON ah.user_id = u.id
         JOIN expense_reports er ON ah.expense_report_id = er.id
         ORDER BY ah.created_at DESC, ah.id DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            let report_id: String = row
                .try_get("expense_report_id")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let report_title: String =
                row.try_get("report_title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let action: String =
                row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let actor_name: String =
                row.try_get("actor_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let comment: Option<String> =
                row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let created_at: String =
                row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

            Ok(ActivityRecord {
                report_id: ReportId(report_id),
                report_title,
                action: parse_action(&action)?,
                actor_name,
                comment,
                created_at: decode_datetime("created_at", &created_at)?,
            })
        })
        .collect()
}
