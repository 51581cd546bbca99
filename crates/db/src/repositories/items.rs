use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};

use tripledger_core::domain::item::{ExpenseCategory, ExpenseItem, ItemId};
use tripledger_core::domain::report::ReportId;

use super::{decode_amount, decode_date, decode_datetime, encode_date, RepositoryError};

pub(crate) fn parse_category(s: &str) -> Result<ExpenseCategory, RepositoryError> {
    match s {
        "transportation" => Ok(ExpenseCategory::Transportation),
        "accommodation" => Ok(ExpenseCategory::Accommodation),
        "meal" => Ok(ExpenseCategory::Meal),
        "other" => Ok(ExpenseCategory::Other),
        other => Err(RepositoryError::Decode(format!("invalid expense category: `{other}`"))),
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<ExpenseItem, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let report_id: String =
        row.try_get("expense_report_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let receipt_url: Option<String> =
        row.try_get("receipt_url").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expense_date: String =
        row.try_get("expense_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ExpenseItem {
        id: ItemId(id),
        report_id: ReportId(report_id),
        category: parse_category(&category)?,
        description,
        amount: decode_amount("amount", &amount)?,
        receipt_url,
        expense_date: decode_date("expense_date", &expense_date)?,
        created_at: decode_datetime("created_at", &created_at)?,
        updated_at: decode_datetime("updated_at", &updated_at)?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    item: &ExpenseItem,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO expense_items (id, expense_report_id, category, description, amount,
                                    receipt_url, expense_date, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&item.id.0)
    .bind(&item.report_id.0)
    .bind(item.category.as_str())
    .bind(&item.description)
    .bind(item.amount.to_string())
    .bind(&item.receipt_url)
    .bind(encode_date(item.expense_date))
    .bind(item.created_at.to_rfc3339())
    .bind(item.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update(
    conn: &mut SqliteConnection,
    item: &ExpenseItem,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE expense_items
         SET category = ?, description = ?, amount = ?, receipt_url = ?, expense_date = ?,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(item.category.as_str())
    .bind(&item.description)
    .bind(item.amount.to_string())
    .bind(&item.receipt_url)
    .bind(encode_date(item.expense_date))
    .bind(item.updated_at.to_rfc3339())
    .bind(&item.id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, id: &ItemId) -> Result<u64, RepositoryError> {
    let result =
        sqlx::query("DELETE FROM expense_items WHERE id = ?").bind(&id.0).execute(conn).await?;

    Ok(result.rows_affected())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: &ItemId,
) -> Result<Option<ExpenseItem>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, expense_report_id, category, description, amount, receipt_url,
                expense_date, created_at, updated_at
         FROM expense_items WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_item(r)?)),
        None => Ok(None),
    }
}

pub async fn list_for_report(
    conn: &mut SqliteConnection,
    report_id: &ReportId,
) -> Result<Vec<ExpenseItem>, RepositoryError> {
    let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
        "SELECT id, expense_report_id, category, description, amount, receipt_url,
                expense_date, created_at, updated_at
         FROM expense_items
         WHERE expense_report_id = ?
         ORDER BY expense_date DESC, created_at DESC",
    )
    .bind(&report_id.0)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_item).collect()
}

/// Item count for the submit guard. Must be read inside the same transaction
/// that flips the status, so a concurrent item delete cannot slip between
/// the check and the write.
pub async fn count_for_report(
    conn: &mut SqliteConnection,
    report_id: &ReportId,
) -> Result<i64, RepositoryError> {
    let row =
        sqlx::query("SELECT COUNT(*) AS count FROM expense_items WHERE expense_report_id = ?")
            .bind(&report_id.0)
            .fetch_one(conn)
            .await?;

    row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))
}

/// Category/amount pairs across all reports, with each parent report's
/// creation time, for the cross-report summary.
pub async fn list_category_amounts(
    conn: &mut SqliteConnection,
) -> Result<Vec<(ExpenseCategory, Decimal, DateTime<Utc>)>, RepositoryError> {
    let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
        "SELECT ei.category, ei.amount, er.created_at AS report_created_at
         FROM expense_items ei
         JOIN expense_reports er ON ei.expense_report_id = er.id",
    )
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            let category: String =
                row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let amount: String =
                row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let created_at: String = row
                .try_get("report_created_at")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;

            Ok((
                parse_category(&category)?,
                decode_amount("amount", &amount)?,
                decode_datetime("report_created_at", &created_at)?,
            ))
        })
        .collect()
}
