use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

pub mod history;
pub mod items;
pub mod reports;
pub mod users;

pub use history::{ActivityRecord, PendingHistoryEntry};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

pub(crate) fn decode_field<T: std::str::FromStr>(
    field: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    raw.parse::<T>()
        .map_err(|_| RepositoryError::Decode(format!("invalid {field}: `{raw}`")))
}

pub(crate) fn decode_datetime(field: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RepositoryError::Decode(format!("invalid {field}: `{raw}`")))
}

pub(crate) fn decode_date(field: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    decode_field::<NaiveDate>(field, raw)
}

pub(crate) fn decode_amount(field: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    decode_field::<Decimal>(field, raw)
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
