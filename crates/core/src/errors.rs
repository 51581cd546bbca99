use thiserror::Error;

use crate::domain::report::ReportStatus;

/// Closed taxonomy of business-rule failures. These propagate unchanged to
/// the boundary layer, which owns the mapping to transport responses; nothing
/// in this workspace knows about HTTP status codes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("entity not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("cannot {action} a report in status `{status}`")]
    InvalidStatus { status: ReportStatus, action: &'static str },
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("expense date must not be in the future")]
    InvalidDate,
    #[error("trip end date must not precede trip start date")]
    InvalidDates,
    #[error("description must be non-empty and at most 500 characters")]
    InvalidDescription,
    #[error("cannot submit a report without expense items")]
    NoItems,
    #[error("rejection requires a non-empty comment")]
    InvalidComment,
    #[error("a user with email `{0}` already exists")]
    DuplicateEmail(String),
    #[error("update affected no rows")]
    UpdateFailed,
    #[error("delete affected no rows")]
    DeleteFailed,
}

#[cfg(test)]
mod tests {
    use super::DomainError;
    use crate::domain::report::ReportStatus;

    #[test]
    fn invalid_status_message_names_status_and_action() {
        let error =
            DomainError::InvalidStatus { status: ReportStatus::Submitted, action: "edit" };
        assert_eq!(error.to_string(), "cannot edit a report in status `submitted`");
    }
}
