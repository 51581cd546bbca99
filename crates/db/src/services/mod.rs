use thiserror::Error;

use tripledger_core::errors::DomainError;

use crate::repositories::RepositoryError;

pub mod ledger;
pub mod lifecycle;
pub mod reporting;
pub mod users;

pub use ledger::ItemLedger;
pub use lifecycle::ReportLifecycle;
pub use reporting::{StatusBucket, SummaryReport, SummaryReporting, SummaryWindow};
pub use users::UserDirectory;

/// Callers can tell a business-rule rejection apart from a persistence
/// failure: the former is terminal for the request, the latter is the
/// system's fault.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(error: sqlx::Error) -> Self {
        Self::Persistence(RepositoryError::Database(error))
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
