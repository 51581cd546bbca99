pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod services;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::RepositoryError;
pub use services::{
    ItemLedger, ReportLifecycle, ServiceError, SummaryReporting, UserDirectory,
};
