pub mod authz;
pub mod config;
pub mod domain;
pub mod errors;

pub use authz::ReadScope;
pub use domain::history::{ApprovalHistoryEntry, HistoryAction, HistoryEntryId};
pub use domain::item::{ExpenseCategory, ExpenseItem, ItemId, ItemPatch, NewItem};
pub use domain::report::{
    ExpenseReport, LifecycleAction, NewReport, ReportId, ReportPatch, ReportStatus,
};
pub use domain::user::{Actor, NewUser, Role, User, UserId, UserPatch};
pub use errors::DomainError;
