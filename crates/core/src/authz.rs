//! Authorization gate: the only module that inspects [`Role`]. Pure
//! decision functions, evaluated fresh on every call since both role and
//! report status can change between calls.

use crate::domain::report::ExpenseReport;
use crate::domain::user::{Actor, Role, UserId};

/// Query-level visibility filter for report reads. Applied inside the SQL
/// query rather than after the fact, so an employee cannot learn that a
/// report belonging to someone else exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadScope {
    All,
    OwnedBy(UserId),
}

pub fn read_scope(actor: &Actor) -> ReadScope {
    match actor.role {
        Role::Accounting => ReadScope::All,
        Role::Employee => ReadScope::OwnedBy(actor.id.clone()),
    }
}

pub fn is_owner(report: &ExpenseReport, actor: &Actor) -> bool {
    report.owner_id == actor.id
}

pub fn can_access_report(report: &ExpenseReport, actor: &Actor) -> bool {
    matches!(actor.role, Role::Accounting) || is_owner(report, actor)
}

pub fn can_modify_report(report: &ExpenseReport, actor: &Actor) -> bool {
    can_access_report(report, actor) && report.status.is_editable()
}

pub fn can_submit(report: &ExpenseReport, actor: &Actor) -> bool {
    is_owner(report, actor) && report.status.is_editable()
}

pub fn can_approve(actor: &Actor) -> bool {
    matches!(actor.role, Role::Accounting)
}

pub fn can_reject(actor: &Actor) -> bool {
    matches!(actor.role, Role::Accounting)
}

pub fn can_mark_paid(actor: &Actor) -> bool {
    matches!(actor.role, Role::Accounting)
}

/// Role changes and edits to other users' profiles are reserved for
/// accounting.
pub fn can_manage_users(actor: &Actor) -> bool {
    matches!(actor.role, Role::Accounting)
}

/// The cross-report summary dashboard is an accounting view.
pub fn can_view_summary(actor: &Actor) -> bool {
    matches!(actor.role, Role::Accounting)
}
