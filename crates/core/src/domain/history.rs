use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::report::{LifecycleAction, ReportId};
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntryId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Submitted,
    Approved,
    Rejected,
    Paid,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }
}

impl From<LifecycleAction> for HistoryAction {
    fn from(action: LifecycleAction) -> Self {
        match action {
            LifecycleAction::Submit => Self::Submitted,
            LifecycleAction::Approve => Self::Approved,
            LifecycleAction::Reject => Self::Rejected,
            LifecycleAction::MarkPaid => Self::Paid,
        }
    }
}

/// Append-only audit record of one lifecycle transition. No update or delete
/// path exists for these entries. `actor_name` and `actor_email` are display
/// joins filled in on read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalHistoryEntry {
    pub id: HistoryEntryId,
    pub report_id: ReportId,
    pub action: HistoryAction,
    pub actor_id: UserId,
    pub actor_name: String,
    pub actor_email: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::HistoryAction;
    use crate::domain::report::LifecycleAction;

    #[test]
    fn lifecycle_actions_map_to_history_actions() {
        assert_eq!(HistoryAction::from(LifecycleAction::Submit), HistoryAction::Submitted);
        assert_eq!(HistoryAction::from(LifecycleAction::Approve), HistoryAction::Approved);
        assert_eq!(HistoryAction::from(LifecycleAction::Reject), HistoryAction::Rejected);
        assert_eq!(HistoryAction::from(LifecycleAction::MarkPaid), HistoryAction::Paid);
    }
}
