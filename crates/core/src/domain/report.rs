use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Paid,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }

    /// Reports accept field edits and item mutations only while in draft.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// The lifecycle table: one exhaustive lookup over (current status,
    /// action). `rejected` is terminal here; the product flow implies
    /// resubmission after rejection, but no rejected→draft transition is
    /// defined, so this engine does not invent one.
    pub fn transition(self, action: LifecycleAction) -> Result<ReportStatus, DomainError> {
        match (self, action) {
            (Self::Draft, LifecycleAction::Submit) => Ok(Self::Submitted),
            (Self::Submitted, LifecycleAction::Approve) => Ok(Self::Approved),
            (Self::Submitted, LifecycleAction::Reject) => Ok(Self::Rejected),
            (Self::Approved, LifecycleAction::MarkPaid) => Ok(Self::Paid),
            (status, action) => {
                Err(DomainError::InvalidStatus { status, action: action.as_str() })
            }
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status-changing actions. Field edits and deletion are draft-only
/// operations, not lifecycle transitions, and are guarded separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Submit,
    Approve,
    Reject,
    MarkPaid,
}

impl LifecycleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::MarkPaid => "mark paid",
        }
    }
}

/// The central aggregate. `total_amount` is derived from the item set and is
/// only ever written by the ledger's recompute step; `owner_name`,
/// `owner_email`, and `approver_name` are display joins carried along with
/// every read.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseReport {
    pub id: ReportId,
    pub owner_id: UserId,
    pub title: String,
    pub trip_purpose: String,
    pub trip_start_date: NaiveDate,
    pub trip_end_date: NaiveDate,
    pub status: ReportStatus,
    pub total_amount: Decimal,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub owner_name: String,
    pub owner_email: String,
    pub approver_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewReport {
    pub title: String,
    pub trip_purpose: String,
    pub trip_start_date: NaiveDate,
    pub trip_end_date: NaiveDate,
}

impl NewReport {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_trip_dates(self.trip_start_date, self.trip_end_date)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReportPatch {
    pub title: Option<String>,
    pub trip_purpose: Option<String>,
    pub trip_start_date: Option<NaiveDate>,
    pub trip_end_date: Option<NaiveDate>,
}

impl ReportPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.trip_purpose.is_none()
            && self.trip_start_date.is_none()
            && self.trip_end_date.is_none()
    }

    /// Validates the dates that would result from applying this patch, so a
    /// patch moving only one end of the trip cannot invert the range.
    pub fn validate_against(&self, current: &ExpenseReport) -> Result<(), DomainError> {
        let start = self.trip_start_date.unwrap_or(current.trip_start_date);
        let end = self.trip_end_date.unwrap_or(current.trip_end_date);
        validate_trip_dates(start, end)
    }

    pub fn apply_to(&self, report: &mut ExpenseReport) {
        if let Some(title) = &self.title {
            report.title = title.clone();
        }
        if let Some(trip_purpose) = &self.trip_purpose {
            report.trip_purpose = trip_purpose.clone();
        }
        if let Some(start) = self.trip_start_date {
            report.trip_start_date = start;
        }
        if let Some(end) = self.trip_end_date {
            report.trip_end_date = end;
        }
    }
}

pub fn validate_trip_dates(start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
    if end < start {
        return Err(DomainError::InvalidDates);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{LifecycleAction, ReportStatus};
    use crate::errors::DomainError;

    #[test]
    fn draft_submits_to_submitted() {
        let next = ReportStatus::Draft.transition(LifecycleAction::Submit).expect("draft->submitted");
        assert_eq!(next, ReportStatus::Submitted);
    }

    #[test]
    fn submitted_resolves_to_approved_or_rejected() {
        assert_eq!(
            ReportStatus::Submitted.transition(LifecycleAction::Approve).expect("approve"),
            ReportStatus::Approved,
        );
        assert_eq!(
            ReportStatus::Submitted.transition(LifecycleAction::Reject).expect("reject"),
            ReportStatus::Rejected,
        );
    }

    #[test]
    fn approved_can_be_paid() {
        assert_eq!(
            ReportStatus::Approved.transition(LifecycleAction::MarkPaid).expect("pay"),
            ReportStatus::Paid,
        );
    }

    #[test]
    fn draft_cannot_skip_to_approved() {
        let error = ReportStatus::Draft
            .transition(LifecycleAction::Approve)
            .expect_err("draft->approved must fail");
        assert!(matches!(
            error,
            DomainError::InvalidStatus { status: ReportStatus::Draft, .. }
        ));
    }

    #[test]
    fn paid_is_terminal() {
        for action in [
            LifecycleAction::Submit,
            LifecycleAction::Approve,
            LifecycleAction::Reject,
            LifecycleAction::MarkPaid,
        ] {
            assert!(ReportStatus::Paid.transition(action).is_err());
        }
    }

    #[test]
    fn rejected_is_terminal() {
        for action in [
            LifecycleAction::Submit,
            LifecycleAction::Approve,
            LifecycleAction::Reject,
            LifecycleAction::MarkPaid,
        ] {
            assert!(ReportStatus::Rejected.transition(action).is_err());
        }
    }

    #[test]
    fn trip_dates_must_be_ordered() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 17).expect("date");
        let end = NaiveDate::from_ymd_opt(2024, 1, 15).expect("date");
        assert!(matches!(
            super::validate_trip_dates(start, end),
            Err(DomainError::InvalidDates)
        ));
        assert!(super::validate_trip_dates(end, start).is_ok());
        assert!(super::validate_trip_dates(start, start).is_ok());
    }

    #[test]
    fn status_serializes_in_wire_spelling() {
        let json = serde_json::to_string(&ReportStatus::Submitted).expect("serialize");
        assert_eq!(json, "\"submitted\"");
    }
}
