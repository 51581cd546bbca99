use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::report::ReportId;
use crate::errors::DomainError;

pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Transportation,
    Accommodation,
    Meal,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transportation => "transportation",
            Self::Accommodation => "accommodation",
            Self::Meal => "meal",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chargeable expense, exclusively owned by one report and mutable
/// only while that report is in draft.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseItem {
    pub id: ItemId,
    pub report_id: ReportId,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: Decimal,
    pub receipt_url: Option<String>,
    pub expense_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewItem {
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: Decimal,
    pub receipt_url: Option<String>,
    pub expense_date: NaiveDate,
}

impl NewItem {
    pub fn validate(&self, today: NaiveDate) -> Result<(), DomainError> {
        validate_amount(self.amount)?;
        validate_expense_date(self.expense_date, today)?;
        validate_description(&self.description)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ItemPatch {
    pub category: Option<ExpenseCategory>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub receipt_url: Option<String>,
    pub expense_date: Option<NaiveDate>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.receipt_url.is_none()
            && self.expense_date.is_none()
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), DomainError> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(expense_date) = self.expense_date {
            validate_expense_date(expense_date, today)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, item: &mut ExpenseItem) {
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(amount) = self.amount {
            item.amount = amount;
        }
        if let Some(receipt_url) = &self.receipt_url {
            item.receipt_url = Some(receipt_url.clone());
        }
        if let Some(expense_date) = self.expense_date {
            item.expense_date = expense_date;
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::InvalidAmount);
    }
    Ok(())
}

fn validate_expense_date(expense_date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if expense_date > today {
        return Err(DomainError::InvalidDate);
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), DomainError> {
    let trimmed = description.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::InvalidDescription);
    }
    Ok(())
}

/// Recompute-on-write: the report total is always this sum, evaluated over
/// the item set read inside the mutating transaction.
pub fn total_of(items: &[ExpenseItem]) -> Decimal {
    items.iter().map(|item| item.amount).sum()
}

/// Per-category totals for a single report's items.
pub fn summarize_by_category(items: &[ExpenseItem]) -> BTreeMap<ExpenseCategory, Decimal> {
    let mut summary = BTreeMap::new();
    for item in items {
        *summary.entry(item.category).or_insert(Decimal::ZERO) += item.amount;
    }
    summary
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{
        summarize_by_category, total_of, ExpenseCategory, ExpenseItem, ItemId, ItemPatch, NewItem,
    };
    use crate::domain::report::ReportId;
    use crate::errors::DomainError;

    fn item(category: ExpenseCategory, amount: i64) -> ExpenseItem {
        let now = Utc::now();
        ExpenseItem {
            id: ItemId("item-1".to_string()),
            report_id: ReportId("rep-1".to_string()),
            category,
            description: "taxi to the airport".to_string(),
            amount: Decimal::from(amount),
            receipt_url: None,
            expense_date: NaiveDate::from_ymd_opt(2024, 1, 16).expect("date"),
            created_at: now,
            updated_at: now,
        }
    }

    fn new_item(amount: i64) -> NewItem {
        NewItem {
            category: ExpenseCategory::Meal,
            description: "team dinner".to_string(),
            amount: Decimal::from(amount),
            receipt_url: None,
            expense_date: NaiveDate::from_ymd_opt(2024, 1, 16).expect("date"),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).expect("date")
    }

    #[test]
    fn amount_must_be_positive() {
        let mut zero = new_item(0);
        zero.amount = Decimal::ZERO;
        assert!(matches!(zero.validate(today()), Err(DomainError::InvalidAmount)));

        let negative = new_item(-5);
        assert!(matches!(negative.validate(today()), Err(DomainError::InvalidAmount)));

        assert!(new_item(1000).validate(today()).is_ok());
    }

    #[test]
    fn expense_date_cannot_be_in_the_future() {
        let mut future = new_item(100);
        future.expense_date = NaiveDate::from_ymd_opt(2024, 2, 2).expect("date");
        assert!(matches!(future.validate(today()), Err(DomainError::InvalidDate)));

        let mut on_the_day = new_item(100);
        on_the_day.expense_date = today();
        assert!(on_the_day.validate(today()).is_ok());
    }

    #[test]
    fn description_bounds_are_enforced() {
        let mut blank = new_item(100);
        blank.description = "   ".to_string();
        assert!(matches!(blank.validate(today()), Err(DomainError::InvalidDescription)));

        let mut oversized = new_item(100);
        oversized.description = "x".repeat(501);
        assert!(matches!(oversized.validate(today()), Err(DomainError::InvalidDescription)));

        let mut at_limit = new_item(100);
        at_limit.description = "x".repeat(500);
        assert!(at_limit.validate(today()).is_ok());
    }

    #[test]
    fn patch_validates_only_provided_fields() {
        let empty = ItemPatch::default();
        assert!(empty.is_empty());
        assert!(empty.validate(today()).is_ok());

        let bad_amount = ItemPatch { amount: Some(Decimal::ZERO), ..ItemPatch::default() };
        assert!(matches!(bad_amount.validate(today()), Err(DomainError::InvalidAmount)));
    }

    #[test]
    fn total_is_the_sum_of_item_amounts() {
        let items = vec![
            item(ExpenseCategory::Meal, 1000),
            item(ExpenseCategory::Transportation, 450),
            item(ExpenseCategory::Meal, 250),
        ];
        assert_eq!(total_of(&items), Decimal::from(1700));
        assert_eq!(total_of(&[]), Decimal::ZERO);
    }

    #[test]
    fn category_summary_groups_amounts() {
        let items = vec![
            item(ExpenseCategory::Meal, 1000),
            item(ExpenseCategory::Transportation, 450),
            item(ExpenseCategory::Meal, 250),
        ];
        let summary = summarize_by_category(&items);
        assert_eq!(summary.get(&ExpenseCategory::Meal), Some(&Decimal::from(1250)));
        assert_eq!(summary.get(&ExpenseCategory::Transportation), Some(&Decimal::from(450)));
        assert_eq!(summary.get(&ExpenseCategory::Accommodation), None);
    }
}
