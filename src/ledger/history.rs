use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budget::Budget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolloverKind {
    Surplus,
    Deficit,
}

/// Append-only record of one period closure, kept for audit and for
/// deriving the next period's opening balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverEntry {
    pub id: Uuid,
    pub budget_id: Uuid,
    /// Period label derived from the budget's end date, e.g. `2024-06`.
    pub period: String,
    /// Absolute value of the closing delta; the sign lives in `kind`.
    pub amount: f64,
    pub kind: RolloverKind,
    pub description: String,
    pub budget_amount: f64,
    pub spent_amount: f64,
    pub previous_rollover: f64,
    pub created_at: DateTime<Utc>,
}

impl RolloverEntry {
    /// Builds the closure record for a budget with the given spend and
    /// signed remaining balance.
    pub fn from_closure(
        budget: &Budget,
        spent: f64,
        remaining: f64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let period = budget.period.label();
        let kind = if remaining >= 0.0 {
            RolloverKind::Surplus
        } else {
            RolloverKind::Deficit
        };
        let description = match kind {
            RolloverKind::Surplus => format!("{period} surplus carried forward"),
            RolloverKind::Deficit => format!("{period} overspend carried forward"),
        };
        Self {
            id: Uuid::new_v4(),
            budget_id: budget.id,
            period,
            amount: remaining.abs(),
            kind,
            description,
            budget_amount: budget.amount,
            spent_amount: spent,
            previous_rollover: budget.opening_rollover,
            created_at: recorded_at,
        }
    }

    /// Signed closing delta reconstructed from amount and kind.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            RolloverKind::Surplus => self.amount,
            RolloverKind::Deficit => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BudgetOwner, BudgetPeriod, RefreshDay};
    use chrono::NaiveDate;

    fn closed_budget() -> Budget {
        let period = BudgetPeriod {
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        };
        Budget::new(
            BudgetOwner::User(Uuid::new_v4()),
            Uuid::new_v4(),
            None,
            RefreshDay::new(1).unwrap(),
            period,
            1000.0,
        )
        .with_rollover()
    }

    #[test]
    fn surplus_entry_keeps_absolute_amount() {
        let budget = closed_budget();
        let entry = RolloverEntry::from_closure(&budget, 700.0, 300.0, Utc::now());
        assert_eq!(entry.kind, RolloverKind::Surplus);
        assert_eq!(entry.amount, 300.0);
        assert_eq!(entry.signed_amount(), 300.0);
        assert_eq!(entry.period, "2024-06");
    }

    #[test]
    fn deficit_entry_flips_sign() {
        let budget = closed_budget();
        let entry = RolloverEntry::from_closure(&budget, 1100.0, -100.0, Utc::now());
        assert_eq!(entry.kind, RolloverKind::Deficit);
        assert_eq!(entry.amount, 100.0);
        assert_eq!(entry.signed_amount(), -100.0);
    }
}
