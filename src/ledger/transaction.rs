use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budget::BudgetOwner;
use crate::errors::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Income,
    Expense,
}

/// One budget's share of a split expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetShare {
    pub budget_id: Uuid,
    pub amount: f64,
}

/// How a transaction is charged against budgets. A transaction is either
/// wholly assigned to one budget or split across several, never both.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum BudgetAssignment {
    #[default]
    Unassigned,
    Direct(Uuid),
    Split(Vec<BudgetShare>),
}

/// Expense or income record, consumed read-only by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: BudgetOwner,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub assignment: BudgetAssignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(
        owner: BudgetOwner,
        account_id: Uuid,
        category_id: Option<Uuid>,
        kind: TransactionKind,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            account_id,
            category_id,
            kind,
            amount,
            date,
            assignment: BudgetAssignment::Unassigned,
            description: None,
        }
    }

    pub fn assigned_to(mut self, budget_id: Uuid) -> Self {
        self.assignment = BudgetAssignment::Direct(budget_id);
        self
    }

    /// Splits the expense across several budgets. The shares may not add
    /// up to more than the transaction amount.
    pub fn split_across(mut self, shares: Vec<BudgetShare>) -> Result<Self> {
        let total: f64 = shares.iter().map(|share| share.amount).sum();
        if total > self.amount {
            return Err(EngineError::AllocationExceedsTotal(format!(
                "split shares {total} exceed transaction amount {}",
                self.amount
            )));
        }
        self.assignment = BudgetAssignment::Split(shares);
        Ok(self)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Returns this transaction's share for the given budget, if it is a
    /// split expense allocating to it.
    pub fn split_share_for(&self, budget_id: Uuid) -> Option<f64> {
        match &self.assignment {
            BudgetAssignment::Split(shares) => shares
                .iter()
                .find(|share| share.budget_id == budget_id)
                .map(|share| share.amount),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(amount: f64) -> Transaction {
        Transaction::new(
            BudgetOwner::User(Uuid::new_v4()),
            Uuid::new_v4(),
            None,
            TransactionKind::Expense,
            amount,
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        )
    }

    #[test]
    fn split_rejects_shares_over_transaction_amount() {
        let shares = vec![
            BudgetShare {
                budget_id: Uuid::new_v4(),
                amount: 30.0,
            },
            BudgetShare {
                budget_id: Uuid::new_v4(),
                amount: 30.0,
            },
        ];
        let err = expense(52.0).split_across(shares).unwrap_err();
        assert!(matches!(err, EngineError::AllocationExceedsTotal(_)));
    }

    #[test]
    fn split_share_lookup_ignores_other_budgets() {
        let mine = Uuid::new_v4();
        let txn = expense(52.0)
            .split_across(vec![
                BudgetShare {
                    budget_id: mine,
                    amount: 26.0,
                },
                BudgetShare {
                    budget_id: Uuid::new_v4(),
                    amount: 26.0,
                },
            ])
            .unwrap();
        assert_eq!(txn.split_share_for(mine), Some(26.0));
        assert_eq!(txn.split_share_for(Uuid::new_v4()), None);
    }
}
