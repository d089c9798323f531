//! Spend aggregation across direct and split expense transactions.

use uuid::Uuid;

use crate::errors::Result;
use crate::ledger::Budget;
use crate::storage::TransactionStore;

/// Computes how much of a budget has been used.
///
/// Two disjoint charge paths feed a budget: expenses wholly assigned to
/// it, and split expenses allocating a share to it. They are summed from
/// two separate queries; collapsing them into one filter is how the
/// split path historically got lost.
pub struct SpendAggregator<'a> {
    transactions: &'a dyn TransactionStore,
}

impl<'a> SpendAggregator<'a> {
    pub fn new(transactions: &'a dyn TransactionStore) -> Self {
        Self { transactions }
    }

    /// Total spend charged to the budget within its period.
    pub fn spent_amount(&self, budget: &Budget) -> Result<f64> {
        self.spent_filtered(budget, budget.category_id)
    }

    /// Spend charged to the budget for a single category, used to refresh
    /// category sub-budget rows.
    pub fn spent_for_category(&self, budget: &Budget, category_id: Uuid) -> Result<f64> {
        self.spent_filtered(budget, Some(category_id))
    }

    fn spent_filtered(&self, budget: &Budget, category_id: Option<Uuid>) -> Result<f64> {
        let direct: f64 = self
            .transactions
            .direct_expenses(budget.id, &budget.period, category_id)?
            .iter()
            .map(|txn| txn.amount)
            .sum();

        let split: f64 = self
            .transactions
            .split_expenses(budget.id, &budget.period, category_id)?
            .iter()
            .filter_map(|txn| txn.split_share_for(budget.id))
            .sum();

        Ok(direct + split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{
        Budget, BudgetOwner, BudgetShare, PeriodCalculator, RefreshDay, Transaction,
        TransactionKind,
    };
    use crate::storage::memory::MemoryStore;
    use crate::storage::BudgetStore;
    use chrono::NaiveDate;

    fn setup() -> (MemoryStore, Budget, Budget) {
        let store = MemoryStore::new();
        let owner = BudgetOwner::User(Uuid::new_v4());
        let account = Uuid::new_v4();
        let refresh_day = RefreshDay::new(1).unwrap();
        let period = PeriodCalculator::period_for(2024, 6, refresh_day).unwrap();
        let first = Budget::new(owner, account, None, refresh_day, period, 2000.0);
        let second = Budget::new(owner, Uuid::new_v4(), None, refresh_day, period, 3000.0);
        BudgetStore::insert(&store, first.clone()).unwrap();
        BudgetStore::insert(&store, second.clone()).unwrap();
        (store, first, second)
    }

    fn expense(owner: BudgetOwner, account: Uuid, amount: f64, day: u32) -> Transaction {
        Transaction::new(
            owner,
            account,
            None,
            TransactionKind::Expense,
            amount,
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        )
    }

    #[test]
    fn merges_direct_and_split_paths() {
        let (store, first, second) = setup();
        let owner = first.owner;
        let account = first.account_id;

        store
            .add_transaction(expense(owner, account, 100.0, 10).assigned_to(first.id))
            .unwrap();
        store
            .add_transaction(
                expense(owner, account, 52.0, 12)
                    .split_across(vec![
                        BudgetShare {
                            budget_id: first.id,
                            amount: 26.0,
                        },
                        BudgetShare {
                            budget_id: second.id,
                            amount: 26.0,
                        },
                    ])
                    .unwrap(),
            )
            .unwrap();

        let aggregator = SpendAggregator::new(&store);
        assert_eq!(aggregator.spent_amount(&first).unwrap(), 126.0);
        assert_eq!(aggregator.spent_amount(&second).unwrap(), 26.0);
    }

    #[test]
    fn ignores_income_and_out_of_period_expenses() {
        let (store, first, _) = setup();
        let owner = first.owner;
        let account = first.account_id;

        let mut income = expense(owner, account, 500.0, 10).assigned_to(first.id);
        income.kind = TransactionKind::Income;
        store.add_transaction(income).unwrap();

        let mut late = expense(owner, account, 75.0, 10).assigned_to(first.id);
        late.date = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        store.add_transaction(late).unwrap();

        let aggregator = SpendAggregator::new(&store);
        assert_eq!(aggregator.spent_amount(&first).unwrap(), 0.0);
    }

    #[test]
    fn category_budget_counts_only_matching_category() {
        let (store, mut first, _) = setup();
        let groceries = Uuid::new_v4();
        first.category_id = Some(groceries);
        let owner = first.owner;
        let account = first.account_id;

        let mut matching = expense(owner, account, 80.0, 5).assigned_to(first.id);
        matching.category_id = Some(groceries);
        store.add_transaction(matching).unwrap();

        let mut other = expense(owner, account, 40.0, 6).assigned_to(first.id);
        other.category_id = Some(Uuid::new_v4());
        store.add_transaction(other).unwrap();

        let aggregator = SpendAggregator::new(&store);
        assert_eq!(aggregator.spent_amount(&first).unwrap(), 80.0);
    }
}
