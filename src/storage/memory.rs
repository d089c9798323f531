//! In-memory store used by tests and embedders, and as the working set
//! behind the JSON snapshot backend.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineError, Result};
use crate::ledger::{Budget, BudgetPeriod, BudgetScope, CategoryBudget, RolloverEntry, Transaction};
use crate::storage::{BudgetStore, CategoryBudgetStore, HistoryStore, TransactionStore};

/// Serializable snapshot of the whole book, used by the JSON backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub budgets: Vec<Budget>,
    pub category_budgets: Vec<CategoryBudget>,
    pub transactions: Vec<Transaction>,
    pub history: Vec<RolloverEntry>,
}

#[derive(Default)]
struct Book {
    budgets: HashMap<Uuid, Budget>,
    category_budgets: HashMap<Uuid, CategoryBudget>,
    transactions: Vec<Transaction>,
    history: Vec<RolloverEntry>,
}

/// Thread-safe in-memory implementation of all four store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Book>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: BookSnapshot) -> Self {
        let book = Book {
            budgets: snapshot
                .budgets
                .into_iter()
                .map(|budget| (budget.id, budget))
                .collect(),
            category_budgets: snapshot
                .category_budgets
                .into_iter()
                .map(|cb| (cb.id, cb))
                .collect(),
            transactions: snapshot.transactions,
            history: snapshot.history,
        };
        Self {
            inner: RwLock::new(book),
        }
    }

    pub fn snapshot(&self) -> Result<BookSnapshot> {
        let book = self.read()?;
        let mut budgets: Vec<Budget> = book.budgets.values().cloned().collect();
        budgets.sort_by_key(|budget| budget.period.start);
        let mut category_budgets: Vec<CategoryBudget> =
            book.category_budgets.values().cloned().collect();
        category_budgets.sort_by_key(|cb| cb.id);
        Ok(BookSnapshot {
            budgets,
            category_budgets,
            transactions: book.transactions.clone(),
            history: book.history.clone(),
        })
    }

    /// Transactions are owned by the surrounding app; these helpers stand
    /// in for its write path.
    pub fn add_transaction(&self, transaction: Transaction) -> Result<()> {
        self.write()?.transactions.push(transaction);
        Ok(())
    }

    pub fn remove_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let mut book = self.write()?;
        let position = book.transactions.iter().position(|txn| txn.id == id);
        Ok(position.map(|index| book.transactions.remove(index)))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Book>> {
        self.inner
            .read()
            .map_err(|_| EngineError::Storage("store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Book>> {
        self.inner
            .write()
            .map_err(|_| EngineError::Storage("store lock poisoned".into()))
    }

    fn update_budget<F>(&self, id: Uuid, expected_version: u64, apply: F) -> Result<Budget>
    where
        F: FnOnce(&mut Budget),
    {
        let mut book = self.write()?;
        let budget = book
            .budgets
            .get_mut(&id)
            .ok_or(EngineError::BudgetNotFound(id))?;
        if budget.version != expected_version {
            return Err(EngineError::VersionConflict(id));
        }
        apply(budget);
        budget.version += 1;
        Ok(budget.clone())
    }
}

impl BudgetStore for MemoryStore {
    fn insert(&self, budget: Budget) -> Result<()> {
        self.write()?.budgets.insert(budget.id, budget);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Budget> {
        self.read()?
            .budgets
            .get(&id)
            .cloned()
            .ok_or(EngineError::BudgetNotFound(id))
    }

    fn find_scope(&self, scope: &BudgetScope) -> Result<Vec<Budget>> {
        let book = self.read()?;
        let mut budgets: Vec<Budget> = book
            .budgets
            .values()
            .filter(|budget| budget.scope() == *scope)
            .cloned()
            .collect();
        budgets.sort_by_key(|budget| budget.period.start);
        Ok(budgets)
    }

    fn latest_in_scope(&self, scope: &BudgetScope) -> Result<Option<Budget>> {
        Ok(self
            .find_scope(scope)?
            .into_iter()
            .max_by_key(|budget| budget.period.end))
    }

    fn find_covering(&self, scope: &BudgetScope, date: NaiveDate) -> Result<Option<Budget>> {
        Ok(self
            .find_scope(scope)?
            .into_iter()
            .find(|budget| budget.period.contains(date)))
    }

    fn subsequent(&self, budget: &Budget) -> Result<Vec<Budget>> {
        Ok(self
            .find_scope(&budget.scope())?
            .into_iter()
            .filter(|candidate| candidate.period.start > budget.period.start)
            .collect())
    }

    fn scopes(&self) -> Result<Vec<BudgetScope>> {
        let book = self.read()?;
        let unique: HashSet<BudgetScope> =
            book.budgets.values().map(|budget| budget.scope()).collect();
        Ok(unique.into_iter().collect())
    }

    fn update_opening_rollover(
        &self,
        id: Uuid,
        expected_version: u64,
        opening_rollover: f64,
    ) -> Result<Budget> {
        self.update_budget(id, expected_version, |budget| {
            budget.opening_rollover = opening_rollover;
        })
    }

    fn update_amount(&self, id: Uuid, expected_version: u64, amount: f64) -> Result<Budget> {
        self.update_budget(id, expected_version, |budget| budget.amount = amount)
    }

    fn update_category_flags(
        &self,
        id: Uuid,
        expected_version: u64,
        enable_category_budget: bool,
        is_auto_calculated: bool,
    ) -> Result<Budget> {
        self.update_budget(id, expected_version, |budget| {
            budget.enable_category_budget = enable_category_budget;
            budget.is_auto_calculated = is_auto_calculated;
        })
    }
}

impl TransactionStore for MemoryStore {
    fn direct_expenses(
        &self,
        budget_id: Uuid,
        period: &BudgetPeriod,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        let book = self.read()?;
        Ok(book
            .transactions
            .iter()
            .filter(|txn| txn.is_expense() && period.contains(txn.date))
            .filter(|txn| {
                matches!(&txn.assignment, crate::ledger::BudgetAssignment::Direct(id) if *id == budget_id)
            })
            .filter(|txn| category_id.is_none() || txn.category_id == category_id)
            .cloned()
            .collect())
    }

    fn split_expenses(
        &self,
        budget_id: Uuid,
        period: &BudgetPeriod,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        let book = self.read()?;
        Ok(book
            .transactions
            .iter()
            .filter(|txn| txn.is_expense() && period.contains(txn.date))
            .filter(|txn| txn.split_share_for(budget_id).is_some())
            .filter(|txn| category_id.is_none() || txn.category_id == category_id)
            .cloned()
            .collect())
    }
}

impl HistoryStore for MemoryStore {
    fn upsert(&self, entry: RolloverEntry) -> Result<()> {
        let mut book = self.write()?;
        book.history
            .retain(|existing| !(existing.budget_id == entry.budget_id && existing.period == entry.period));
        book.history.push(entry);
        Ok(())
    }

    fn for_budget(&self, budget_id: Uuid) -> Result<Vec<RolloverEntry>> {
        let book = self.read()?;
        let mut entries: Vec<RolloverEntry> = book
            .history
            .iter()
            .filter(|entry| entry.budget_id == budget_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.period
                .cmp(&a.period)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(entries)
    }
}

impl CategoryBudgetStore for MemoryStore {
    fn insert(&self, category_budget: CategoryBudget) -> Result<()> {
        self.write()?
            .category_budgets
            .insert(category_budget.id, category_budget);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<CategoryBudget> {
        self.read()?
            .category_budgets
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::Validation(format!("category budget {id} not found")))
    }

    fn for_budget(&self, budget_id: Uuid) -> Result<Vec<CategoryBudget>> {
        let book = self.read()?;
        let mut rows: Vec<CategoryBudget> = book
            .category_budgets
            .values()
            .filter(|cb| cb.budget_id == budget_id)
            .cloned()
            .collect();
        rows.sort_by_key(|cb| cb.id);
        Ok(rows)
    }

    fn update_amount(&self, id: Uuid, amount: f64) -> Result<CategoryBudget> {
        let mut book = self.write()?;
        let row = book
            .category_budgets
            .get_mut(&id)
            .ok_or_else(|| EngineError::Validation(format!("category budget {id} not found")))?;
        row.amount = amount;
        Ok(row.clone())
    }

    fn update_spent(&self, id: Uuid, spent: f64) -> Result<()> {
        let mut book = self.write()?;
        let row = book
            .category_budgets
            .get_mut(&id)
            .ok_or_else(|| EngineError::Validation(format!("category budget {id} not found")))?;
        row.spent = spent;
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Result<CategoryBudget> {
        self.write()?
            .category_budgets
            .remove(&id)
            .ok_or_else(|| EngineError::Validation(format!("category budget {id} not found")))
    }

    fn remove_for_budget(&self, budget_id: Uuid) -> Result<usize> {
        let mut book = self.write()?;
        let before = book.category_budgets.len();
        book.category_budgets.retain(|_, cb| cb.budget_id != budget_id);
        Ok(before - book.category_budgets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BudgetOwner, PeriodCalculator, RefreshDay, RolloverEntry};
    use chrono::Utc;

    fn sample_budget() -> Budget {
        let refresh_day = RefreshDay::new(1).unwrap();
        let period = PeriodCalculator::period_for(2024, 6, refresh_day).unwrap();
        Budget::new(
            BudgetOwner::User(Uuid::new_v4()),
            Uuid::new_v4(),
            None,
            refresh_day,
            period,
            1000.0,
        )
        .with_rollover()
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let budget = sample_budget();
        let id = budget.id;
        BudgetStore::insert(&store, budget).unwrap();

        let updated = store.update_opening_rollover(id, 0, 50.0).unwrap();
        assert_eq!(updated.version, 1);

        let err = store.update_opening_rollover(id, 0, 75.0).unwrap_err();
        assert!(matches!(err, EngineError::VersionConflict(conflicted) if conflicted == id));
    }

    #[test]
    fn history_upsert_replaces_same_period() {
        let store = MemoryStore::new();
        let budget = sample_budget();
        let first = RolloverEntry::from_closure(&budget, 700.0, 300.0, Utc::now());
        let second = RolloverEntry::from_closure(&budget, 900.0, 100.0, Utc::now());
        store.upsert(first).unwrap();
        store.upsert(second).unwrap();

        let entries = HistoryStore::for_budget(&store, budget.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].spent_amount, 900.0);
    }

    #[test]
    fn covering_lookup_matches_period_bounds() {
        let store = MemoryStore::new();
        let budget = sample_budget();
        let scope = budget.scope();
        BudgetStore::insert(&store, budget).unwrap();

        let inside = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let outside = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert!(store.find_covering(&scope, inside).unwrap().is_some());
        assert!(store.find_covering(&scope, outside).unwrap().is_none());
    }
}
