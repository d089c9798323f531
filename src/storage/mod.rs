//! Store traits the engine is written against, plus the bundled backends.
//!
//! The engine never talks to a database directly; it consumes these
//! in-process ports so the services stay unit-testable.

pub mod json_backend;
pub mod memory;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::Result;
use crate::ledger::{Budget, BudgetPeriod, BudgetScope, CategoryBudget, RolloverEntry, Transaction};

/// Read/write access to budget rows.
pub trait BudgetStore: Send + Sync {
    fn insert(&self, budget: Budget) -> Result<()>;

    /// Fails with `BudgetNotFound` for unknown ids.
    fn get(&self, id: Uuid) -> Result<Budget>;

    /// All budgets in a scope, ordered by period start.
    fn find_scope(&self, scope: &BudgetScope) -> Result<Vec<Budget>>;

    /// The most recent budget in a scope, by period end.
    fn latest_in_scope(&self, scope: &BudgetScope) -> Result<Option<Budget>>;

    /// The budget in a scope whose period contains `date`.
    fn find_covering(&self, scope: &BudgetScope, date: NaiveDate) -> Result<Option<Budget>>;

    /// Budgets in the same scope with periods strictly after the given
    /// budget's, ordered by period start.
    fn subsequent(&self, budget: &Budget) -> Result<Vec<Budget>>;

    /// Every distinct scope known to the store.
    fn scopes(&self) -> Result<Vec<BudgetScope>>;

    /// Sets the opening carry. The caller passes the version it read;
    /// a concurrent mutation surfaces as `VersionConflict`.
    fn update_opening_rollover(
        &self,
        id: Uuid,
        expected_version: u64,
        opening_rollover: f64,
    ) -> Result<Budget>;

    /// Sets the funded amount, same version discipline as above.
    fn update_amount(&self, id: Uuid, expected_version: u64, amount: f64) -> Result<Budget>;

    /// Toggles the category sub-budget flags.
    fn update_category_flags(
        &self,
        id: Uuid,
        expected_version: u64,
        enable_category_budget: bool,
        is_auto_calculated: bool,
    ) -> Result<Budget>;
}

/// Read-only access to expense transactions. The two queries mirror the
/// two disjoint charge paths and are never folded into one.
pub trait TransactionStore: Send + Sync {
    /// Expenses wholly assigned to the budget, dated within the period,
    /// optionally narrowed to one category.
    fn direct_expenses(
        &self,
        budget_id: Uuid,
        period: &BudgetPeriod,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>>;

    /// Split expenses whose allocation list contains the budget, dated
    /// within the period, optionally narrowed to one category.
    fn split_expenses(
        &self,
        budget_id: Uuid,
        period: &BudgetPeriod,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>>;
}

/// Closure history, keyed by (budget, period label).
pub trait HistoryStore: Send + Sync {
    /// Inserts the entry, replacing any previous entry for the same
    /// budget and period.
    fn upsert(&self, entry: RolloverEntry) -> Result<()>;

    /// Entries for one budget, newest period first.
    fn for_budget(&self, budget_id: Uuid) -> Result<Vec<RolloverEntry>>;
}

/// Category sub-budget rows under one parent budget.
pub trait CategoryBudgetStore: Send + Sync {
    fn insert(&self, category_budget: CategoryBudget) -> Result<()>;
    fn get(&self, id: Uuid) -> Result<CategoryBudget>;
    fn for_budget(&self, budget_id: Uuid) -> Result<Vec<CategoryBudget>>;
    fn update_amount(&self, id: Uuid, amount: f64) -> Result<CategoryBudget>;
    fn update_spent(&self, id: Uuid, spent: f64) -> Result<()>;
    fn remove(&self, id: Uuid) -> Result<CategoryBudget>;
    /// Removes every row under the budget, returning how many went away.
    fn remove_for_budget(&self, budget_id: Uuid) -> Result<usize>;
}
