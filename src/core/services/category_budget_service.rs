//! Category sub-budget rules: validation against the parent amount and
//! auto-calculation of the parent from its categories.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::core::services::cycle_service::BudgetCycleService;
use crate::core::services::spend_service::SpendAggregator;
use crate::errors::{EngineError, Result};
use crate::ledger::{Budget, Category, CategoryBudget, CategoryKind};
use crate::storage::{BudgetStore, CategoryBudgetStore, HistoryStore, TransactionStore};
use crate::time::Clock;

pub struct CategoryBudgetService<'a> {
    budgets: &'a dyn BudgetStore,
    category_budgets: &'a dyn CategoryBudgetStore,
    transactions: &'a dyn TransactionStore,
    history: &'a dyn HistoryStore,
    clock: &'a dyn Clock,
    max_backfill_periods: usize,
}

impl<'a> CategoryBudgetService<'a> {
    pub fn new(
        budgets: &'a dyn BudgetStore,
        category_budgets: &'a dyn CategoryBudgetStore,
        transactions: &'a dyn TransactionStore,
        history: &'a dyn HistoryStore,
        clock: &'a dyn Clock,
        max_backfill_periods: usize,
    ) -> Self {
        Self {
            budgets,
            category_budgets,
            transactions,
            history,
            clock,
            max_backfill_periods,
        }
    }

    /// Adds a category allocation under a budget.
    ///
    /// Validation happens before anything persists: the parent must have
    /// category budgets enabled, the category must be an expense
    /// category, each category may appear once, and for a fixed parent
    /// amount the sibling sum may not exceed it.
    pub fn create(
        &self,
        budget_id: Uuid,
        category: &Category,
        amount: f64,
        now: NaiveDate,
    ) -> Result<CategoryBudget> {
        let parent = self.budgets.get(budget_id)?;
        if !parent.enable_category_budget {
            return Err(EngineError::CategoryBudgetsDisabled(parent.id));
        }
        if category.kind != CategoryKind::Expense {
            return Err(EngineError::CategoryMismatch(format!(
                "category {} is not an expense category",
                category.name
            )));
        }

        let siblings = self.category_budgets.for_budget(parent.id)?;
        if siblings.iter().any(|cb| cb.category_id == category.id) {
            return Err(EngineError::Validation(format!(
                "category {} already has a budget",
                category.name
            )));
        }
        let sibling_total: f64 = siblings.iter().map(|cb| cb.amount).sum();
        self.check_fixed_amount(&parent, sibling_total + amount)?;

        let row = CategoryBudget::new(parent.id, category.id, amount);
        self.category_budgets.insert(row.clone())?;
        self.sync_parent_amount(&parent, now)?;
        Ok(row)
    }

    /// Changes one allocation's amount, keeping the sibling invariant.
    pub fn update_amount(&self, id: Uuid, amount: f64, now: NaiveDate) -> Result<CategoryBudget> {
        let row = self.category_budgets.get(id)?;
        let parent = self.budgets.get(row.budget_id)?;

        let siblings = self.category_budgets.for_budget(parent.id)?;
        let other_total: f64 = siblings
            .iter()
            .filter(|cb| cb.id != id)
            .map(|cb| cb.amount)
            .sum();
        self.check_fixed_amount(&parent, other_total + amount)?;

        let updated = self.category_budgets.update_amount(id, amount)?;
        self.sync_parent_amount(&parent, now)?;
        Ok(updated)
    }

    /// Removes one allocation.
    pub fn remove(&self, id: Uuid, now: NaiveDate) -> Result<CategoryBudget> {
        let row = self.category_budgets.remove(id)?;
        let parent = self.budgets.get(row.budget_id)?;
        self.sync_parent_amount(&parent, now)?;
        Ok(row)
    }

    /// Turns the category budget feature on or off for a budget.
    ///
    /// Enabling on a zero-amount budget marks it auto-calculated so the
    /// parent follows its categories; disabling removes every
    /// allocation.
    pub fn set_enabled(&self, budget_id: Uuid, enabled: bool) -> Result<Budget> {
        let parent = self.budgets.get(budget_id)?;
        let auto = if enabled {
            parent.is_auto_calculated || parent.amount == 0.0
        } else {
            false
        };
        let updated =
            self.budgets
                .update_category_flags(parent.id, parent.version, enabled, auto)?;
        if !enabled {
            let removed = self.category_budgets.remove_for_budget(budget_id)?;
            if removed > 0 {
                tracing::info!(budget = %budget_id, removed, "removed category budgets");
            }
        }
        Ok(updated)
    }

    /// Recomputes the denormalized spend on every allocation under a
    /// budget from the transaction store.
    pub fn refresh_spent(&self, budget_id: Uuid) -> Result<Vec<CategoryBudget>> {
        let parent = self.budgets.get(budget_id)?;
        let aggregator = SpendAggregator::new(self.transactions);
        let mut rows = self.category_budgets.for_budget(budget_id)?;
        for row in &mut rows {
            let spent = aggregator.spent_for_category(&parent, row.category_id)?;
            self.category_budgets.update_spent(row.id, spent)?;
            row.spent = spent;
        }
        Ok(rows)
    }

    fn check_fixed_amount(&self, parent: &Budget, prospective_total: f64) -> Result<()> {
        if !parent.is_auto_calculated && parent.amount > 0.0 && prospective_total > parent.amount {
            return Err(EngineError::AllocationExceedsTotal(format!(
                "category budgets {prospective_total} exceed parent amount {}",
                parent.amount
            )));
        }
        Ok(())
    }

    /// For auto-calculated parents, the amount follows the category sum.
    /// When the parent period has already closed this shifts its closing
    /// balance, so the rollover chain is recomputed from there.
    fn sync_parent_amount(&self, parent: &Budget, now: NaiveDate) -> Result<()> {
        if !parent.is_auto_calculated {
            return Ok(());
        }
        let total: f64 = self
            .category_budgets
            .for_budget(parent.id)?
            .iter()
            .map(|cb| cb.amount)
            .sum();
        let current = self.budgets.get(parent.id)?;
        if (current.amount - total).abs() < f64::EPSILON {
            return Ok(());
        }
        self.budgets
            .update_amount(current.id, current.version, total)?;

        if current.rollover_enabled && current.period.closed_at(now) {
            let cycle = BudgetCycleService::new(
                self.budgets,
                self.transactions,
                self.history,
                self.clock,
                self.max_backfill_periods,
            );
            cycle.recalculate_rollover_chain(current.id, true)?;
        }
        Ok(())
    }
}
