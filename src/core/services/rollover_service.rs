//! Period closure and the rollover history ledger.

use uuid::Uuid;

use crate::errors::Result;
use crate::ledger::{Budget, RolloverEntry};
use crate::storage::HistoryStore;
use crate::time::Clock;

/// Records closure deltas and answers history queries.
pub struct RolloverLedger<'a> {
    history: &'a dyn HistoryStore,
    clock: &'a dyn Clock,
}

impl<'a> RolloverLedger<'a> {
    pub fn new(history: &'a dyn HistoryStore, clock: &'a dyn Clock) -> Self {
        Self { history, clock }
    }

    /// Closes a period given its spend, returning the signed remaining
    /// balance, or `None` when the budget does not roll over.
    ///
    /// The remaining balance is unclamped: a deficit carries forward and
    /// reduces the next period's effective amount. The carry itself is
    /// written onto the successor budget by the cycle service; this row
    /// only records the closure.
    pub fn close_period(&self, budget: &Budget, spent: f64) -> Result<Option<f64>> {
        if !budget.rollover_enabled {
            return Ok(None);
        }
        let remaining = budget.amount + budget.opening_rollover - spent;
        let entry = RolloverEntry::from_closure(budget, spent, remaining, self.clock.now());
        tracing::debug!(
            budget = %budget.id,
            period = %entry.period,
            spent,
            remaining,
            "closing budget period"
        );
        self.history.upsert(entry)?;
        Ok(Some(remaining))
    }

    /// Closure records for one budget, newest period first.
    pub fn entries(&self, budget_id: Uuid) -> Result<Vec<RolloverEntry>> {
        self.history.for_budget(budget_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BudgetOwner, PeriodCalculator, RefreshDay, RolloverKind};
    use crate::storage::memory::MemoryStore;
    use crate::time::FixedClock;
    use chrono::NaiveDate;

    fn budget(amount: f64, rollover: bool) -> Budget {
        let refresh_day = RefreshDay::new(1).unwrap();
        let period = PeriodCalculator::period_for(2024, 6, refresh_day).unwrap();
        let budget = Budget::new(
            BudgetOwner::User(Uuid::new_v4()),
            Uuid::new_v4(),
            None,
            refresh_day,
            period,
            amount,
        );
        if rollover {
            budget.with_rollover()
        } else {
            budget
        }
    }

    fn clock() -> FixedClock {
        FixedClock::on(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
    }

    #[test]
    fn closure_is_noop_without_rollover() {
        let store = MemoryStore::new();
        let clock = clock();
        let ledger = RolloverLedger::new(&store, &clock);
        let budget = budget(1000.0, false);
        assert_eq!(ledger.close_period(&budget, 700.0).unwrap(), None);
        assert!(ledger.entries(budget.id).unwrap().is_empty());
    }

    #[test]
    fn surplus_closure_records_positive_delta() {
        let store = MemoryStore::new();
        let clock = clock();
        let ledger = RolloverLedger::new(&store, &clock);
        let budget = budget(1000.0, true);

        let remaining = ledger.close_period(&budget, 700.0).unwrap();
        assert_eq!(remaining, Some(300.0));

        let entries = ledger.entries(budget.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, RolloverKind::Surplus);
        assert_eq!(entries[0].amount, 300.0);
        assert_eq!(entries[0].period, "2024-06");
    }

    #[test]
    fn deficit_closure_includes_opening_carry() {
        let store = MemoryStore::new();
        let clock = clock();
        let ledger = RolloverLedger::new(&store, &clock);
        let mut budget = budget(1000.0, true);
        budget.opening_rollover = 300.0;

        let remaining = ledger.close_period(&budget, 1400.0).unwrap();
        assert_eq!(remaining, Some(-100.0));

        let entries = ledger.entries(budget.id).unwrap();
        assert_eq!(entries[0].kind, RolloverKind::Deficit);
        assert_eq!(entries[0].amount, 100.0);
        assert_eq!(entries[0].previous_rollover, 300.0);
    }
}
