//! Periodic reconciliation across every known budget scope.

use chrono::NaiveDate;

use crate::core::services::cycle_service::BudgetCycleService;
use crate::errors::Result;
use crate::ledger::BudgetScope;
use crate::storage::{BudgetStore, HistoryStore, TransactionStore};
use crate::time::Clock;

/// One scope that failed to reconcile, with the rendered error.
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub scope: BudgetScope,
    pub error: String,
}

/// Aggregate outcome of a reconcile run. Partial failures are part of a
/// normal run; only failing to enumerate scopes aborts it.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub succeeded: usize,
    pub failed: usize,
    pub budgets_created: usize,
    pub errors: Vec<ReconcileFailure>,
}

/// Drives `create_missing_periods` for every scope, isolating failures
/// so one owner's bad data never blocks the rest.
pub struct BudgetScheduler<'a> {
    budgets: &'a dyn BudgetStore,
    transactions: &'a dyn TransactionStore,
    history: &'a dyn HistoryStore,
    clock: &'a dyn Clock,
    max_backfill_periods: usize,
}

impl<'a> BudgetScheduler<'a> {
    pub fn new(
        budgets: &'a dyn BudgetStore,
        transactions: &'a dyn TransactionStore,
        history: &'a dyn HistoryStore,
        clock: &'a dyn Clock,
        max_backfill_periods: usize,
    ) -> Self {
        Self {
            budgets,
            transactions,
            history,
            clock,
            max_backfill_periods,
        }
    }

    /// Reconciles every scope up to `now`.
    ///
    /// Idempotent and resumable: scopes that already reconciled create
    /// nothing on a re-run, so a partially failed run can simply be
    /// repeated. The error of one scope is logged and counted, never
    /// propagated to the others. Within one scope the walk stays
    /// sequential; each period's opening depends on the one before it.
    pub fn reconcile_all_owners(&self, now: NaiveDate) -> Result<ReconcileReport> {
        let scopes = self.budgets.scopes()?;
        let cycle = BudgetCycleService::new(
            self.budgets,
            self.transactions,
            self.history,
            self.clock,
            self.max_backfill_periods,
        );

        let mut report = ReconcileReport::default();
        for scope in scopes {
            match cycle.create_missing_periods(&scope, now) {
                Ok(created) => {
                    report.succeeded += 1;
                    report.budgets_created += created.len();
                }
                Err(err) => {
                    tracing::warn!(?scope, error = %err, "scope failed to reconcile");
                    report.failed += 1;
                    report.errors.push(ReconcileFailure {
                        scope,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            created = report.budgets_created,
            "reconcile run finished"
        );
        Ok(report)
    }
}
