//! Orchestrates budget period creation and rollover chain recalculation.

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::core::services::rollover_service::RolloverLedger;
use crate::core::services::spend_service::SpendAggregator;
use crate::errors::{EngineError, Result};
use crate::ledger::{Budget, BudgetScope, PeriodCalculator};
use crate::storage::{BudgetStore, HistoryStore, TransactionStore};
use crate::time::Clock;

/// Differences below this are treated as already-applied; keeps float
/// noise from bumping versions on every recalculation.
const ROUNDING_TOLERANCE: f64 = 0.01;

/// Extra hops allowed past the calendar distance when walking a chain.
const CHAIN_HOP_SLACK: usize = 2;

/// Result of a chain recalculation walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Last budget whose rollover was successfully recomputed.
    pub last_completed: Uuid,
    /// How many periods were recomputed, the starting one included.
    pub recomputed: usize,
}

/// Creates budgets for missing periods and repairs rollover chains after
/// retroactive transaction changes.
pub struct BudgetCycleService<'a> {
    budgets: &'a dyn BudgetStore,
    transactions: &'a dyn TransactionStore,
    history: &'a dyn HistoryStore,
    clock: &'a dyn Clock,
    max_backfill_periods: usize,
}

impl<'a> BudgetCycleService<'a> {
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

    fn aggregator(&self) -> SpendAggregator<'a> {
        SpendAggregator::new(self.transactions)
    }

    fn ledger(&self) -> RolloverLedger<'a> {
        RolloverLedger::new(self.history, self.clock)
    }

    /// Creates one budget per period missing between the scope's latest
    /// budget and `now`, oldest first, each seeded with the previous
    /// period's closing balance.
    ///
    /// Closure is lazy: the previous period's spend is recomputed on the
    /// fly even if that period was never explicitly closed. The walk is
    /// purely additive and skips periods that already have a budget, so
    /// repeated runs settle into a no-op.
    pub fn create_missing_periods(
        &self,
        scope: &BudgetScope,
        now: NaiveDate,
    ) -> Result<Vec<Budget>> {
        let Some(template) = self.budgets.latest_in_scope(scope)? else {
            tracing::debug!(?scope, "no budget to continue, skipping scope");
            return Ok(Vec::new());
        };

        let periods = PeriodCalculator::missing_periods(
            template.period.end,
            now,
            template.refresh_day,
            self.max_backfill_periods,
        )?;

        let mut created = Vec::new();
        let mut previous = template;
        for period in periods {
            if let Some(existing) = self.budgets.find_covering(scope, period.start)? {
                previous = existing;
                continue;
            }

            let opening = if previous.rollover_enabled {
                let spent = self.aggregator().spent_amount(&previous)?;
                self.ledger()
                    .close_period(&previous, spent)?
                    .unwrap_or(0.0)
            } else {
                0.0
            };

            let budget = previous.continuation(period, opening);
            self.budgets.insert(budget.clone())?;
            tracing::info!(
                budget = %budget.id,
                start = %budget.period.start,
                end = %budget.period.end,
                opening_rollover = budget.opening_rollover,
                "created budget for missing period"
            );
            created.push(budget.clone());
            previous = budget;
        }
        Ok(created)
    }

    /// Recomputes spend and rollover for the given budget, and when
    /// `propagate` is set, for every later period in the same scope.
    ///
    /// Every step is a full recompute from the period's own transactions,
    /// so the operation is idempotent: a second run with no transaction
    /// changes leaves every value untouched. A failure mid-chain stops
    /// the walk rather than skipping ahead, since every downstream
    /// opening depends on the failed step.
    pub fn recalculate_rollover_chain(
        &self,
        start_budget_id: Uuid,
        propagate: bool,
    ) -> Result<ChainOutcome> {
        let start = self.budgets.get(start_budget_id)?;
        if !start.rollover_enabled {
            tracing::debug!(budget = %start.id, "rollover disabled, nothing to recalculate");
            return Ok(ChainOutcome {
                last_completed: start.id,
                recomputed: 0,
            });
        }

        let spent = self.aggregator().spent_amount(&start)?;
        let mut remaining = self
            .ledger()
            .close_period(&start, spent)?
            .ok_or_else(|| EngineError::Validation(format!("budget {} skipped closure", start.id)))?;
        let mut last_completed = start.id;
        let mut recomputed = 1usize;

        if !propagate {
            return Ok(ChainOutcome {
                last_completed,
                recomputed,
            });
        }

        let chain: Vec<Budget> = self
            .budgets
            .subsequent(&start)?
            .into_iter()
            .filter(|budget| budget.rollover_enabled)
            .collect();
        let hop_limit = chain_hop_limit(&start, self.clock.today());

        for (hops, budget) in chain.into_iter().enumerate() {
            if hops >= hop_limit {
                return Err(EngineError::ChainRecalculationPartialFailure {
                    last_completed,
                    reason: format!("chain exceeded {hop_limit} hops"),
                });
            }
            match self.recalculate_step(&budget, remaining) {
                Ok(next_remaining) => {
                    remaining = next_remaining;
                    last_completed = budget.id;
                    recomputed += 1;
                }
                Err(err) => {
                    tracing::error!(
                        budget = %budget.id,
                        error = %err,
                        "chain recalculation stopped"
                    );
                    return Err(EngineError::ChainRecalculationPartialFailure {
                        last_completed,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(ChainOutcome {
            last_completed,
            recomputed,
        })
    }

    /// Applies the carried balance to one chain element and recomputes
    /// its own closing balance. Spend does not change here, only the
    /// opening carry and hence the remaining.
    fn recalculate_step(&self, budget: &Budget, opening: f64) -> Result<f64> {
        let current = if (budget.opening_rollover - opening).abs() > ROUNDING_TOLERANCE {
            self.budgets
                .update_opening_rollover(budget.id, budget.version, opening)?
        } else {
            budget.clone()
        };

        let spent = self.aggregator().spent_amount(&current)?;
        self.ledger()
            .close_period(&current, spent)?
            .ok_or_else(|| EngineError::Validation(format!("budget {} skipped closure", current.id)))
    }
}

fn chain_hop_limit(start: &Budget, today: NaiveDate) -> usize {
    let months = (today.year() - start.period.start.year()) * 12 + today.month() as i32
        - start.period.start.month() as i32;
    months.max(0) as usize + CHAIN_HOP_SLACK
}
