//! Cron entrypoint: reconciles every budget scope against today.
//!
//! Exits 0 when the run completes, partial per-scope failures included;
//! a non-zero exit means the run could not start at all.

use std::process::ExitCode;

use budget_cycle::config::ConfigManager;
use budget_cycle::storage::json_backend::JsonBookBackend;
use budget_cycle::time::{Clock, SystemClock};
use budget_cycle::{BudgetScheduler, ReconcileReport, Result};

fn main() -> ExitCode {
    budget_cycle::init();
    match run() {
        Ok(report) => {
            if report.failed > 0 {
                tracing::warn!(
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "reconcile completed with partial failures"
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "reconcile failed to start");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ReconcileReport> {
    let manager = ConfigManager::new()?;
    let config = manager.load()?;
    config.refresh_day()?;

    let backend = JsonBookBackend::new(manager.book_path(&config));
    let store = backend.load()?;
    let clock = SystemClock;

    let scheduler = BudgetScheduler::new(
        &store,
        &store,
        &store,
        &clock,
        config.max_backfill_periods,
    );
    let report = scheduler.reconcile_all_owners(clock.today())?;
    backend.save(&store)?;
    Ok(report)
}
