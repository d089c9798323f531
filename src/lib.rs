#![doc(test(attr(deny(warnings))))]

//! Budget Cycle implements refresh-day keyed budget periods, spend
//! aggregation over direct and split expenses, and surplus/deficit
//! rollover propagation across sequential periods.

pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod time;
pub mod utils;

pub use crate::core::services::{
    BudgetCycleService, BudgetScheduler, CategoryBudgetService, ChainOutcome, ReconcileFailure,
    ReconcileReport, RolloverLedger, SpendAggregator,
};
pub use errors::{EngineError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Budget Cycle tracing initialized.");
    });
}
