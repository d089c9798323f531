pub mod category_budget_service;
pub mod cycle_service;
pub mod rollover_service;
pub mod scheduler;
pub mod spend_service;

pub use category_budget_service::CategoryBudgetService;
pub use cycle_service::{BudgetCycleService, ChainOutcome};
pub use rollover_service::RolloverLedger;
pub use scheduler::{BudgetScheduler, ReconcileFailure, ReconcileReport};
pub use spend_service::SpendAggregator;
