use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the budget cycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unsupported refresh day: {0}")]
    InvalidRefreshDay(u32),
    #[error("Period not found: {0}")]
    PeriodNotFound(String),
    #[error("Budget not found: {0}")]
    BudgetNotFound(Uuid),
    #[error("Category mismatch: {0}")]
    CategoryMismatch(String),
    #[error("Allocation exceeds total: {0}")]
    AllocationExceedsTotal(String),
    #[error("Category budgets not enabled for budget {0}")]
    CategoryBudgetsDisabled(Uuid),
    #[error("Chain recalculation stopped after budget {last_completed}: {reason}")]
    ChainRecalculationPartialFailure { last_completed: Uuid, reason: String },
    #[error("Backfill limit of {0} periods exceeded")]
    BackfillLimitExceeded(usize),
    #[error("Version conflict updating budget {0}")]
    VersionConflict(Uuid),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}
