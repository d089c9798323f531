#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

use budget_cycle::errors::Result;
use budget_cycle::ledger::{
    Budget, BudgetOwner, BudgetPeriod, PeriodCalculator, RefreshDay, Transaction, TransactionKind,
};
use budget_cycle::storage::memory::MemoryStore;
use budget_cycle::storage::{BudgetStore, TransactionStore};

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates an isolated directory for disk-backed tests.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn refresh_day(day: u32) -> RefreshDay {
    RefreshDay::new(day).unwrap()
}

pub fn period(year: i32, month: u32, day: u32) -> BudgetPeriod {
    PeriodCalculator::period_for(year, month, refresh_day(day)).unwrap()
}

/// Seeds a rollover-enabled monthly budget and returns it.
pub fn seed_monthly_budget(
    store: &MemoryStore,
    owner: BudgetOwner,
    account: Uuid,
    year: i32,
    month: u32,
    amount: f64,
) -> Budget {
    let budget = Budget::new(
        owner,
        account,
        None,
        refresh_day(1),
        period(year, month, 1),
        amount,
    )
    .with_rollover();
    BudgetStore::insert(store, budget.clone()).expect("insert budget");
    budget
}

/// Records a direct expense against the budget on the given date.
pub fn spend(store: &MemoryStore, budget: &Budget, amount: f64, on: NaiveDate) {
    let txn = Transaction::new(
        budget.owner,
        budget.account_id,
        budget.category_id,
        TransactionKind::Expense,
        amount,
        on,
    )
    .assigned_to(budget.id);
    store.add_transaction(txn).expect("insert transaction");
}

/// Transaction store that fails for one budget, for failure-isolation tests.
pub struct FailingTransactions<'a> {
    pub inner: &'a MemoryStore,
    pub fail_for: Uuid,
}

impl TransactionStore for FailingTransactions<'_> {
    fn direct_expenses(
        &self,
        budget_id: Uuid,
        period: &BudgetPeriod,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        if budget_id == self.fail_for {
            return Err(budget_cycle::EngineError::Storage(
                "transaction query failed".into(),
            ));
        }
        self.inner.direct_expenses(budget_id, period, category_id)
    }

    fn split_expenses(
        &self,
        budget_id: Uuid,
        period: &BudgetPeriod,
        category_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>> {
        if budget_id == self.fail_for {
            return Err(budget_cycle::EngineError::Storage(
                "transaction query failed".into(),
            ));
        }
        self.inner.split_expenses(budget_id, period, category_id)
    }
}
