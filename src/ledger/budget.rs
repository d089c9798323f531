use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::{BudgetPeriod, RefreshDay};

/// Party a budget is funded for: a user, or a custodial family member
/// whose spending is tracked by someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BudgetOwner {
    User(Uuid),
    FamilyMember(Uuid),
}

/// Identity of one budget sequence: all periods for the same owner,
/// account, and optional category belong to one contiguous chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetScope {
    pub owner: BudgetOwner,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
}

/// One funded allowance for one scope over one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub owner: BudgetOwner,
    pub account_id: Uuid,
    /// None means the budget covers the whole account.
    pub category_id: Option<Uuid>,
    pub refresh_day: RefreshDay,
    pub period: BudgetPeriod,
    pub amount: f64,
    pub rollover_enabled: bool,
    /// Signed carry into this period, set from the previous period's
    /// closing delta. Zero when rollover is disabled.
    pub opening_rollover: f64,
    pub enable_category_budget: bool,
    pub is_auto_calculated: bool,
    /// Bumped by the store on every mutation; guards rollover updates
    /// against lost writes.
    pub version: u64,
}

impl Budget {
    pub fn new(
        owner: BudgetOwner,
        account_id: Uuid,
        category_id: Option<Uuid>,
        refresh_day: RefreshDay,
        period: BudgetPeriod,
        amount: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            account_id,
            category_id,
            refresh_day,
            period,
            amount,
            rollover_enabled: false,
            opening_rollover: 0.0,
            enable_category_budget: false,
            is_auto_calculated: false,
            version: 0,
        }
    }

    pub fn with_rollover(mut self) -> Self {
        self.rollover_enabled = true;
        self
    }

    pub fn scope(&self) -> BudgetScope {
        BudgetScope {
            owner: self.owner,
            account_id: self.account_id,
            category_id: self.category_id,
        }
    }

    /// Total spendable amount for the period.
    pub fn available(&self) -> f64 {
        if self.rollover_enabled {
            self.amount + self.opening_rollover
        } else {
            self.amount
        }
    }

    /// Builds the budget for a later period from this one, copying the
    /// funded amount and flags and seeding the opening carry.
    pub fn continuation(&self, period: BudgetPeriod, opening_rollover: f64) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            owner: self.owner,
            account_id: self.account_id,
            category_id: self.category_id,
            refresh_day: self.refresh_day,
            period,
            amount: self.amount,
            rollover_enabled: self.rollover_enabled,
            opening_rollover: if self.rollover_enabled {
                opening_rollover
            } else {
                0.0
            },
            enable_category_budget: self.enable_category_budget,
            is_auto_calculated: self.is_auto_calculated,
            version: 0,
        }
    }
}
