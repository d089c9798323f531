use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sub-allocation of a budget to one expense category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub amount: f64,
    /// Denormalized spend for the category within the parent period,
    /// recomputed from the aggregator rather than maintained in place.
    #[serde(default)]
    pub spent: f64,
}

impl CategoryBudget {
    pub fn new(budget_id: Uuid, category_id: Uuid, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget_id,
            category_id,
            amount,
            spent: 0.0,
        }
    }
}
