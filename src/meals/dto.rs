use serde::{Deserialize, Serialize};

use crate::nutrition::{DailyTotals, NutrientBands, RecommendedIntake};

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    #[serde(default)]
    pub date: Option<String>,
}

/// Totals for one day set against the user's recommended intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub totals: DailyTotals,
    pub recommended: RecommendedIntake,
    pub bands: NutrientBands,
}
