mod model;
mod pipeline;

pub use model::{
    ActivityLevel, DailyTotals, Gender, Goal, LoggedMeal, MealSlot, NutrientBands,
    NutrientProfile, Nutrients, RecommendedIntake, UserProfile,
};
pub use pipeline::{aggregate, classify_all, estimate, round_to, scale};
