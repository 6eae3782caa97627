use time::Date;

use super::{dto::DailySummary, repo::MealRecord};
use crate::{
    nutrition::{aggregate, classify_all, estimate, scale, LoggedMeal, NutrientProfile, UserProfile},
    validation::{format_date, ValidMeal, ValidPortion},
};

pub fn summarize(date: Date, meals: &[LoggedMeal], profile: &UserProfile) -> DailySummary {
    let totals = aggregate(meals);
    let recommended = estimate(profile);
    DailySummary {
        date: format_date(date),
        bands: classify_all(&totals, &recommended),
        totals,
        recommended,
    }
}

/// New meal from per-100g values; stored amounts are scaled to the portion.
pub fn scaled_record(meal: &ValidMeal) -> MealRecord<'_> {
    MealRecord {
        date: meal.date,
        meal_type: meal.meal_type,
        food_name: &meal.food_name,
        quantity_g: meal.quantity_g,
        nutrients: scale(&meal.nutrients, meal.quantity_g),
    }
}

/// Edited meal; the submitted nutrients replace the stored ones as given.
pub fn absolute_record(meal: &ValidMeal) -> MealRecord<'_> {
    MealRecord {
        date: meal.date,
        meal_type: meal.meal_type,
        food_name: &meal.food_name,
        quantity_g: meal.quantity_g,
        nutrients: meal.nutrients,
    }
}

pub fn portion_record<'a>(
    portion: &ValidPortion,
    product_name: &'a str,
    per_100g: &NutrientProfile,
) -> MealRecord<'a> {
    MealRecord {
        date: portion.date,
        meal_type: portion.meal_type,
        food_name: product_name,
        quantity_g: portion.quantity_g,
        nutrients: scale(per_100g, portion.quantity_g),
    }
}
