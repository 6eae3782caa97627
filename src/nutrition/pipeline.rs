//! Daily-intake computation: scale a food to a logged quantity, sum a day's
//! meals, estimate a personal target and compare the two.
//!
//! Every function here is pure. Inputs are expected to have passed the
//! validation boundary already (quantity > 0, non-negative nutrients).

use super::model::{
    ActivityLevel, Band, DailyTotals, Gender, Goal, LoggedMeal, NutrientBands, NutrientProfile,
    Nutrients, RecommendedIntake, UserProfile,
};

/// Hard minimum for the weight-loss calorie target (kcal).
pub const WEIGHT_LOSS_FLOOR_KCAL: f64 = 1600.0;
const WEIGHT_LOSS_FACTOR: f64 = 0.85;
const WEIGHT_GAIN_FACTOR: f64 = 1.15;

// Acceptable macro energy share ranges; targets use the midpoint.
const PROTEIN_SHARE: (f64, f64) = (0.10, 0.35);
const FAT_SHARE: (f64, f64) = (0.20, 0.35);
const CARB_SHARE: (f64, f64) = (0.45, 0.65);
const SUGAR_SHARE_CAP: f64 = 0.10;
const FIBER_G_PER_1000_KCAL: f64 = 14.0;

// Atwater factors, kcal per gram.
const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARB: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

const BAND_LOWER: f64 = 0.9;
const BAND_UPPER: f64 = 1.1;

/// Rounds the exact binary value to `decimals` places, ties away from zero.
///
/// `value * 10^decimals` is not used directly: the multiply can round a value
/// just below a half (2.675 is 2.67499..) up onto it.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    let twice = 2.0 * 10f64.powi(decimals as i32);
    let doubled = (value * twice).round();
    // a true tie is exactly representable, so the fused residual is zero
    if doubled % 2.0 != 0.0 && value.mul_add(twice, -doubled) == 0.0 {
        return (doubled + doubled.signum()) / twice;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Absolute nutrient amounts for `quantity_g` grams of a food described per 100 g.
pub fn scale(profile: &NutrientProfile, quantity_g: f64) -> Nutrients {
    let ratio = quantity_g / 100.0;
    profile.map(|per_100g| round_to(per_100g * ratio, 2))
}

/// Sums a day's meals. Calories are whole numbers, the macros keep two decimals.
pub fn aggregate(meals: &[LoggedMeal]) -> DailyTotals {
    let sum = meals
        .iter()
        .fold(Nutrients::default(), |acc, meal| acc.add(&meal.nutrients));
    Nutrients {
        calories: round_to(sum.calories, 0),
        ..sum.map(|v| round_to(v, 2))
    }
}

/// Mifflin-St Jeor basal metabolic rate (kcal/day).
pub fn bmr(profile: &UserProfile) -> f64 {
    let base = 10.0 * profile.weight_kg + 6.25 * profile.height_cm - 5.0 * f64::from(profile.age);
    match profile.gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Lightly => 1.375,
        ActivityLevel::Moderately => 1.55,
        ActivityLevel::Very => 1.725,
        ActivityLevel::Unrecognized => 1.0,
    }
}

pub fn tdee(profile: &UserProfile) -> f64 {
    bmr(profile) * activity_multiplier(profile.activity_level)
}

/// Unrounded daily calorie target for a given TDEE and goal.
pub fn calorie_target(tdee: f64, goal: Goal) -> f64 {
    match goal {
        Goal::WeightLoss => (tdee * WEIGHT_LOSS_FACTOR).max(WEIGHT_LOSS_FLOOR_KCAL),
        Goal::WeightGain => tdee * WEIGHT_GAIN_FACTOR,
        Goal::Maintenance => tdee,
    }
}

fn midpoint((low, high): (f64, f64)) -> f64 {
    (low + high) / 2.0
}

/// Recommended daily intake, every field rounded to a whole number.
pub fn estimate(profile: &UserProfile) -> RecommendedIntake {
    let target = calorie_target(tdee(profile), profile.goal);
    let intake = Nutrients {
        calories: target,
        fat: target * midpoint(FAT_SHARE) / KCAL_PER_G_FAT,
        carbohydrates: target * midpoint(CARB_SHARE) / KCAL_PER_G_CARB,
        sugar: target * SUGAR_SHARE_CAP / KCAL_PER_G_CARB,
        protein: target * midpoint(PROTEIN_SHARE) / KCAL_PER_G_PROTEIN,
        fiber: target / 1000.0 * FIBER_G_PER_1000_KCAL,
    };
    intake.map(|v| round_to(v, 0))
}

/// Within +/-10% of `recommended` (inclusive) is [`Band::Within`].
pub fn classify(actual: f64, recommended: f64) -> Band {
    let lower = recommended * BAND_LOWER;
    let upper = recommended * BAND_UPPER;
    if actual < lower {
        Band::Under
    } else if actual > upper {
        Band::Over
    } else {
        Band::Within
    }
}

pub fn classify_all(totals: &DailyTotals, recommended: &RecommendedIntake) -> NutrientBands {
    let [calories, fat, carbohydrates, sugar, protein, fiber] =
        totals.zip_with(recommended, classify);
    NutrientBands {
        calories,
        fat,
        carbohydrates,
        sugar,
        protein,
        fiber,
    }
}
