use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

/// Six nutrient amounts. Depending on context these are per 100 g of a food,
/// absolute amounts for one logged meal, daily totals or daily targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calories: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub protein: f64,
    pub fiber: f64,
}

/// Nutrient values expressed per 100 g of a food or product.
pub type NutrientProfile = Nutrients;

/// Element-wise sum of a user's meals for one day.
pub type DailyTotals = Nutrients;

/// Daily targets derived from a [`UserProfile`].
pub type RecommendedIntake = Nutrients;

impl Nutrients {
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            calories: f(self.calories),
            fat: f(self.fat),
            carbohydrates: f(self.carbohydrates),
            sugar: f(self.sugar),
            protein: f(self.protein),
            fiber: f(self.fiber),
        }
    }

    pub fn zip_with<T>(&self, other: &Self, f: impl Fn(f64, f64) -> T) -> [T; 6] {
        [
            f(self.calories, other.calories),
            f(self.fat, other.fat),
            f(self.carbohydrates, other.carbohydrates),
            f(self.sugar, other.sugar),
            f(self.protein, other.protein),
            f(self.fiber, other.fiber),
        ]
    }

    pub fn add(&self, other: &Self) -> Self {
        let [calories, fat, carbohydrates, sugar, protein, fiber] =
            self.zip_with(other, |a, b| a + b);
        Self {
            calories,
            fat,
            carbohydrates,
            sugar,
            protein,
            fiber,
        }
    }
}

/// Meal slot a food was logged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "snack" => Some(Self::Snack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Anything that is not "male" uses the female BMR offset.
impl From<&str> for Gender {
    fn from(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Female)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Lightly,
    Moderately,
    Very,
    /// Stored value outside the known set. TDEE equals BMR.
    #[serde(skip_deserializing)]
    Unrecognized,
}

impl ActivityLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sedentary" => Some(Self::Sedentary),
            "lightly" => Some(Self::Lightly),
            "moderately" => Some(Self::Moderately),
            "very" => Some(Self::Very),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::Lightly => "lightly",
            Self::Moderately => "moderately",
            Self::Very => "very",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl From<&str> for ActivityLevel {
    fn from(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Unrecognized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "weight loss")]
    WeightLoss,
    #[serde(rename = "weight gain")]
    WeightGain,
    #[serde(rename = "maintenance")]
    Maintenance,
}

impl Goal {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weight loss" => Some(Self::WeightLoss),
            "weight gain" => Some(Self::WeightGain),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight loss",
            Self::WeightGain => "weight gain",
            Self::Maintenance => "maintenance",
        }
    }
}

/// Unknown goals keep the calorie target at TDEE, same as maintenance.
impl From<&str> for Goal {
    fn from(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Maintenance)
    }
}

/// Body metrics and preferences used to estimate daily intake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

/// One logged food with its absolute nutrient amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedMeal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub meal_type: MealSlot,
    pub food_name: String,
    pub quantity_g: f64,
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

/// Where an actual value sits relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Under,
    Within,
    Over,
}

/// Per-nutrient comparator result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NutrientBands {
    pub calories: Band,
    pub fat: Band,
    pub carbohydrates: Band,
    pub sugar: Band,
    pub protein: Band,
    pub fiber: Band,
}
