use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use crate::nutrition::{LoggedMeal, MealSlot, Nutrients};

#[derive(Debug, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub meal_type: String,
    pub food_name: String,
    pub quantity_g: f64,
    pub calories: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub protein: f64,
    pub fiber: f64,
}

impl TryFrom<MealRow> for LoggedMeal {
    type Error = anyhow::Error;

    fn try_from(r: MealRow) -> Result<Self, Self::Error> {
        let meal_type = MealSlot::parse(&r.meal_type)
            .ok_or_else(|| anyhow::anyhow!("meal {} has unknown meal_type {:?}", r.id, r.meal_type))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            meal_type,
            food_name: r.food_name,
            quantity_g: r.quantity_g,
            nutrients: Nutrients {
                calories: r.calories,
                fat: r.fat,
                carbohydrates: r.carbohydrates,
                sugar: r.sugar,
                protein: r.protein,
                fiber: r.fiber,
            },
        })
    }
}
