use anyhow::Context;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::repo_types::MealRow;
use crate::nutrition::{LoggedMeal, MealSlot, Nutrients};

const MEAL_COLUMNS: &str = "id, user_id, date, meal_type, food_name, quantity_g, calories, fat, \
                            carbohydrates, sugar, protein, fiber";

/// Field values for a new or replaced meal. Nutrients are absolute amounts.
#[derive(Debug, Clone)]
pub struct MealRecord<'a> {
    pub date: Date,
    pub meal_type: MealSlot,
    pub food_name: &'a str,
    pub quantity_g: f64,
    pub nutrients: Nutrients,
}

pub async fn insert(db: &PgPool, user_id: Uuid, m: &MealRecord<'_>) -> anyhow::Result<LoggedMeal> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        INSERT INTO meals (id, user_id, date, meal_type, food_name, quantity_g,
                           calories, fat, carbohydrates, sugar, protein, fiber)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(m.date)
    .bind(m.meal_type.as_str())
    .bind(m.food_name)
    .bind(m.quantity_g)
    .bind(m.nutrients.calories)
    .bind(m.nutrients.fat)
    .bind(m.nutrients.carbohydrates)
    .bind(m.nutrients.sugar)
    .bind(m.nutrients.protein)
    .bind(m.nutrients.fiber)
    .fetch_one(db)
    .await
    .context("insert meal")?;
    row.try_into()
}

pub async fn list_by_date(db: &PgPool, user_id: Uuid, date: Date) -> anyhow::Result<Vec<LoggedMeal>> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE user_id = $1 AND date = $2
         ORDER BY created_at ASC
        "#
    ))
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await
    .context("list meals by date")?;
    rows.into_iter().map(LoggedMeal::try_from).collect()
}

/// Full-field replacement. `None` when the meal does not exist or belongs to someone else.
pub async fn replace(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
    m: &MealRecord<'_>,
) -> anyhow::Result<Option<LoggedMeal>> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        UPDATE meals
           SET date = $3, meal_type = $4, food_name = $5, quantity_g = $6,
               calories = $7, fat = $8, carbohydrates = $9, sugar = $10,
               protein = $11, fiber = $12
         WHERE id = $1 AND user_id = $2
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .bind(m.date)
    .bind(m.meal_type.as_str())
    .bind(m.food_name)
    .bind(m.quantity_g)
    .bind(m.nutrients.calories)
    .bind(m.nutrients.fat)
    .bind(m.nutrients.carbohydrates)
    .bind(m.nutrients.sugar)
    .bind(m.nutrients.protein)
    .bind(m.nutrients.fiber)
    .fetch_optional(db)
    .await
    .context("replace meal")?;
    row.map(LoggedMeal::try_from).transpose()
}

pub async fn delete(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM meals WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal")?;
    Ok(res.rows_affected() > 0)
}
