use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{nutrition::NutrientProfile, validation::ValidProduct};

/// Locally catalogued product, values per 100 g.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub barcode: String,
    pub product_name: String,
    pub calories: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub protein: f64,
    pub fiber: f64,
}

impl Product {
    pub fn per_100g(&self) -> NutrientProfile {
        NutrientProfile {
            calories: self.calories,
            fat: self.fat,
            carbohydrates: self.carbohydrates,
            sugar: self.sugar,
            protein: self.protein,
            fiber: self.fiber,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, barcode, product_name, calories, fat, carbohydrates, sugar, \
                               protein, fiber";

/// `None` when the barcode is already catalogued.
pub async fn insert(
    db: &PgPool,
    created_by: Uuid,
    p: &ValidProduct,
) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (id, barcode, product_name, calories, fat, carbohydrates,
                              sugar, protein, fiber, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (barcode) DO NOTHING
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&p.barcode)
    .bind(&p.product_name)
    .bind(p.per_100g.calories)
    .bind(p.per_100g.fat)
    .bind(p.per_100g.carbohydrates)
    .bind(p.per_100g.sugar)
    .bind(p.per_100g.protein)
    .bind(p.per_100g.fiber)
    .bind(created_by)
    .fetch_optional(db)
    .await
    .context("insert product")?;
    Ok(row)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find product by id")
}

pub async fn find_by_barcode(db: &PgPool, barcode: &str) -> anyhow::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = $1"
    ))
    .bind(barcode)
    .fetch_optional(db)
    .await
    .context("find product by barcode")
}
