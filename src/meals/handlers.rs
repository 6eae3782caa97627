use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{DailySummary, DateQuery},
    repo,
    services::{absolute_record, portion_record, scaled_record, summarize},
};
use crate::{
    auth::{repo::User, AuthUser},
    nutrition::LoggedMeal,
    products,
    state::AppState,
    validation::{parse_date, MealForm, PortionForm},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/summary", get(daily_summary))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/meals/from-product", post(create_from_product))
        .route("/meals/:id", put(update_meal).delete(delete_meal))
}

fn internal(context: &str, e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "{context} failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Meal not found".into())
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DateQuery>,
) -> ApiResult<Vec<LoggedMeal>> {
    let date = parse_date(q.date.as_deref())?;
    let meals = repo::list_by_date(&state.db, user_id, date)
        .await
        .map_err(|e| internal("list_by_date", e))?;
    Ok(Json(meals))
}

#[instrument(skip(state, form))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(form): Json<MealForm>,
) -> Result<(StatusCode, Json<LoggedMeal>), (StatusCode, String)> {
    let valid = form.validate().map_err(|e| {
        warn!(field = e.field, "invalid meal");
        e
    })?;
    let meal = repo::insert(&state.db, user_id, &scaled_record(&valid))
        .await
        .map_err(|e| internal("insert meal", e))?;

    info!(meal_id = %meal.id, %user_id, "meal logged");
    Ok((StatusCode::CREATED, Json(meal)))
}

#[instrument(skip(state, form))]
pub async fn create_from_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(form): Json<PortionForm>,
) -> Result<(StatusCode, Json<LoggedMeal>), (StatusCode, String)> {
    let portion = form.validate()?;
    let product = products::resolve(&state, &portion.product).await?;

    let record = portion_record(&portion, &product.product_name, &product.per_100g);
    let meal = repo::insert(&state.db, user_id, &record)
        .await
        .map_err(|e| internal("insert meal", e))?;

    info!(meal_id = %meal.id, %user_id, source = ?product.source, "meal logged from product");
    Ok((StatusCode::CREATED, Json(meal)))
}

#[instrument(skip(state, form))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(form): Json<MealForm>,
) -> ApiResult<LoggedMeal> {
    let valid = form.validate_edit()?;
    let meal = repo::replace(&state.db, user_id, id, &absolute_record(&valid))
        .await
        .map_err(|e| internal("replace meal", e))?
        .ok_or_else(not_found)?;

    info!(meal_id = %id, %user_id, "meal updated");
    Ok(Json(meal))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete(&state.db, user_id, id)
        .await
        .map_err(|e| internal("delete meal", e))?;
    if !deleted {
        return Err(not_found());
    }
    info!(meal_id = %id, %user_id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DateQuery>,
) -> ApiResult<DailySummary> {
    let date = parse_date(q.date.as_deref())?;
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| internal("find_by_id", e))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    let meals = repo::list_by_date(&state.db, user_id, date)
        .await
        .map_err(|e| internal("list_by_date", e))?;

    Ok(Json(summarize(date, &meals, &user.profile())))
}
