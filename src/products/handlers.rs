use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use super::{
    repo,
    services::{lookup_barcode, ProductView},
};
use crate::{
    auth::AuthUser,
    state::AppState,
    validation::{validate_barcode, ProductForm},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/barcode/:barcode", get(get_by_barcode))
        .route("/products/search", get(search_products))
}

#[instrument(skip(state, form))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<ProductView>), (StatusCode, String)> {
    let valid = form.validate()?;
    let product = repo::insert(&state.db, user_id, &valid)
        .await
        .map_err(|e| {
            error!(error = %e, "insert product failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        })?
        .ok_or_else(|| {
            warn!(barcode = %valid.barcode, "barcode already catalogued");
            (StatusCode::CONFLICT, "Barcode already registered".to_string())
        })?;

    info!(product_id = %product.id, barcode = %product.barcode, "product catalogued");
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state))]
pub async fn get_by_barcode(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(barcode): Path<String>,
) -> ApiResult<ProductView> {
    let barcode = validate_barcode(&barcode)?;
    lookup_barcode(&state, &barcode)
        .await?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Product not found".into()))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ProductView>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Search text is required".into()));
    }
    let found = state.foods.search(q).await.map_err(|e| {
        error!(error = %e, query = %q, "product search failed");
        (StatusCode::BAD_GATEWAY, "Food database unavailable".to_string())
    })?;
    Ok(Json(found.into_iter().map(ProductView::from).collect()))
}
