use axum::http::StatusCode;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use super::repo::{self, Product};
use crate::{
    foods::{LookupError, RemoteProduct},
    nutrition::NutrientProfile,
    state::AppState,
    validation::ProductRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSource {
    Remote,
    Local,
}

/// A product with per-100g values, from either the food database or the local catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: Option<Uuid>,
    pub barcode: Option<String>,
    pub product_name: String,
    pub per_100g: NutrientProfile,
    pub source: ProductSource,
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        let per_100g = p.per_100g();
        Self {
            id: Some(p.id),
            barcode: Some(p.barcode),
            product_name: p.product_name,
            per_100g,
            source: ProductSource::Local,
        }
    }
}

impl From<RemoteProduct> for ProductView {
    fn from(p: RemoteProduct) -> Self {
        Self {
            id: None,
            barcode: p.barcode,
            product_name: p.product_name,
            per_100g: p.per_100g,
            source: ProductSource::Remote,
        }
    }
}

fn db_error(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "product query failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}

/// Remote database first, local catalogue as fallback. A remote failure is
/// only surfaced (502) when the catalogue has nothing either.
fn settle(
    remote: Result<Option<RemoteProduct>, LookupError>,
    local: Option<Product>,
) -> Result<Option<ProductView>, (StatusCode, String)> {
    match (remote, local) {
        (Ok(Some(p)), _) => Ok(Some(p.into())),
        (_, Some(p)) => Ok(Some(p.into())),
        (Err(_), None) => Err((
            StatusCode::BAD_GATEWAY,
            "Food database unavailable".into(),
        )),
        (Ok(None), None) => Ok(None),
    }
}

pub async fn lookup_barcode(
    state: &AppState,
    barcode: &str,
) -> Result<Option<ProductView>, (StatusCode, String)> {
    let remote = state.foods.by_barcode(barcode).await;
    let local = match &remote {
        Ok(Some(_)) => None,
        Ok(None) => repo::find_by_barcode(&state.db, barcode).await.map_err(db_error)?,
        Err(e) => {
            warn!(error = %e, %barcode, "remote lookup failed, trying local catalogue");
            repo::find_by_barcode(&state.db, barcode).await.map_err(db_error)?
        }
    };
    settle(remote, local)
}

pub async fn resolve(
    state: &AppState,
    product: &ProductRef,
) -> Result<ProductView, (StatusCode, String)> {
    let found = match product {
        ProductRef::Id(id) => repo::find_by_id(&state.db, *id)
            .await
            .map_err(db_error)?
            .map(ProductView::from),
        ProductRef::Barcode(code) => lookup_barcode(state, code).await?,
    };
    found.ok_or((StatusCode::NOT_FOUND, "Product not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogued() -> Product {
        Product {
            id: Uuid::new_v4(),
            barcode: "5000112548167".into(),
            product_name: "Local cola".into(),
            calories: 42.0,
            fat: 0.0,
            carbohydrates: 10.6,
            sugar: 10.6,
            protein: 0.0,
            fiber: 0.0,
        }
    }

    fn remote() -> RemoteProduct {
        RemoteProduct {
            barcode: Some("5000112548167".into()),
            product_name: "Remote cola".into(),
            per_100g: NutrientProfile::default(),
        }
    }

    #[test]
    fn remote_hit_wins_over_catalogue() {
        let view = settle(Ok(Some(remote())), Some(catalogued())).unwrap().unwrap();
        assert_eq!(view.source, ProductSource::Remote);
        assert_eq!(view.product_name, "Remote cola");
    }

    #[test]
    fn remote_miss_falls_back_to_catalogue() {
        let view = settle(Ok(None), Some(catalogued())).unwrap().unwrap();
        assert_eq!(view.source, ProductSource::Local);
        assert_eq!(view.product_name, "Local cola");
    }

    #[test]
    fn remote_failure_is_hidden_by_a_catalogue_hit() {
        let view = settle(Err(LookupError::Status(500)), Some(catalogued()))
            .unwrap()
            .unwrap();
        assert_eq!(view.source, ProductSource::Local);
    }

    #[test]
    fn remote_failure_with_no_catalogue_entry_is_bad_gateway() {
        let (status, _) = settle(Err(LookupError::Status(500)), None).unwrap_err();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn miss_everywhere_is_none() {
        assert_eq!(settle(Ok(None), None).unwrap(), None);
    }

    #[test]
    fn views_record_their_source() {
        let local = ProductView::from(Product {
            id: Uuid::new_v4(),
            barcode: "123".into(),
            product_name: "Homemade granola".into(),
            calories: 450.0,
            fat: 18.0,
            carbohydrates: 60.0,
            sugar: 20.0,
            protein: 10.0,
            fiber: 7.0,
        });
        assert_eq!(local.source, ProductSource::Local);
        assert_eq!(local.per_100g.fiber, 7.0);

        let remote = ProductView::from(RemoteProduct {
            barcode: None,
            product_name: "Banana".into(),
            per_100g: NutrientProfile::default(),
        });
        assert_eq!(remote.source, ProductSource::Remote);
        assert!(remote.id.is_none());

        let json = serde_json::to_value(&remote).unwrap();
        assert_eq!(json["source"], "remote");
        assert_eq!(json["per_100g"]["calories"], 0.0);
    }
}
