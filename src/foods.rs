//! Third-party food database lookup (Open Food Facts).
//!
//! Handlers depend on the [`FoodLookup`] trait so tests can swap in a fake.
//! The HTTP client owns its response cache; it is built once at startup and
//! shared through `AppState`.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{config::FoodApiConfig, nutrition::NutrientProfile};

const SEARCH_PAGE_SIZE: &str = "40";
const MAX_CACHE_ENTRIES: usize = 1_000;

// 100 g of food holds at most 100 g of anything, and nothing is denser in energy than fat.
const MAX_GRAMS_PER_100G: f64 = 100.0;
const MAX_KCAL_PER_100G: f64 = 900.0;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("food database request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("food database returned HTTP {0}")]
    Status(u16),
    #[error("food database response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, LookupError> {
    Ok(serde_json::from_str(body)?)
}

fn is_barcode(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
}

/// A product as reported by the remote database, normalised to per-100g values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteProduct {
    pub barcode: Option<String>,
    pub product_name: String,
    pub per_100g: NutrientProfile,
}

#[async_trait]
pub trait FoodLookup: Send + Sync {
    async fn by_barcode(&self, barcode: &str) -> Result<Option<RemoteProduct>, LookupError>;
    async fn search(&self, query: &str) -> Result<Vec<RemoteProduct>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct BarcodeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    product: Option<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct OffProduct {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    product_name_en: Option<String>,
    #[serde(default)]
    nutriments: HashMap<String, serde_json::Value>,
}

impl OffProduct {
    /// Reads `<key>_100g`, then the bare key. Missing, unparsable or negative
    /// values are 0; anything above `max` is capped.
    fn nutriment(&self, key: &str, max: f64) -> f64 {
        [format!("{key}_100g"), key.to_string()]
            .iter()
            .filter_map(|k| self.nutriments.get(k))
            .find_map(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|v| v.is_finite())
            .map_or(0.0, |v| v.clamp(0.0, max))
    }

    fn into_remote(self, fallback_code: Option<String>) -> RemoteProduct {
        let per_100g = NutrientProfile {
            calories: self.nutriment("energy-kcal", MAX_KCAL_PER_100G),
            fat: self.nutriment("fat", MAX_GRAMS_PER_100G),
            carbohydrates: self.nutriment("carbohydrates", MAX_GRAMS_PER_100G),
            sugar: self.nutriment("sugars", MAX_GRAMS_PER_100G),
            protein: self.nutriment("proteins", MAX_GRAMS_PER_100G),
            fiber: self.nutriment("fiber", MAX_GRAMS_PER_100G),
        };
        let product_name = self
            .product_name_en
            .filter(|n| !n.trim().is_empty())
            .or(self.product_name.filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| "Unknown product".to_string());
        RemoteProduct {
            barcode: self.code.or(fallback_code),
            product_name,
            per_100g,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

/// Inserts after dropping expired entries; when still full, evicts the entry
/// closest to expiry.
fn remember<T>(entries: &mut HashMap<String, CacheEntry<T>>, key: String, data: T, ttl: Duration) {
    let now = Instant::now();
    entries.retain(|_, e| e.expires_at > now);
    if entries.len() >= MAX_CACHE_ENTRIES && !entries.contains_key(&key) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone());
        if let Some(oldest) = oldest {
            entries.remove(&oldest);
        }
    }
    entries.insert(
        key,
        CacheEntry {
            data,
            expires_at: now + ttl,
        },
    );
}

#[derive(Debug, Default)]
struct Caches {
    barcodes: HashMap<String, CacheEntry<RemoteProduct>>,
    searches: HashMap<String, CacheEntry<Vec<RemoteProduct>>>,
}

/// Open Food Facts client with a per-instance TTL cache.
pub struct OpenFoodFacts {
    http: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: Arc<RwLock<Caches>>,
}

impl OpenFoodFacts {
    pub fn new(config: &FoodApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nutritrack/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .context("build food api http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: Arc::new(RwLock::new(Caches::default())),
        })
    }

    async fn remember_barcode(&self, barcode: &str, product: RemoteProduct) {
        let mut cache = self.cache.write().await;
        remember(&mut cache.barcodes, barcode.to_string(), product, self.ttl);
    }

    async fn cached_barcode(&self, barcode: &str) -> Option<RemoteProduct> {
        let cache = self.cache.read().await;
        cache
            .barcodes
            .get(barcode)
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.data.clone())
    }
}

#[async_trait]
impl FoodLookup for OpenFoodFacts {
    async fn by_barcode(&self, barcode: &str) -> Result<Option<RemoteProduct>, LookupError> {
        if !is_barcode(barcode) {
            debug!(%barcode, "not a barcode, skipping food database");
            return Ok(None);
        }
        if let Some(hit) = self.cached_barcode(barcode).await {
            debug!(%barcode, "food lookup cache hit");
            return Ok(Some(hit));
        }

        let url = format!("{}/api/v3/product/{}.json", self.base_url, barcode);
        let res = self.http.get(&url).send().await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(%barcode, "product not in food database");
            return Ok(None);
        }
        if !res.status().is_success() {
            warn!(%barcode, status = %res.status(), "food database error");
            return Err(LookupError::Status(res.status().as_u16()));
        }

        let body: BarcodeResponse = decode(&res.text().await?)?;
        if body.status.as_deref() == Some("failure") {
            return Ok(None);
        }
        let Some(product) = body.product else {
            return Ok(None);
        };
        let product = product.into_remote(body.code.or_else(|| Some(barcode.to_string())));
        self.remember_barcode(barcode, product.clone()).await;
        Ok(Some(product))
    }

    async fn search(&self, query: &str) -> Result<Vec<RemoteProduct>, LookupError> {
        let key = query.trim().to_lowercase();
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.searches.get(&key) {
                if Instant::now() < entry.expires_at {
                    debug!(query = %key, "food search cache hit");
                    return Ok(entry.data.clone());
                }
            }
        }

        let url = format!("{}/cgi/search.pl", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", SEARCH_PAGE_SIZE),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            warn!(query = %key, status = %res.status(), "food search error");
            return Err(LookupError::Status(res.status().as_u16()));
        }

        let body: SearchResponse = decode(&res.text().await?)?;
        let products: Vec<RemoteProduct> = body
            .products
            .into_iter()
            .map(|p| p.into_remote(None))
            .collect();

        let mut cache = self.cache.write().await;
        remember(&mut cache.searches, key, products.clone(), self.ttl);
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_ttl(cache_ttl_secs: u64) -> OpenFoodFacts {
        OpenFoodFacts::new(&FoodApiConfig {
            // Nothing listens here; tests must be served from the cache.
            base_url: "http://127.0.0.1:9/".into(),
            cache_ttl_secs,
        })
        .expect("client builds")
    }

    fn client() -> OpenFoodFacts {
        client_with_ttl(60)
    }

    fn bar(name: &str) -> RemoteProduct {
        RemoteProduct {
            barcode: None,
            product_name: name.into(),
            per_100g: NutrientProfile::default(),
        }
    }

    #[test]
    fn barcode_response_maps_per_100g_fields() {
        let json = r#"{
            "code": "3017620422003",
            "status": "success",
            "product": {
                "product_name": "Nutella",
                "product_name_en": "",
                "nutriments": {
                    "energy-kcal_100g": 539,
                    "fat_100g": 30.9,
                    "carbohydrates_100g": "57.5",
                    "sugars_100g": 56.3,
                    "proteins_100g": 6.3,
                    "fat": 99
                }
            }
        }"#;
        let body: BarcodeResponse = serde_json::from_str(json).unwrap();
        let product = body.product.unwrap().into_remote(body.code);
        assert_eq!(product.product_name, "Nutella");
        assert_eq!(product.barcode.as_deref(), Some("3017620422003"));
        assert_eq!(product.per_100g.calories, 539.0);
        assert_eq!(product.per_100g.fat, 30.9);
        assert_eq!(product.per_100g.carbohydrates, 57.5);
        assert_eq!(product.per_100g.sugar, 56.3);
        assert_eq!(product.per_100g.protein, 6.3);
        assert_eq!(product.per_100g.fiber, 0.0);
    }

    #[test]
    fn search_response_falls_back_to_bare_keys() {
        let json = r#"{"products": [
            {"code": "1", "product_name_en": "Rolled oats",
             "nutriments": {"energy-kcal": 372, "proteins": 13.5, "fiber": 10}},
            {"nutriments": {}}
        ]}"#;
        let body: SearchResponse = serde_json::from_str(json).unwrap();
        let products: Vec<_> = body.products.into_iter().map(|p| p.into_remote(None)).collect();
        assert_eq!(products[0].product_name, "Rolled oats");
        assert_eq!(products[0].per_100g.calories, 372.0);
        assert_eq!(products[0].per_100g.protein, 13.5);
        assert_eq!(products[0].per_100g.fiber, 10.0);
        assert_eq!(products[1].product_name, "Unknown product");
        assert_eq!(products[1].barcode, None);
    }

    #[tokio::test]
    async fn barcode_lookups_are_served_from_cache() {
        let client = client();
        let product = RemoteProduct {
            barcode: Some("42".into()),
            product_name: "Cached bar".into(),
            per_100g: NutrientProfile {
                calories: 400.0,
                ..Default::default()
            },
        };
        client.remember_barcode("42", product.clone()).await;
        let hit = client.by_barcode("42").await.expect("served from cache");
        assert_eq!(hit, Some(product));
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_insert() {
        let client = client_with_ttl(0);
        for code in 0..25 {
            client.remember_barcode(&code.to_string(), bar("expired")).await;
        }
        assert_eq!(client.cache.read().await.barcodes.len(), 1);
    }

    #[test]
    fn cache_never_grows_past_its_cap() {
        let mut entries = HashMap::new();
        for i in 0..MAX_CACHE_ENTRIES + 5 {
            remember(&mut entries, format!("query {i}"), i, Duration::from_secs(60));
        }
        assert_eq!(entries.len(), MAX_CACHE_ENTRIES);
        assert!(entries.contains_key(&format!("query {}", MAX_CACHE_ENTRIES + 4)));
    }

    #[test]
    fn nutriments_are_clamped_to_plausible_values() {
        let json = r#"{"product_name": "Bad data", "nutriments": {
            "energy-kcal_100g": 12000, "fat_100g": -3, "sugars_100g": "140",
            "proteins_100g": "n/a", "fiber_100g": 2.5
        }}"#;
        let product: OffProduct = serde_json::from_str(json).unwrap();
        let p = product.into_remote(None).per_100g;
        assert_eq!(p.calories, 900.0);
        assert_eq!(p.fat, 0.0);
        assert_eq!(p.sugar, 100.0);
        assert_eq!(p.protein, 0.0);
        assert_eq!(p.fiber, 2.5);
    }

    #[test]
    fn unreadable_body_is_a_decode_error() {
        let err = decode::<SearchResponse>("<html>busy</html>").unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }

    #[tokio::test]
    async fn non_digit_barcodes_never_reach_the_database() {
        let client = client();
        assert_eq!(client.by_barcode("123?x=1").await.unwrap(), None);
        assert_eq!(client.by_barcode("12#34").await.unwrap(), None);
        assert_eq!(client.by_barcode("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreachable_database_is_a_transport_error() {
        let err = client().by_barcode("0000").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport(_)));
    }
}
