use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// A hotel as the catalog returns it. Only the fields this layer actually
/// reads are modeled; everything else rides along opaquely in `extra`.
/// Positional data shows up in four shapes across the catalog, any of which
/// may be absent, so the raw values are kept and parsed lazily (see
/// `geo::hotel_coordinates`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Hotel {
    pub fn rating(&self) -> f64 {
        as_finite(self.rating.as_ref()).unwrap_or(0.0)
    }

    pub fn reviews(&self) -> f64 {
        as_finite(self.reviews.as_ref()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
}

/// Catalog payloads mix numbers and numeric strings.
pub(crate) fn as_finite(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// One page of the cursor-paginated catalog. `next_cursor: None` means
/// pagination is exhausted. Shape issues in the payload coerce to safe
/// defaults instead of failing the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotelsPage {
    #[serde(default, deserialize_with = "lenient_hotels")]
    pub hotels: Vec<Hotel>,
    #[serde(default, rename = "nextCursor", deserialize_with = "lenient_cursor")]
    pub next_cursor: Option<String>,
}

fn lenient_hotels<'de, D>(deserializer: D) -> Result<Vec<Hotel>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .filter(|cursor| !cursor.is_empty())
        .map(ToString::to_string))
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("network error")]
    Network(#[from] reqwest::Error),
    #[error("json parse error")]
    JsonParse(reqwest::Error),
    #[error("catalog responded with status {0}")]
    Status(reqwest::StatusCode),
}

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn hotels_page(&self, cursor: &str, limit: u32) -> Result<HotelsPage, CatalogError>;
    async fn all_hotels(&self, location: &str) -> Result<Vec<Hotel>, CatalogError>;
    async fn hotel_by_id(&self, id: &str) -> Result<Option<Hotel>, CatalogError>;
}

/// The catalog REST API. `GET /hotels` is cursor-paginated and also answers
/// location queries; `GET /hotels/{id}` returns a single hotel or 404.
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCatalog {
    pub fn new(base_url: String, api_key: Option<String>, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("failed to build http client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("CATALOG_API_URL").expect("failed to get CATALOG_API_URL");
        let api_key = std::env::var("CATALOG_API_KEY").ok();
        let timeout_ms = std::env::var("CATALOG_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(15_000)
            .clamp(5_000, 60_000);

        Self::new(base_url, api_key, timeout_ms)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl Catalog for HttpCatalog {
    async fn hotels_page(&self, cursor: &str, limit: u32) -> Result<HotelsPage, CatalogError> {
        let res = self
            .get("/hotels")
            .query(&[("cursor", cursor), ("limit", &limit.to_string())])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(CatalogError::Status(res.status()));
        }

        res.json().await.map_err(CatalogError::JsonParse)
    }

    async fn all_hotels(&self, location: &str) -> Result<Vec<Hotel>, CatalogError> {
        let res = self
            .get("/hotels")
            .query(&[("location", location)])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(CatalogError::Status(res.status()));
        }

        let page: HotelsPage = res.json().await.map_err(CatalogError::JsonParse)?;
        Ok(page.hotels)
    }

    async fn hotel_by_id(&self, id: &str) -> Result<Option<Hotel>, CatalogError> {
        let res = self.get(&format!("/hotels/{id}")).send().await?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(CatalogError::Status(res.status()));
        }

        let hotel = res.json().await.map_err(CatalogError::JsonParse)?;
        Ok(Some(hotel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_with_cursor() {
        let page: HotelsPage = serde_json::from_str(
            r#"{"hotels": [{"id": "h1", "rating": 4.5}], "nextCursor": "abc"}"#,
        )
        .unwrap();

        assert_eq!(page.hotels.len(), 1);
        assert_eq!(page.hotels[0].id, "h1");
        assert_eq!(page.hotels[0].rating(), 4.5);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_fields_coerce_to_defaults() {
        let page: HotelsPage = serde_json::from_str("{}").unwrap();
        assert!(page.hotels.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn non_array_hotels_coerce_to_empty() {
        let page: HotelsPage =
            serde_json::from_str(r#"{"hotels": "garbage", "nextCursor": null}"#).unwrap();
        assert!(page.hotels.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn empty_cursor_means_exhausted() {
        let page: HotelsPage = serde_json::from_str(r#"{"hotels": [], "nextCursor": ""}"#).unwrap();
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let page: HotelsPage =
            serde_json::from_str(r#"{"hotels": [{"id": "h1"}, 42, "junk"]}"#).unwrap();
        assert_eq!(page.hotels.len(), 1);
    }

    #[test]
    fn string_encoded_numbers_parse() {
        let hotel: Hotel =
            serde_json::from_str(r#"{"id": "h1", "rating": "4.7", "reviews": "812"}"#).unwrap();
        assert_eq!(hotel.rating(), 4.7);
        assert_eq!(hotel.reviews(), 812.0);
    }

    #[test]
    fn unknown_fields_ride_in_extra() {
        let hotel: Hotel = serde_json::from_str(
            r#"{"id": "h1", "name": "Amman Palace", "price": 120, "destination": "Amman"}"#,
        )
        .unwrap();

        assert_eq!(hotel.extra["name"], "Amman Palace");
        assert_eq!(hotel.extra["price"], 120);

        // and survive serialization back out
        let out = serde_json::to_value(&hotel).unwrap();
        assert_eq!(out["destination"], "Amman");
    }

    #[test]
    fn absent_rating_counts_as_zero() {
        let hotel: Hotel = serde_json::from_str(r#"{"id": "h1", "rating": null}"#).unwrap();
        assert_eq!(hotel.rating(), 0.0);
    }
}
