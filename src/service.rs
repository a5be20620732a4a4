use crate::{
    cache::Caches,
    catalog::{Catalog, CatalogError, Hotel, HotelsPage},
};

/// Client-side rating filter for the featured shelf; the catalog has no
/// server-side notion of "featured".
const FEATURED_SAMPLE_LIMIT: u32 = 300;
const FEATURED_MIN_RATING: f64 = 4.7;
const POPULAR_SAMPLE_LIMIT: u32 = 400;
const POPULAR_COUNT: usize = 6;

pub(crate) fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// The hotel catalog access layer: cursor-pagination traversal over the
/// remote catalog plus the three TTL cache key spaces. Owns its caches
/// rather than sharing module-level state so tests can inject a clock and
/// inspect entries.
pub struct HotelsService<C> {
    pub(crate) catalog: C,
    pub(crate) caches: Caches,
    pub(crate) in_flight: crate::nearby::InFlight,
}

impl<C: Catalog> HotelsService<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_caches(catalog, Caches::new())
    }

    pub fn with_caches(catalog: C, caches: Caches) -> Self {
        Self {
            catalog,
            caches,
            in_flight: Default::default(),
        }
    }

    /// Fetches one page of the catalog. Every returned hotel with an id is
    /// written into the by-id cache, regardless of why the page was fetched,
    /// so anything ever observed through pagination stays individually
    /// addressable until its entry expires.
    pub async fn fetch_page(&self, cursor: &str, limit: u32) -> Result<HotelsPage, CatalogError> {
        let page = self.catalog.hotels_page(cursor, limit).await?;
        tracing::debug!(count = page.hotels.len(), cursor, "fetched catalog page");

        self.cache_by_id(&page.hotels);
        Ok(page)
    }

    pub(crate) fn cache_by_id(&self, hotels: &[Hotel]) {
        for hotel in hotels {
            let key = normalize_key(&hotel.id);
            if !key.is_empty() {
                self.caches.by_id.set(key, hotel.clone());
            }
        }
    }

    /// First page only, hotels without the cursor.
    async fn sample(&self, limit: u32) -> Result<Vec<Hotel>, CatalogError> {
        Ok(self.fetch_page("", limit).await?.hotels)
    }

    pub async fn all_hotels(&self, location: &str) -> Result<Vec<Hotel>, CatalogError> {
        let key = normalize_key(location);
        if let Some(hit) = self.caches.by_location.get(&key) {
            tracing::debug!(location = %key, "location cache hit");
            return Ok(hit);
        }

        let hotels = self.catalog.all_hotels(location).await?;

        self.caches.by_location.set(key, hotels.clone());
        self.cache_by_id(&hotels);

        Ok(hotels)
    }

    pub async fn hotel_by_id(&self, id: &str) -> Result<Option<Hotel>, CatalogError> {
        let key = normalize_key(id);
        if let Some(hit) = self.caches.by_id.get(&key) {
            tracing::debug!(id = %key, "id cache hit");
            return Ok(Some(hit));
        }

        let hotel = self.catalog.hotel_by_id(id).await?;
        if let Some(hotel) = &hotel {
            self.caches.by_id.set(key, hotel.clone());
        }
        Ok(hotel)
    }

    pub async fn featured_hotels(&self) -> Result<Vec<Hotel>, CatalogError> {
        let mut hotels: Vec<Hotel> = self
            .sample(FEATURED_SAMPLE_LIMIT)
            .await?
            .into_iter()
            .filter(|hotel| hotel.rating() >= FEATURED_MIN_RATING)
            .collect();

        hotels.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
        Ok(hotels)
    }

    pub async fn popular_hotels(&self) -> Result<Vec<Hotel>, CatalogError> {
        let mut hotels = self.sample(POPULAR_SAMPLE_LIMIT).await?;

        hotels.sort_by(|a, b| {
            b.rating()
                .total_cmp(&a.rating())
                .then(b.reviews().total_cmp(&a.reviews()))
        });
        hotels.truncate(POPULAR_COUNT);
        Ok(hotels)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::MockCatalog;

    pub fn hotel(value: serde_json::Value) -> Hotel {
        serde_json::from_value(value).unwrap()
    }

    pub fn page(hotels: Vec<Hotel>, next_cursor: Option<&str>) -> HotelsPage {
        HotelsPage {
            hotels,
            next_cursor: next_cursor.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn page_fetch_populates_the_by_id_cache() {
        let mut catalog = MockCatalog::new();
        catalog.expect_hotels_page().times(1).returning(|_, _| {
            Ok(page(
                vec![
                    hotel(json!({"id": "H1", "rating": 4.0})),
                    hotel(json!({"id": "h2"})),
                    hotel(json!({"id": ""})),
                ],
                None,
            ))
        });
        // no hotel_by_id expectation: lookups below must come from cache
        let service = HotelsService::new(catalog);

        service.fetch_page("", 80).await.unwrap();

        let h1 = service.hotel_by_id("h1").await.unwrap().unwrap();
        assert_eq!(h1.rating(), 4.0);
        assert!(service.hotel_by_id("h2").await.unwrap().is_some());
        assert_eq!(service.caches.by_id.len(), 2);
    }

    #[tokio::test]
    async fn all_hotels_caches_under_the_normalized_location() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_all_hotels()
            .times(1)
            .returning(|_| Ok(vec![hotel(json!({"id": "h1"}))]));
        let service = HotelsService::new(catalog);

        let first = service.all_hotels("  Amman ").await.unwrap();
        // hits the cache: the mock only allows one call
        let second = service.all_hotels("amman").await.unwrap();

        assert_eq!(first, second);
        assert!(service.caches.by_id.get("h1").is_some());
    }

    #[tokio::test]
    async fn hotel_by_id_fetches_on_miss_and_caches_the_hit() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_hotel_by_id()
            .times(1)
            .returning(|_| Ok(Some(hotel(json!({"id": "h9"})))));
        let service = HotelsService::new(catalog);

        assert!(service.hotel_by_id("h9").await.unwrap().is_some());
        assert!(service.hotel_by_id("h9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_hotel_is_not_cached() {
        let mut catalog = MockCatalog::new();
        catalog.expect_hotel_by_id().times(2).returning(|_| Ok(None));
        let service = HotelsService::new(catalog);

        assert!(service.hotel_by_id("ghost").await.unwrap().is_none());
        assert!(service.hotel_by_id("ghost").await.unwrap().is_none());
        assert!(service.caches.by_id.is_empty());
    }

    #[tokio::test]
    async fn featured_filters_and_sorts_by_rating() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_hotels_page()
            .withf(|cursor, limit| cursor.is_empty() && *limit == 300)
            .times(1)
            .returning(|_, _| {
                Ok(page(
                    vec![
                        hotel(json!({"id": "mid", "rating": 4.7})),
                        hotel(json!({"id": "low", "rating": 4.5})),
                        hotel(json!({"id": "top", "rating": 4.9})),
                        hotel(json!({"id": "unrated"})),
                    ],
                    None,
                ))
            });
        let service = HotelsService::new(catalog);

        let featured = service.featured_hotels().await.unwrap();
        let ids: Vec<&str> = featured.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["top", "mid"]);
    }

    #[tokio::test]
    async fn popular_breaks_rating_ties_by_reviews() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_hotels_page()
            .withf(|cursor, limit| cursor.is_empty() && *limit == 400)
            .times(1)
            .returning(|_, _| {
                let hotels = (0..8)
                    .map(|i| hotel(json!({"id": format!("filler{i}"), "rating": 3.0})))
                    .chain([
                        hotel(json!({"id": "busy", "rating": 4.5, "reviews": 900})),
                        hotel(json!({"id": "quiet", "rating": 4.5, "reviews": 12})),
                    ])
                    .collect();
                Ok(page(hotels, None))
            });
        let service = HotelsService::new(catalog);

        let popular = service.popular_hotels().await.unwrap();
        assert_eq!(popular.len(), 6);
        assert_eq!(popular[0].id, "busy");
        assert_eq!(popular[1].id, "quiet");
    }

    #[tokio::test]
    async fn transport_errors_propagate_untouched() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_hotels_page()
            .times(1)
            .returning(|_, _| Err(CatalogError::Status(reqwest::StatusCode::BAD_GATEWAY)));
        let service = HotelsService::new(catalog);

        let err = service.fetch_page("", 80).await.unwrap_err();
        assert!(matches!(err, CatalogError::Status(_)));
    }
}
