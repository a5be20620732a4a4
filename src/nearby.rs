use std::sync::Arc;

use ahash::HashMap;
use tokio::sync::{Mutex, OnceCell};

use crate::{
    catalog::{Catalog, CatalogError, Hotel},
    geo::rank_by_distance,
    service::HotelsService,
};

/// Pending nearby lookups, keyed identically to the nearby cache. Concurrent
/// callers with the same key await one shared fetch instead of each driving
/// their own pagination.
pub(crate) type InFlight = Mutex<HashMap<String, Arc<OnceCell<Vec<Hotel>>>>>;

#[derive(Debug, Clone, Copy)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    /// how many hotels to return
    pub limit: usize,
    /// distance under which a hotel counts as "close enough"
    pub target_km: f64,
    /// page size per catalog fetch
    pub page_limit: u32,
    /// hard fetch budget
    pub max_pages: u32,
}

impl NearbyQuery {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            limit: 12,
            target_km: 20.0,
            page_limit: 80,
            max_pages: 3,
        }
    }
}

/// Coordinates are bucketed to 2 decimal places (about 1.1 km grid cells at
/// the equator) so nearby users share cache entries. Precision traded for
/// hit rate.
fn nearby_key(lat: f64, lon: f64, limit: usize, target_km: f64) -> String {
    format!("{lat:.2},{lon:.2}|l={limit}|km={target_km}")
}

impl<C: Catalog> HotelsService<C> {
    /// Finds up to `limit` hotels within `target_km` of the origin, fetching
    /// as few catalog pages as possible. When the budget or the catalog runs
    /// out first, falls back to the closest hotels available, so the result
    /// is only artificially empty when the origin itself is unusable.
    pub async fn nearby_hotels(&self, query: NearbyQuery) -> Result<Vec<Hotel>, CatalogError> {
        if !query.lat.is_finite() || !query.lon.is_finite() {
            return Ok(Vec::new());
        }

        let query = NearbyQuery {
            limit: query.limit.max(1),
            target_km: query.target_km.max(1.0),
            ..query
        };
        let key = nearby_key(query.lat, query.lon, query.limit, query.target_km);

        if let Some(hit) = self.caches.nearby.get(&key) {
            tracing::debug!(%key, "nearby cache hit");
            return Ok(hit);
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key.clone()).or_default().clone()
        };

        let result = cell
            .get_or_try_init(|| self.nearby_uncached(&key, query))
            .await
            .cloned();

        self.in_flight.lock().await.remove(&key);

        result
    }

    async fn nearby_uncached(
        &self,
        key: &str,
        query: NearbyQuery,
    ) -> Result<Vec<Hotel>, CatalogError> {
        let mut all: Vec<Hotel> = Vec::new();
        let mut cursor = String::new();

        // pages are fetched strictly sequentially: each iteration's exit
        // decision depends on the cumulative ranked result so far
        for _ in 0..query.max_pages {
            let page = self.fetch_page(&cursor, query.page_limit).await?;
            all.extend(page.hotels);
            cursor = page.next_cursor.unwrap_or_default();

            let ranked = rank_by_distance(&all, query.lat, query.lon);
            let close: Vec<_> = ranked
                .iter()
                .filter(|r| r.dist_km <= query.target_km)
                .collect();

            if close.len() >= query.limit {
                let out: Vec<Hotel> = close
                    .into_iter()
                    .take(query.limit)
                    .map(|r| r.hotel.clone())
                    .collect();
                self.caches.nearby.set(key.to_string(), out.clone());
                return Ok(out);
            }

            if cursor.is_empty() {
                break;
            }
        }

        // best effort: the closest hotels available, even when none of them
        // made the target distance
        let out: Vec<Hotel> = rank_by_distance(&all, query.lat, query.lon)
            .into_iter()
            .take(query.limit)
            .map(|r| r.hotel.clone())
            .collect();
        self.caches.nearby.set(key.to_string(), out.clone());
        Ok(out)
    }
}
