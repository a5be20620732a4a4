use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    app_state::AppState,
    catalog::{CatalogError, Hotel},
    nearby::NearbyQuery,
};

pub fn make_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hotels", get(all_hotels))
        .route("/hotels/nearby", get(nearby_hotels))
        .route("/hotels/featured", get(featured_hotels))
        .route("/hotels/popular", get(popular_hotels))
        .route("/hotels/:id", get(hotel_by_id))
}

#[derive(Deserialize)]
struct LocationParams {
    location: Option<String>,
}

async fn all_hotels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationParams>,
) -> Result<Json<Vec<Hotel>>, CatalogError> {
    let location = params.location.as_deref().unwrap_or("");
    Ok(Json(state.hotels.all_hotels(location).await?))
}

#[derive(Deserialize)]
struct NearbyParams {
    lat: Option<f64>,
    lon: Option<f64>,
    limit: Option<usize>,
    target_km: Option<f64>,
}

async fn nearby_hotels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<Hotel>>, CatalogError> {
    // missing coordinates become NaN and short-circuit to an empty result
    let mut query = NearbyQuery::new(
        params.lat.unwrap_or(f64::NAN),
        params.lon.unwrap_or(f64::NAN),
    );
    if let Some(limit) = params.limit {
        query.limit = limit;
    }
    if let Some(target_km) = params.target_km {
        query.target_km = target_km;
    }

    Ok(Json(state.hotels.nearby_hotels(query).await?))
}

async fn featured_hotels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Hotel>>, CatalogError> {
    Ok(Json(state.hotels.featured_hotels().await?))
}

async fn popular_hotels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Hotel>>, CatalogError> {
    Ok(Json(state.hotels.popular_hotels().await?))
}

async fn hotel_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    Ok(match state.hotels.hotel_by_id(&id).await? {
        Some(hotel) => Json(hotel).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "hotel not found" })),
        )
            .into_response(),
    })
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match &self {
            CatalogError::Network(_) | CatalogError::Status(_) => StatusCode::BAD_GATEWAY,
            CatalogError::JsonParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": format!("{self}") }))).into_response()
    }
}
