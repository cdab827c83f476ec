//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    Json,
};
use tracing::debug;

use pageview_core::traits::StatsSource;
use pageview_core::types::PagePath;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::{AppState, PageviewCache};

type Result<T> = std::result::Result<T, ApiError>;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache_entries: state.cache.len(),
    })
}

/// GET /pageviews?page=<path>
///
/// Serves from cache when possible. On a miss, every concurrent request for
/// the same page awaits one upstream call and shares its value or its error.
/// Only the request that started the call reports a fresh count.
pub async fn get_pageviews(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<PageviewsResponse>> {
    let params = PageviewsQuery::from_raw(query.as_deref());
    let page = PagePath::parse(params.page.as_deref())?;

    if let Some(pageviews) = state.cache.get(&page) {
        debug!(%page, pageviews, "Cache hit");
        return Ok(Json(PageviewsResponse::cached(pageviews, &page)));
    }

    let (flight, started) = state.inflight.join(&page, || {
        fetch_and_cache(state.cache.clone(), state.source.clone(), page.clone())
    });

    let response = match flight.await? {
        Lookup::Fetched(pageviews) if started => {
            debug!(%page, pageviews, "Cached fresh pageviews");
            PageviewsResponse::fresh(pageviews, &page)
        }
        Lookup::Fetched(pageviews) | Lookup::Cached(pageviews) => {
            debug!(%page, pageviews, "Served from a concurrent fetch");
            PageviewsResponse::cached(pageviews, &page)
        }
    };
    Ok(Json(response))
}

async fn fetch_and_cache(
    cache: Arc<PageviewCache>,
    source: Arc<dyn StatsSource>,
    page: PagePath,
) -> pageview_core::Result<Lookup> {
    // a flight that ended after our lookup has already filled the cache
    if let Some(pageviews) = cache.get(&page) {
        return Ok(Lookup::Cached(pageviews));
    }

    let pageviews = source.fetch_pageviews(&page).await?;
    cache.insert(page, pageviews);
    Ok(Lookup::Fetched(pageviews))
}
