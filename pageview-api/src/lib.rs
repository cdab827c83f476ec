//! # Pageview Proxy API Server
//!
//! Caching HTTP front for the Plausible aggregate statistics API, meant to be
//! called from browser widgets on any origin.
//!
//! ## Endpoints
//!
//! - `GET /pageviews?page=<path>` - Pageview count for a page, cached briefly
//! - `GET /health` - Liveness check
//!
//! ## Example
//!
//! ```rust,ignore
//! use pageview_api::{ProxyConfig, ProxyServer};
//!
//! let config = ProxyConfig::from_env()?;
//! let server = ProxyServer::new(config)?;
//! server.run(([0, 0, 0, 0], 7000)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod access_log;
mod coalesce;
mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use access_log::access_log;
pub use coalesce::{Flight, FlightResult, InFlight};
pub use dto::{HealthResponse, Lookup, PageviewsQuery};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, PageviewCache, ProxyConfig};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use pageview_core::error::Result;

/// Wraps the router with CORS, tracing and access logging.
///
/// Every response, errors included, carries `Access-Control-Allow-Origin: *`.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(access_log))
}

/// API server for the pageview proxy.
pub struct ProxyServer {
    config: ProxyConfig,
    state: Arc<AppState>,
}

impl ProxyServer {
    /// Creates a new server backed by the Plausible API.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let state = Arc::new(AppState::from_config(&config)?);
        Ok(Self { config, state })
    }

    /// Returns the shared state.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Creates the router with all routes and layers configured.
    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Runs the server on the given address until Ctrl-C.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let sweeper = self.state.cache.spawn_sweeper();

        info!(
            %addr,
            site_id = %self.config.upstream.site_id,
            ttl = ?self.config.cache.default_ttl,
            sweep_interval = ?self.config.cache.sweep_interval,
            "Pageview proxy listening"
        );

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.stop();
        info!("Pageview proxy stopped");
        served
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available: run until the process is killed
        std::future::pending::<()>().await;
    }
}
