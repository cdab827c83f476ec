//! One log line per completed request.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use chrono::Local;
use tracing::info;

/// Middleware logging timestamp, caller, method, URI and elapsed time.
///
/// The caller address comes from [`ConnectInfo`] and is logged as `-` when
/// the server was not started with connect info.
pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".into());
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    info!(
        target: "access",
        timestamp = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        remote = %remote,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed = ?start.elapsed(),
        "{remote} {method} {uri}"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use pageview_cache::CacheConfig;
    use pageview_core::traits::StatsSource;
    use pageview_core::types::PagePath;

    use crate::state::{AppState, PageviewCache};

    type Fields = HashMap<String, String>;

    /// Collects the fields of every `access` event.
    #[derive(Clone, Default)]
    struct AccessLines(Arc<Mutex<Vec<Fields>>>);

    struct FieldVisitor<'a>(&'a mut Fields);

    impl Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: Subscriber> Layer<S> for AccessLines {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() != "access" {
                return;
            }
            let mut fields = Fields::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.0.lock().unwrap().push(fields);
        }
    }

    struct Fixed;

    #[async_trait]
    impl StatsSource for Fixed {
        async fn fetch_pageviews(&self, _page: &PagePath) -> pageview_core::Result<u64> {
            Ok(12)
        }
    }

    fn app() -> axum::Router {
        let cache = Arc::new(PageviewCache::with_config(CacheConfig {
            default_ttl: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(60),
        }));
        crate::build_app(Arc::new(AppState::new(cache, Arc::new(Fixed))))
    }

    async fn send(request: Request) -> (StatusCode, Vec<Fields>) {
        let lines = AccessLines::default();
        let subscriber = tracing_subscriber::registry().with(lines.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let status = app().oneshot(request).await.unwrap().status();
        let captured = lines.0.lock().unwrap().clone();
        (status, captured)
    }

    #[tokio::test]
    async fn test_logs_one_line_per_request() {
        let caller: SocketAddr = "203.0.113.7:51234".parse().unwrap();
        let request = axum::http::Request::builder()
            .uri("/pageviews?page=/blog/post")
            .extension(ConnectInfo(caller))
            .body(Body::empty())
            .unwrap();

        let (status, lines) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lines.len(), 1);

        let line = &lines[0];
        assert_eq!(line["remote"], "203.0.113.7:51234");
        assert_eq!(line["method"], "GET");
        assert_eq!(line["uri"], "/pageviews?page=/blog/post");
        assert_eq!(line["status"], "200");
        assert!(line.contains_key("elapsed"));
        // %Y-%m-%d %H:%M:%S
        assert_eq!(line["timestamp"].len(), 19);
    }

    #[tokio::test]
    async fn test_logs_failed_requests_without_connect_info() {
        let request = axum::http::Request::builder()
            .uri("/pageviews")
            .body(Body::empty())
            .unwrap();

        let (status, lines) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["remote"], "-");
        assert_eq!(lines[0]["status"], "400");
    }
}
