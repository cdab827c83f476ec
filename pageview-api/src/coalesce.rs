//! Per-page flights that collapse concurrent cache misses into one upstream call.

use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

use pageview_core::error::{ProxyError, Result};
use pageview_core::types::PagePath;

/// Outcome of a flight, handed to every request that joined it.
pub type FlightResult<T> = std::result::Result<T, Arc<ProxyError>>;

/// A running fetch that any number of requests can await.
pub type Flight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

/// Set of pages currently being fetched.
///
/// The first request to miss on a page starts a flight on its own task; later
/// requests for the same page await that flight and receive the same value or
/// the same error. The task removes its entry when it finishes, whether or not
/// anyone is still waiting.
pub struct InFlight<T> {
    flights: Arc<DashMap<PagePath, Flight<T>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the flight for `page`, starting one with `fetch` if none is running.
    ///
    /// Returns the flight and whether this call started it. `fetch` is only
    /// invoked when a new flight starts. Must be called within a tokio runtime.
    pub fn join<F, Fut>(&self, page: &PagePath, fetch: F) -> (Flight<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match self.flights.entry(page.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let flights = Arc::clone(&self.flights);
                let key = page.clone();
                let fetch = fetch();

                // the entry lock is held until the insert below, so this
                // removal can never run before the flight is registered
                let task = tokio::spawn(async move {
                    let result = fetch.await.map_err(Arc::new);
                    flights.remove(&key);
                    result
                });

                let flight = async move {
                    task.await.unwrap_or_else(|e| {
                        Err(Arc::new(ProxyError::UpstreamTransport(format!(
                            "fetch task failed: {e}"
                        ))))
                    })
                }
                .boxed()
                .shared();

                entry.insert(flight.clone());
                (flight, true)
            }
        }
    }

    /// Number of pages with a running flight.
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Returns true if no page is being fetched.
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn page(raw: &str) -> PagePath {
        PagePath::parse(Some(raw)).unwrap()
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        answer: Result<u64>,
    ) -> impl Future<Output = Result<u64>> + Send + 'static {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            answer
        }
    }

    #[tokio::test]
    async fn test_flight_removed_after_completion() {
        let inflight = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (flight, started) =
            inflight.join(&page("/a"), || counted(&calls, Duration::ZERO, Ok(3)));
        assert!(started);
        assert_eq!(inflight.len(), 1);
        assert_eq!(flight.await.unwrap(), 3);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_joiners_share_one_fetch() {
        let inflight = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_millis(30);

        let joins: Vec<_> = (0..6)
            .map(|_| inflight.join(&page("/same"), || counted(&calls, delay, Ok(11))))
            .collect();
        assert_eq!(joins.iter().filter(|(_, started)| *started).count(), 1);

        let results = futures::future::join_all(joins.into_iter().map(|(f, _)| f)).await;
        assert!(results.iter().all(|r| matches!(r, Ok(11))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_shared_without_refetching() {
        let inflight = InFlight::<u64>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_millis(100);
        let failing =
            || counted(&calls, delay, Err(ProxyError::UpstreamTransport("timed out".into())));

        let start = Instant::now();
        let flights: Vec<_> = (0..5).map(|_| inflight.join(&page("/down"), failing).0).collect();
        let results = futures::future::join_all(flights).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < delay * 2);
        for result in results {
            let err = result.unwrap_err();
            assert!(matches!(*err, ProxyError::UpstreamTransport(_)));
        }
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_flight_finishes_when_every_caller_is_gone() {
        let inflight = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (flight, _) = inflight.join(&page("/abandoned"), || {
            counted(&calls, Duration::from_millis(10), Ok(1))
        });
        drop(flight);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_different_pages_fly_separately() {
        let inflight = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (_, a) = inflight.join(&page("/a"), || counted(&calls, Duration::from_millis(20), Ok(1)));
        let (_, b) = inflight.join(&page("/b"), || counted(&calls, Duration::from_millis(20), Ok(2)));
        assert!(a && b);
        assert_eq!(inflight.len(), 2);
    }
}
