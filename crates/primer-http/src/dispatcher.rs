//! Shared priming state driven by the HTTP front end.
//!
//! One `Dispatcher` owns a [`PrimingStore`] and the two [`BoundedLog`]s for
//! the lifetime of a server. It is injected into each request handler as an
//! `Arc<Dispatcher>`, so any number of independent servers can live in one
//! process.
//!
//! Concurrency:
//! - the store sits behind a single `parking_lot::Mutex`; find-poll-remove in
//!   `serve` and every priming call run as one critical section
//! - logs synchronize themselves but are written and cleared while the store
//!   lock is held, so history never outlives the reset that cleared it
//! - response delays are never slept while holding the store lock

use crate::error::PrimingError;
use crate::journal::{BoundedLog, Exchange};
use crate::matcher::{matches, validate_pattern};
use crate::model::{Request, Response};
use crate::priming::{PrimedMapping, PrimingStore, QueueDefault, StandingDefault};
use crate::verify::Times;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Default capacity for both the history and failed-request logs.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct Dispatcher {
    store: Mutex<PrimingStore>,
    history: BoundedLog<Exchange>,
    failed: BoundedLog<Request>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, DEFAULT_LOG_CAPACITY)
    }
}

impl Dispatcher {
    pub fn new(history_capacity: usize, failed_capacity: usize) -> Self {
        Self::with_standing_defaults(history_capacity, failed_capacity, Vec::new())
    }

    /// Create a dispatcher whose store is seeded with defaults that survive `reset()`.
    pub fn with_standing_defaults(
        history_capacity: usize,
        failed_capacity: usize,
        standing: Vec<StandingDefault>,
    ) -> Self {
        Self {
            store: Mutex::new(PrimingStore::with_standing_defaults(standing)),
            history: BoundedLog::new(history_capacity),
            failed: BoundedLog::new(failed_capacity),
        }
    }

    /// Queue `response` for `request`.
    pub fn prime(&self, request: Request, response: Response) -> Result<PrimedMapping, PrimingError> {
        reject_invalid(&request)?;
        Ok(self.store.lock().add(request, response))
    }

    /// Set a static default for `request`.
    pub fn prime_default(
        &self,
        request: Request,
        response: Response,
    ) -> Result<PrimedMapping, PrimingError> {
        reject_invalid(&request)?;
        Ok(self
            .store
            .lock()
            .add_default(request, QueueDefault::Value(response)))
    }

    /// Set a default computed fresh on every request.
    pub fn prime_default_with<F>(
        &self,
        request: Request,
        generator: F,
    ) -> Result<PrimedMapping, PrimingError>
    where
        F: Fn() -> Response + Send + Sync + 'static,
    {
        reject_invalid(&request)?;
        Ok(self
            .store
            .lock()
            .add_default(request, QueueDefault::generator(generator)))
    }

    /// Apply a batch of exported mappings.
    ///
    /// Every pattern is validated first; nothing is applied if any is invalid.
    pub fn prime_batch(&self, mappings: Vec<PrimedMapping>) -> Result<(), PrimingError> {
        for mapping in &mappings {
            reject_invalid(mapping.request())?;
        }
        let count = mappings.len();
        self.store.lock().upload_batch(mappings);
        info!("Uploaded {} primed mapping(s)", count);
        Ok(())
    }

    /// Remove the priming for a structurally-equal pattern.
    pub fn remove(&self, request: &Request) -> Option<PrimedMapping> {
        self.store.lock().remove(request)
    }

    pub fn current_priming(&self) -> Vec<PrimedMapping> {
        self.store.lock().current_priming()
    }

    /// Capacities of the history and failed-request logs.
    pub fn log_capacities(&self) -> (usize, usize) {
        (self.history.capacity(), self.failed.capacity())
    }

    pub fn history(&self) -> Vec<Exchange> {
        self.history.values()
    }

    pub fn failed_requests(&self) -> Vec<Request> {
        self.failed.values()
    }

    /// Live-traffic entry point.
    ///
    /// A hit is recorded in history; a miss is recorded in the failed log and
    /// returned as [`PrimingError::PrimingNotFound`]. The response's delay is
    /// left to the caller.
    pub fn serve(&self, request: Request) -> Result<Response, PrimingError> {
        // Logged under the store lock so no record outlives a concurrent reset
        let mut store = self.store.lock();
        match store.get_response(&request) {
            Some(response) => {
                self.history
                    .add(Exchange::new(request.clone(), response.clone()));
                drop(store);
                debug!(
                    method = request.method().unwrap_or_default(),
                    path = %request.path(),
                    status = response.status_code(),
                    "Served primed response"
                );
                Ok(response)
            }
            None => {
                self.failed.add(request.clone());
                drop(store);
                warn!("No priming matches {}", request);
                Err(PrimingError::PrimingNotFound(Box::new(request)))
            }
        }
    }

    /// [`serve`](Self::serve), then block the calling thread for the response's delay.
    ///
    /// For thread-per-request front ends. The store lock is already released
    /// when the sleep starts.
    pub fn serve_blocking(&self, request: Request) -> Result<Response, PrimingError> {
        let response = self.serve(request)?;
        if let Some(delay) = response.delay() {
            std::thread::sleep(delay);
        }
        Ok(response)
    }

    /// Number of history entries matched by `pattern`.
    pub fn count(&self, pattern: &Request) -> usize {
        self.history
            .count(|exchange| matches(pattern, &exchange.request))
    }

    /// Check the invocation count of `pattern` against `times`.
    pub fn verify(&self, pattern: &Request, times: Times) -> Result<usize, PrimingError> {
        let actual = self.count(pattern);
        if times.is_satisfied_by(actual) {
            Ok(actual)
        } else {
            Err(PrimingError::VerificationFailed {
                request: Box::new(pattern.clone()),
                expected: times,
                actual,
            })
        }
    }

    /// Clear primings and both logs; standing defaults are re-seeded.
    pub fn reset(&self) {
        let mut store = self.store.lock();
        store.reset();
        self.history.clear();
        self.failed.clear();
        drop(store);
        info!("Primings and request logs reset");
    }
}

fn reject_invalid(request: &Request) -> Result<(), PrimingError> {
    validate_pattern(request).map_err(|e| {
        warn!("Rejected priming for {}: {}", request, e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BodyContent;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn widgets_ok() -> Response {
        Response::ok().with_body(BodyContent::from_json(json!({"ok": true})))
    }

    #[test]
    fn test_serve_then_not_found() {
        let dispatcher = Dispatcher::default();
        dispatcher
            .prime(Request::get("/widgets"), widgets_ok())
            .unwrap();

        let response = dispatcher.serve(Request::get("/widgets")).unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(
            response.body(),
            Some(&BodyContent::from_json(json!({"ok": true})))
        );

        let err = dispatcher.serve(Request::get("/widgets")).unwrap_err();
        assert!(matches!(err, PrimingError::PrimingNotFound(_)));

        assert_eq!(dispatcher.failed_requests(), vec![Request::get("/widgets")]);
        assert_eq!(dispatcher.history().len(), 1);
    }

    #[test]
    fn test_prime_rejects_invalid_pattern() {
        let dispatcher = Dispatcher::default();
        let err = dispatcher
            .prime(Request::get("/a").without_method(), Response::ok())
            .unwrap_err();
        assert!(matches!(err, PrimingError::InvalidPriming(_)));
        assert!(dispatcher.current_priming().is_empty());
    }

    #[test]
    fn test_prime_batch_is_all_or_nothing() {
        let dispatcher = Dispatcher::default();
        let batch = vec![
            PrimedMapping::new(
                Request::get("/ok"),
                crate::priming::DefaultingQueue::single(Response::ok()),
            ),
            PrimedMapping::new(
                Request::get("/bad("),
                crate::priming::DefaultingQueue::single(Response::ok()),
            ),
        ];
        assert!(dispatcher.prime_batch(batch).is_err());
        assert!(dispatcher.current_priming().is_empty());
    }

    #[test]
    fn test_verify_counts_matching_history() {
        let dispatcher = Dispatcher::default();
        dispatcher
            .prime_default(Request::get("/items/[0-9]+"), Response::ok())
            .unwrap();
        dispatcher.serve(Request::get("/items/1")).unwrap();
        dispatcher.serve(Request::get("/items/2")).unwrap();

        assert_eq!(
            dispatcher
                .verify(&Request::get("/items/[0-9]+"), Times::Exactly(2))
                .unwrap(),
            2
        );
        assert_eq!(
            dispatcher.verify(&Request::get("/items/1"), Times::once()).unwrap(),
            1
        );

        match dispatcher.verify(&Request::get("/items/3"), Times::AtLeast(1)) {
            Err(PrimingError::VerificationFailed {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Times::AtLeast(1));
                assert_eq!(actual, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_reset_clears_logs_and_keeps_standing_defaults() {
        let dispatcher = Dispatcher::with_standing_defaults(
            10,
            10,
            vec![(
                Request::get("/health"),
                QueueDefault::Value(Response::new(204)),
            )],
        );
        dispatcher.prime(Request::get("/a"), Response::ok()).unwrap();
        dispatcher.serve(Request::get("/a")).unwrap();
        let _ = dispatcher.serve(Request::get("/missing"));

        dispatcher.reset();
        assert!(dispatcher.history().is_empty());
        assert!(dispatcher.failed_requests().is_empty());
        assert_eq!(dispatcher.current_priming().len(), 1);
        assert_eq!(
            dispatcher.serve(Request::get("/health")).unwrap().status_code(),
            204
        );
    }

    #[test]
    fn test_prime_default_with_generator() {
        let dispatcher = Dispatcher::default();
        let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let generator_counter = Arc::clone(&counter);
        dispatcher
            .prime_default_with(Request::get("/tick"), move || {
                let n = generator_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Response::ok().with_body(BodyContent::literal(n))
            })
            .unwrap();

        for expected in 0..3u64 {
            let response = dispatcher.serve(Request::get("/tick")).unwrap();
            assert_eq!(response.body(), Some(&BodyContent::literal(expected)));
        }
    }

    #[test]
    fn test_concurrent_serve_never_duplicates_entries() {
        let dispatcher = Arc::new(Dispatcher::default());
        for i in 0..200 {
            dispatcher
                .prime(
                    Request::get("/queue"),
                    Response::ok().with_body(BodyContent::literal(i)),
                )
                .unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    let mut served = Vec::new();
                    while let Ok(response) = dispatcher.serve(Request::get("/queue")) {
                        served.push(response.body().cloned());
                    }
                    served
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        assert_eq!(all.len(), 200);
        let unique: HashSet<String> = all
            .iter()
            .map(|b| b.as_ref().map(BodyContent::to_wire_text).unwrap_or_default())
            .collect();
        assert_eq!(unique.len(), 200);
        assert!(dispatcher.current_priming().is_empty());
        assert_eq!(dispatcher.history().len(), 200);
    }

    #[test]
    fn test_blocking_delays_run_in_parallel() {
        let dispatcher = Arc::new(Dispatcher::default());
        dispatcher
            .prime_default(
                Request::get("/slow"),
                Response::ok().with_delay(Duration::from_millis(300)),
            )
            .unwrap();
        for i in 0..5 {
            dispatcher
                .prime(Request::get(format!("/once/{i}")), Response::ok())
                .unwrap();
        }

        let start = Instant::now();
        let handles: Vec<_> = (0..5)
            .flat_map(|i| {
                let slow = Arc::clone(&dispatcher);
                let fast = Arc::clone(&dispatcher);
                [
                    thread::spawn(move || slow.serve_blocking(Request::get("/slow")).is_ok()),
                    thread::spawn(move || {
                        fast.serve_blocking(Request::get(format!("/once/{i}"))).is_ok()
                    }),
                ]
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        // Five sequential delays would take 1.5s
        assert!(start.elapsed() < Duration::from_millis(1200));
    }

    #[test]
    fn test_reset_discards_exchanges_served_before_it() {
        use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

        let epoch = Arc::new(AtomicU64::new(0));
        let generator_epoch = Arc::clone(&epoch);
        let dispatcher = Arc::new(Dispatcher::with_standing_defaults(
            1_000,
            10,
            vec![(
                Request::get("/tick"),
                QueueDefault::generator(move || {
                    Response::ok()
                        .with_body(BodyContent::literal(generator_epoch.load(Ordering::SeqCst)))
                }),
            )],
        ));
        let stop = Arc::new(AtomicBool::new(false));

        let servers: Vec<_> = (0..4)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        dispatcher.serve(Request::get("/tick")).unwrap();
                    }
                })
            })
            .collect();

        for generation in 1..=100u64 {
            epoch.store(generation, Ordering::SeqCst);
            dispatcher.reset();
            let stale = dispatcher.history().into_iter().find(|exchange| {
                match exchange.response.body() {
                    Some(BodyContent::Literal(value)) => value.as_u64() < Some(generation),
                    _ => true,
                }
            });
            assert!(stale.is_none(), "generation {generation} kept {stale:?}");
        }

        stop.store(true, Ordering::SeqCst);
        for handle in servers {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_remove_priming() {
        let dispatcher = Dispatcher::default();
        dispatcher.prime(Request::get("/a"), Response::ok()).unwrap();
        dispatcher.prime(Request::get("/b"), Response::ok()).unwrap();

        let removed = dispatcher.remove(&Request::get("/a")).unwrap();
        assert_eq!(removed.request(), &Request::get("/a"));
        assert!(dispatcher.remove(&Request::get("/a")).is_none());
        assert!(matches!(
            dispatcher.serve(Request::get("/a")),
            Err(PrimingError::PrimingNotFound(_))
        ));
        assert_eq!(dispatcher.current_priming().len(), 1);
    }
}
