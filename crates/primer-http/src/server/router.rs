//! Route dispatch between the admin API and live traffic.

use super::types::not_found;
use super::{admin, live};
use crate::dispatcher::Dispatcher;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request as HttpRequest, Response as HttpResponse};
use std::sync::Arc;
use tracing::debug;

/// Reserved path prefix for the admin API. Nothing under it is live traffic.
pub const ADMIN_PREFIX: &str = "/__admin";

/// Parsed admin route, relative to [`ADMIN_PREFIX`].
#[derive(Debug, PartialEq, Eq)]
enum AdminRoute {
    /// GET /health
    Health,
    /// GET/POST/PUT/DELETE /primings
    Primings,
    /// POST /primings/default
    DefaultPrimings,
    /// GET /history
    History,
    /// GET /failed
    Failed,
    /// POST /verify
    Verify,
}

impl AdminRoute {
    fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split('/')
            .collect();
        match segments.as_slice() {
            ["health"] => Some(AdminRoute::Health),
            ["primings"] => Some(AdminRoute::Primings),
            ["primings", "default"] => Some(AdminRoute::DefaultPrimings),
            ["history"] => Some(AdminRoute::History),
            ["failed"] => Some(AdminRoute::Failed),
            ["verify"] => Some(AdminRoute::Verify),
            _ => None,
        }
    }
}

/// Path relative to the admin prefix, if `path` is an admin path.
fn admin_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(ADMIN_PREFIX)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

/// Main request router
pub async fn route_request(
    req: HttpRequest<Incoming>,
    dispatcher: Arc<Dispatcher>,
) -> Result<HttpResponse<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();

    let response = match admin_path(&path) {
        Some(rest) => {
            debug!("Admin API: {} {}", req.method(), path);
            route_admin(req, rest, dispatcher).await
        }
        None => live::handle(req, dispatcher).await,
    };
    Ok(response)
}

async fn route_admin(
    req: HttpRequest<Incoming>,
    path: &str,
    dispatcher: Arc<Dispatcher>,
) -> HttpResponse<Full<Bytes>> {
    let route = match AdminRoute::parse(path) {
        Some(r) => r,
        None => return not_found(),
    };

    match (req.method().clone(), route) {
        (Method::GET, AdminRoute::Health) => admin::handle_health(),

        (Method::GET, AdminRoute::Primings) => admin::handle_list(&dispatcher),
        (Method::POST, AdminRoute::Primings) => admin::handle_prime(req, &dispatcher).await,
        (Method::PUT, AdminRoute::Primings) => admin::handle_prime_batch(req, &dispatcher).await,
        (Method::DELETE, AdminRoute::Primings) => admin::handle_reset(&dispatcher),

        (Method::POST, AdminRoute::DefaultPrimings) => {
            admin::handle_prime_default(req, &dispatcher).await
        }

        (Method::GET, AdminRoute::History) => admin::handle_history(&dispatcher),
        (Method::GET, AdminRoute::Failed) => admin::handle_failed(&dispatcher),
        (Method::POST, AdminRoute::Verify) => admin::handle_verify(req, &dispatcher).await,

        _ => not_found(),
    }
}
