//! Admin API handlers.

use super::types::{
    build_response, collect_body, error_response, json_response, parse_json,
    priming_error_response, CountResponse, HealthResponse, PrimeRequest, VerifyRequest,
};
use crate::dispatcher::Dispatcher;
use crate::priming::PrimedMapping;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request as HttpRequest, Response as HttpResponse, StatusCode};
use tracing::info;

type AdminResponse = HttpResponse<Full<Bytes>>;

async fn read_body(req: HttpRequest<Incoming>) -> Result<Bytes, AdminResponse> {
    collect_body(req)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))
}

/// GET /__admin/health
pub fn handle_health() -> AdminResponse {
    json_response(StatusCode::OK, &HealthResponse { status: "ok" })
}

/// GET /__admin/primings
pub fn handle_list(dispatcher: &Dispatcher) -> AdminResponse {
    json_response(StatusCode::OK, &dispatcher.current_priming())
}

/// POST /__admin/primings - queue a one-shot response
pub async fn handle_prime(req: HttpRequest<Incoming>, dispatcher: &Dispatcher) -> AdminResponse {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let prime: PrimeRequest = match parse_json(&body, "priming") {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match dispatcher.prime(prime.request, prime.response) {
        Ok(mapping) => {
            info!("Primed {}", mapping.request());
            json_response(StatusCode::CREATED, &mapping)
        }
        Err(e) => priming_error_response(&e),
    }
}

/// POST /__admin/primings/default - set the standing response for a pattern
pub async fn handle_prime_default(
    req: HttpRequest<Incoming>,
    dispatcher: &Dispatcher,
) -> AdminResponse {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let prime: PrimeRequest = match parse_json(&body, "priming") {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match dispatcher.prime_default(prime.request, prime.response) {
        Ok(mapping) => {
            info!("Primed default for {}", mapping.request());
            json_response(StatusCode::CREATED, &mapping)
        }
        Err(e) => priming_error_response(&e),
    }
}

/// PUT /__admin/primings - apply an exported batch of mappings
pub async fn handle_prime_batch(
    req: HttpRequest<Incoming>,
    dispatcher: &Dispatcher,
) -> AdminResponse {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let mappings: Vec<PrimedMapping> = match parse_json(&body, "priming batch") {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    match dispatcher.prime_batch(mappings) {
        Ok(()) => json_response(StatusCode::OK, &dispatcher.current_priming()),
        Err(e) => priming_error_response(&e),
    }
}

/// DELETE /__admin/primings - clear primings and both logs
pub fn handle_reset(dispatcher: &Dispatcher) -> AdminResponse {
    dispatcher.reset();
    build_response(StatusCode::NO_CONTENT, Bytes::new())
}

/// GET /__admin/history
pub fn handle_history(dispatcher: &Dispatcher) -> AdminResponse {
    json_response(StatusCode::OK, &dispatcher.history())
}

/// GET /__admin/failed
pub fn handle_failed(dispatcher: &Dispatcher) -> AdminResponse {
    json_response(StatusCode::OK, &dispatcher.failed_requests())
}

/// POST /__admin/verify
pub async fn handle_verify(req: HttpRequest<Incoming>, dispatcher: &Dispatcher) -> AdminResponse {
    let body = match read_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let verify: VerifyRequest = match parse_json(&body, "verification") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match dispatcher.verify(&verify.request, verify.times) {
        Ok(count) => json_response(StatusCode::OK, &CountResponse { count }),
        Err(e) => priming_error_response(&e),
    }
}
