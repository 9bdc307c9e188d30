//! Admin API payloads and response helpers.

use crate::error::PrimingError;
use crate::model::{Request, Response};
use crate::verify::Times;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request as HttpRequest, Response as HttpResponse, StatusCode};
use serde::{Deserialize, Serialize};

/// Body of `POST /__admin/primings` and `POST /__admin/primings/default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimeRequest {
    pub request: Request,
    pub response: Response,
}

/// Body of `POST /__admin/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub request: Request,
    pub times: Times,
}

/// Successful verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with the given status and body.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse<Full<Bytes>> {
    HttpResponse::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

/// Build an HTTP response with headers.
///
/// Falls back to a bare 500 if a header name or value is not valid HTTP.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> HttpResponse<Full<Bytes>> {
    let mut builder = HttpResponse::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

fn internal_error() -> HttpResponse<Full<Bytes>> {
    let mut response = HttpResponse::new(Full::new(Bytes::from("Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

pub fn not_found() -> HttpResponse<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Map a core error onto its HTTP status.
pub fn priming_error_response(err: &PrimingError) -> HttpResponse<Full<Bytes>> {
    let status = match err {
        PrimingError::PrimingNotFound(_) => StatusCode::NOT_FOUND,
        PrimingError::InvalidPriming(_) => StatusCode::BAD_REQUEST,
        PrimingError::VerificationFailed { .. } => StatusCode::EXPECTATION_FAILED,
    };
    error_response(status, &err.to_string())
}

/// Collect request body into bytes
pub async fn collect_body(req: HttpRequest<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Parse a JSON admin payload, or produce the 400 to send back.
pub fn parse_json<T: serde::de::DeserializeOwned>(
    body: &[u8],
    what: &str,
) -> Result<T, HttpResponse<Full<Bytes>>> {
    serde_json::from_slice(body).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid {what} JSON: {e}"))
    })
}
