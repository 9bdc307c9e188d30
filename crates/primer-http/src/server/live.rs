//! Live-traffic handling: HTTP request in, primed response out.

use super::types::{build_response_with_headers, error_response, priming_error_response};
use crate::dispatcher::Dispatcher;
use crate::model::{parse_query_multimap, BodyContent, Request, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::http::request::Parts;
use hyper::{Request as HttpRequest, Response as HttpResponse, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub async fn handle(
    req: HttpRequest<Incoming>,
    dispatcher: Arc<Dispatcher>,
) -> HttpResponse<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            )
        }
    };

    let request = normalize(&parts, &body);
    let response = match dispatcher.serve(request) {
        Ok(response) => response,
        Err(e) => return priming_error_response(&e),
    };

    // The store lock is released by now
    if let Some(delay) = response.delay() {
        debug!(delay_ms = delay.as_millis() as u64, "Delaying response");
        tokio::time::sleep(delay).await;
    }

    render(&response)
}

/// Convert an incoming HTTP request into the value the matcher sees.
pub(crate) fn normalize(parts: &Parts, body: &[u8]) -> Request {
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in &parts.headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let request = Request::new(parts.method.as_str(), parts.uri.path())
        .with_headers(headers)
        .with_query_params(parse_query_multimap(parts.uri.query()));

    match BodyContent::from_wire_text(&String::from_utf8_lossy(body)) {
        Some(content) => request.with_body(content),
        None => request,
    }
}

/// Write a primed response to the wire.
pub(crate) fn render(response: &Response) -> HttpResponse<Full<Bytes>> {
    let status = match StatusCode::from_u16(response.status_code()) {
        Ok(s) => s,
        Err(_) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Invalid primed status code {}", response.status_code()),
            )
        }
    };

    let mut headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let body = match response.body() {
        Some(content) => {
            let has_content_type = headers
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
            if content.is_structured() && !has_content_type {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
            content.to_wire_text()
        }
        None => String::new(),
    };

    build_response_with_headers(status, headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts(method: &str, uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_normalize_request() {
        let parts = parts(
            "post",
            "/orders?tag=a&tag=b%20c&q=x+y",
            &[("X-Trace", "1"), ("Accept", "text/plain")],
        );
        let request = normalize(&parts, br#"{"qty": 2.0}"#);

        assert_eq!(request.method(), Some("POST"));
        assert_eq!(request.path(), "/orders");
        assert_eq!(request.headers().get("x-trace").unwrap(), "1");
        assert_eq!(request.headers().get("accept").unwrap(), "text/plain");
        assert_eq!(
            request.query_params().get("tag").unwrap(),
            &vec!["a".to_string(), "b c".to_string()]
        );
        assert_eq!(request.query_params().get("q").unwrap(), &vec!["x y".to_string()]);
        assert_eq!(request.body(), Some(&BodyContent::from_json(json!({"qty": 2}))));
    }

    #[test]
    fn test_normalize_plain_text_and_empty_body() {
        let request = normalize(&parts("GET", "/a", &[]), b"hello");
        assert_eq!(request.body(), Some(&BodyContent::json_string("hello")));

        let request = normalize(&parts("GET", "/a", &[]), b"");
        assert_eq!(request.body(), None);
    }

    #[test]
    fn test_normalize_joins_repeated_headers() {
        let request = normalize(&parts("GET", "/a", &[("accept", "a"), ("accept", "b")]), b"");
        assert_eq!(request.headers().get("accept").unwrap(), "a, b");
    }

    #[test]
    fn test_render_structured_body_sets_content_type() {
        let response = Response::new(201).with_body(BodyContent::from_json(json!({"ok": true})));
        let rendered = render(&response);
        assert_eq!(rendered.status(), StatusCode::CREATED);
        assert_eq!(
            rendered.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_render_keeps_primed_content_type() {
        let response = Response::ok()
            .with_header("Content-Type", "application/vnd.api+json")
            .with_body(BodyContent::from_json(json!([1, 2])));
        let rendered = render(&response);
        assert_eq!(
            rendered.headers().get("content-type").unwrap(),
            "application/vnd.api+json"
        );
    }

    #[test]
    fn test_render_text_body_has_no_implied_content_type() {
        let response = Response::ok().with_body(BodyContent::json_string("plain"));
        let rendered = render(&response);
        assert!(rendered.headers().get("content-type").is_none());
    }
}
