// ABOUTME: Request tracing middleware for correlation and structured logging
// ABOUTME: Adopts or mints a request id and runs the handler inside a span
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! On entry the middleware adopts the caller's propagation header (or mints a
//! fresh id), opens a request span, re-injects the id into the forwarded
//! request and the response, and records the status on completion. Backend
//! calls made inside the handler inherit the span, so outbound I/O is
//! correlated with the request. Without a subscriber installed all of this
//! is free.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::field::Empty;
use tracing::{Instrument, Span};
use uuid::Uuid;

/// Propagation header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-scoped correlation id, available to inner layers as an extension
#[derive(Debug, Clone)]
pub struct RequestId(String);

impl RequestId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Create the span every request runs in
#[must_use]
pub fn create_request_span(method: &str, path: &str) -> Span {
    tracing::info_span!(
        "http_request",
        otel.kind = "server",
        http.method = %method,
        http.path = %path,
        request_id = Empty,
        status_code = Empty,
    )
}

/// Middleware wrapping the whole request in a span
pub async fn trace_request(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("req_{}", Uuid::new_v4().simple()));

    let span = create_request_span(req.method().as_str(), req.uri().path());
    span.record("request_id", request_id.as_str());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).instrument(span.clone()).await;

    span.record("status_code", response.status().as_u16());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
