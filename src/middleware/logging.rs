// ABOUTME: Access-log middleware emitting one structured line per request
// ABOUTME: Correlates method, path, status, and duration with the request id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use super::tracing::RequestId;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::info;

/// Middleware logging every completed request
pub async fn access_log(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_owned())
        .unwrap_or_default();

    let response = next.run(req).await;

    info!(
        http.method = %method,
        http.path = %path,
        http.status = response.status().as_u16(),
        http.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        request_id = %request_id,
        "request completed"
    );
    response
}
