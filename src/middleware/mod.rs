// ABOUTME: HTTP middleware for request tracing and access logging
// ABOUTME: Provides span creation, request-id propagation, and correlation fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

/// Per-request access log with correlation fields
pub mod logging;
/// Request span creation and request-id propagation
pub mod tracing;

pub use logging::access_log;
pub use tracing::{trace_request, RequestId, REQUEST_ID_HEADER};
