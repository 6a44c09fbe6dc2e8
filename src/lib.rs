// ABOUTME: Library entry point for the authgate login service
// ABOUTME: Wires backends, OAuth2 flows, token issuance, and the HTTP layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

#![forbid(unsafe_code)]

//! # Authgate
//!
//! An HTTP login service. Clients obtain an HS512-signed JWT by submitting
//! credentials, completing a third-party OAuth2 redirect flow, or refreshing
//! an existing token; the same endpoint serves a minimal login form and a
//! logout path.
//!
//! The server is stateless: no session store, no user database. Credential
//! checks are delegated to configured [`backends`] in order (first match
//! wins), OAuth2 providers are handled by the [`oauth2`] flow controller, and
//! the [`token`] codec binds the resulting claims to a signed cookie or a
//! bare `application/jwt` response body.

/// Credential backends and their registry
pub mod backends;
/// Configuration from flags and environment
pub mod config;
/// Request body parsing into credentials
pub mod credentials;
/// Error taxonomy of the login endpoint
pub mod errors;
/// Embedded HTML login form
pub mod form;
/// Tracing subscriber setup
pub mod logging;
/// Request tracing and access logging middleware
pub mod middleware;
/// User claims model
pub mod models;
/// OAuth2 authorization-code flow controller
pub mod oauth2;
/// The login endpoint and router
pub mod routes;
/// JWT mint and parse
pub mod token;
