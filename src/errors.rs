// ABOUTME: Error taxonomy for the login endpoint and its collaborators
// ABOUTME: Maps each error kind to the HTTP status a client observes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the login protocol engine.
///
/// The display string of each variant is the plain-text body a machine client
/// receives; browser clients get the re-rendered login form instead for the
/// variants that carry a banner.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Unsupported method, content type, or unparseable body
    #[error("Bad Request: Method or content-type not supported")]
    MalformedRequest,

    /// Every configured backend reported a clean credential mismatch
    #[error("Wrong credentials")]
    WrongCredentials,

    /// The refresh counter of the supplied token reached the configured cap
    #[error("Max JWT refreshes reached")]
    MaxRefreshesReached,

    /// A backend failed operationally (network, upstream 5xx)
    #[error("authentication backend failure")]
    BackendFailure(#[source] anyhow::Error),

    /// The OAuth2 flow controller aborted the redirect dance
    #[error("oauth2 flow failed")]
    OAuth(#[from] crate::oauth2::OAuthError),

    /// The supplied token did not verify
    #[error("invalid token")]
    TokenInvalid,

    /// Path outside the configured login prefix
    #[error("Not Found: The requested page does not exist")]
    NotFound,
}

impl LoginError {
    /// The HTTP status this error is reported with
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest | Self::TokenInvalid => StatusCode::BAD_REQUEST,
            Self::WrongCredentials | Self::MaxRefreshesReached => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BackendFailure(_) | Self::OAuth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
