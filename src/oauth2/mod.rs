// ABOUTME: OAuth2 authorization-code flow controller and provider config registry
// ABOUTME: Stateless across the redirect; the state nonce rides the query string
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! # OAuth2 Flow Controller
//!
//! Implements the authorization-code grant against the registered providers:
//! redirect the user agent to the provider, accept the callback, exchange the
//! code for an access token, fetch userinfo, and hand a populated claims
//! bundle back to the login handler.
//!
//! The controller holds no cross-request state. The `state` query parameter
//! is a base64url JSON envelope carrying a nonce and an optional caller
//! return URL; a callback whose state fails to decode aborts the flow.

pub mod providers;

use crate::models::UserInfo;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use self::providers::{adapter_for, ProviderAdapter};
use rand::Rng;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors of the redirect dance
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("no OAuth2 provider for name: {0}")]
    UnsupportedProvider(String),

    #[error("missing OAuth2 option: {0}")]
    MissingOption(&'static str),

    /// The provider called back with `error=...` instead of a code
    #[error("provider returned error: {0}")]
    Provider(String),

    #[error("invalid state parameter")]
    InvalidState,

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("userinfo fetch failed: {0}")]
    UserinfoFailed(String),
}

/// What the controller tells the login handler after each leg
#[derive(Debug)]
pub enum FlowOutcome {
    /// The flow started; the user agent must be redirected to this URL
    StartedFlow(String),
    /// The callback leg completed and produced claims
    Authenticated {
        user_info: UserInfo,
        /// Caller-supplied return URL carried through the state envelope
        return_url: Option<String>,
    },
}

/// Per-provider configuration, immutable after registration
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Explicit redirect URI; otherwise derived from the inbound request
    pub redirect_uri: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    adapter: &'static dyn ProviderAdapter,
}

/// The state envelope round-tripped through the provider redirect
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowState {
    pub nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

impl FlowState {
    fn new(return_url: Option<String>) -> Self {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill(&mut nonce);
        Self {
            nonce: URL_SAFE_NO_PAD.encode(nonce),
            return_url,
        }
    }

    /// Serialize into the `state` query parameter
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Parse a callback `state` value.
    ///
    /// # Errors
    ///
    /// [`OAuthError::InvalidState`] when the envelope does not decode.
    pub fn decode(raw: &str) -> Result<Self, OAuthError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| OAuthError::InvalidState)?;
        serde_json::from_slice(&bytes).map_err(|_| OAuthError::InvalidState)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Flow controller plus the frozen provider config registry.
///
/// Written only at startup; a plain value once serving begins.
pub struct Manager {
    login_path: String,
    configs: HashMap<String, ProviderConfig>,
    client: Client,
}

impl Manager {
    /// A controller serving callbacks below the given login path
    #[must_use]
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            configs: HashMap::new(),
            client: Client::new(),
        }
    }

    /// Register a provider from its options mapping.
    ///
    /// Registering the same provider twice replaces the earlier entry.
    ///
    /// # Errors
    ///
    /// Fails for an unknown provider name or missing client credentials.
    pub fn add_config(
        &mut self,
        provider: &str,
        opts: &HashMap<String, String>,
    ) -> Result<(), OAuthError> {
        let adapter =
            adapter_for(provider).ok_or_else(|| OAuthError::UnsupportedProvider(provider.into()))?;

        let client_id = opts
            .get("client_id")
            .filter(|v| !v.is_empty())
            .ok_or(OAuthError::MissingOption("client_id"))?;
        let client_secret = opts
            .get("client_secret")
            .filter(|v| !v.is_empty())
            .ok_or(OAuthError::MissingOption("client_secret"))?;

        let config = ProviderConfig {
            provider: provider.to_owned(),
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            scope: opts
                .get("scope")
                .cloned()
                .unwrap_or_else(|| adapter.default_scope().to_owned()),
            redirect_uri: opts.get("redirect_uri").cloned(),
            auth_url: opts
                .get("auth_url")
                .cloned()
                .unwrap_or_else(|| adapter.auth_url().to_owned()),
            token_url: opts
                .get("token_url")
                .cloned()
                .unwrap_or_else(|| adapter.token_url().to_owned()),
            userinfo_url: opts
                .get("userinfo_url")
                .cloned()
                .unwrap_or_else(|| adapter.userinfo_url().to_owned()),
            adapter,
        };
        self.configs.insert(provider.to_owned(), config);
        Ok(())
    }

    /// How many providers are registered
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.configs.len()
    }

    /// The provider whose callback path matches the request path, if any
    #[must_use]
    pub fn config_for_request(&self, path: &str) -> Option<&ProviderConfig> {
        self.configs.values().find(|config| {
            let callback = config.redirect_uri.as_ref().map_or_else(
                || format!("{}/{}", self.login_path, config.provider),
                |uri| callback_path(uri),
            );
            path == callback
        })
    }

    /// Drive one leg of the flow for a request hitting a provider callback
    /// path.
    ///
    /// Without `code` and `error` parameters this starts the flow; with a
    /// `code` it runs the exchange and userinfo legs and returns claims.
    ///
    /// # Errors
    ///
    /// Any [`OAuthError`]; the handler reports these as a 500.
    pub async fn handle(
        &self,
        config: &ProviderConfig,
        query: Option<&str>,
        redirect_uri: &str,
    ) -> Result<FlowOutcome, OAuthError> {
        let params: HashMap<String, String> =
            serde_urlencoded::from_str(query.unwrap_or("")).unwrap_or_default();

        if let Some(error) = params.get("error") {
            return Err(OAuthError::Provider(error.clone()));
        }

        if let Some(code) = params.get("code") {
            let state = params.get("state").ok_or(OAuthError::InvalidState)?;
            let state = FlowState::decode(state)?;
            // Only same-site return targets; anything else is a forged state.
            if state.return_url.as_ref().is_some_and(|u| !u.starts_with('/')) {
                return Err(OAuthError::InvalidState);
            }

            let access_token = self.exchange_code(config, code, redirect_uri).await?;
            let raw = self.fetch_userinfo(config, &access_token).await?;
            let mut user_info = config.adapter.map_userinfo(&raw)?;
            user_info.origin = Some(config.provider.clone());
            return Ok(FlowOutcome::Authenticated {
                user_info,
                return_url: state.return_url,
            });
        }

        let state = FlowState::new(params.get("return_url").cloned()).encode();
        Ok(FlowOutcome::StartedFlow(authorization_url(
            config,
            redirect_uri,
            &state,
        )))
    }

    async fn exchange_code(
        &self,
        config: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, OAuthError> {
        let response = self
            .client
            .post(&config.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::TokenExchangeFailed(format!(
                "token endpoint returned status {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(format!("parse error: {e}")))?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| OAuthError::TokenExchangeFailed("no access_token in response".into()))
    }

    async fn fetch_userinfo(
        &self,
        config: &ProviderConfig,
        access_token: &str,
    ) -> Result<Value, OAuthError> {
        let response = self
            .client
            .get(&config.userinfo_url)
            .bearer_auth(access_token)
            .header(USER_AGENT, concat!("authgate/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| OAuthError::UserinfoFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::UserinfoFailed(format!(
                "userinfo endpoint returned status {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| OAuthError::UserinfoFailed(format!("parse error: {e}")))
    }
}

/// The URL the user agent is sent to; never carries the client secret
#[must_use]
pub fn authorization_url(config: &ProviderConfig, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        config.auth_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&config.scope),
        urlencoding::encode(state),
    )
}

// A configured redirect URI may be absolute or a bare path.
fn callback_path(redirect_uri: &str) -> String {
    reqwest::Url::parse(redirect_uri)
        .map(|url| url.path().to_owned())
        .unwrap_or_else(|_| redirect_uri.to_owned())
}
