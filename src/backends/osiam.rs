// ABOUTME: OSIAM backend performing an OAuth2 resource-owner-password grant
// ABOUTME: A granted token means authenticated; invalid_grant is a clean mismatch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use super::{Authenticator, BackendDescriptor, BackendOptions};
use crate::models::UserInfo;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

const NAME: &str = "osiam";

/// Registry entry for the OSIAM backend
#[must_use]
pub fn descriptor() -> BackendDescriptor {
    BackendDescriptor::new(
        NAME,
        "OSIAM login backend opts: endpoint=url,client_id=id,client_secret=secret",
        from_options,
    )
}

fn from_options(opts: &BackendOptions) -> Result<Box<dyn Authenticator>> {
    let Some(endpoint) = opts.get("endpoint") else {
        bail!("osiam backend requires an endpoint option");
    };
    let client_id = opts.get("client_id").cloned().unwrap_or_default();
    let client_secret = opts.get("client_secret").cloned().unwrap_or_default();
    Ok(Box::new(OsiamBackend::new(
        endpoint,
        client_id,
        client_secret,
    )?))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Backend trading user credentials for a token at an OSIAM server
pub struct OsiamBackend {
    token_url: Url,
    client_id: String,
    client_secret: String,
    client: Client,
}

impl OsiamBackend {
    /// Validate the endpoint and client credentials.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint is not a URL or a client credential is empty.
    pub fn new(endpoint: &str, client_id: String, client_secret: String) -> Result<Self> {
        let token_url = Url::parse(&format!("{}/oauth/token", endpoint.trim_end_matches('/')))
            .with_context(|| format!("osiam endpoint has to be a valid url: {endpoint}"))?;
        if client_id.is_empty() {
            bail!("no osiam client_id provided");
        }
        if client_secret.is_empty() {
            bail!("no osiam client_secret provided");
        }
        Ok(Self {
            token_url,
            client_id,
            client_secret,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Authenticator for OsiamBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserInfo>> {
        let response = self
            .client
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .context("osiam token request failed")?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .context("osiam token response unparseable")?;

        if status.is_success() && body.access_token.is_some() {
            return Ok(Some(UserInfo::for_subject(username, NAME)));
        }
        if body.error.as_deref() == Some("invalid_grant") {
            return Ok(None);
        }
        bail!("osiam token endpoint returned status {status}");
    }
}
