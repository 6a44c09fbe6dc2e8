// ABOUTME: Backend delegating the credential check to an upstream HTTP endpoint
// ABOUTME: 200 with Basic credentials means authenticated, other statuses mean mismatch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use super::{Authenticator, BackendDescriptor, BackendOptions};
use crate::config::parse_duration;
use crate::models::UserInfo;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::Instrument;

const NAME: &str = "httpupstream";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Registry entry for the HTTP upstream backend
#[must_use]
pub fn descriptor() -> BackendDescriptor {
    BackendDescriptor::new(
        NAME,
        "Httpupstream login backend opts: upstream=url,timeout=1m,skipverify=true",
        from_options,
    )
}

fn from_options(opts: &BackendOptions) -> Result<Box<dyn Authenticator>> {
    let Some(upstream) = opts.get("upstream") else {
        bail!("httpupstream backend requires an upstream option");
    };
    let upstream = Url::parse(upstream)
        .with_context(|| format!("httpupstream upstream has to be a valid url: {upstream}"))?;

    let timeout = match opts.get("timeout") {
        Some(raw) => parse_duration(raw)
            .map_err(|e| anyhow!("httpupstream timeout option invalid: {e}"))?,
        None => DEFAULT_TIMEOUT,
    };
    let skip_verify = opts.get("skipverify").is_some_and(|v| v == "true");

    Ok(Box::new(UpstreamBackend::new(upstream, timeout, skip_verify)?))
}

/// Backend issuing a Basic-authenticated GET against a configured URL
pub struct UpstreamBackend {
    upstream: Url,
    client: Client,
}

impl UpstreamBackend {
    /// Build the backend with its own connection pool and timeout.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(upstream: Url, timeout: Duration, skip_verify: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(skip_verify)
            .build()
            .context("build httpupstream client")?;
        Ok(Self { upstream, client })
    }
}

#[async_trait]
impl Authenticator for UpstreamBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserInfo>> {
        let span = tracing::info_span!(
            "upstream_authenticate",
            otel.kind = "client",
            http.method = "GET",
            http.url = %self.upstream,
            http.status_code = tracing::field::Empty,
        );

        let response = self
            .client
            .get(self.upstream.clone())
            .basic_auth(username, Some(password))
            .send()
            .instrument(span.clone())
            .await
            .context("httpupstream request failed")?;

        span.record("http.status_code", response.status().as_u16());
        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }
        Ok(Some(UserInfo::for_subject(username, NAME)))
    }
}
