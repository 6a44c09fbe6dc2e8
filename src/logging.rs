// ABOUTME: Tracing subscriber setup with text or JSON output
// ABOUTME: RUST_LOG overrides the configured level filter when set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use crate::config::Config;
use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber according to the configuration.
///
/// # Errors
///
/// Fails when a subscriber is already installed.
pub fn init(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level))
        .add_directive("hyper=warn".parse().unwrap_or_else(|_| tracing::Level::WARN.into()))
        .add_directive("reqwest=warn".parse().unwrap_or_else(|_| tracing::Level::WARN.into()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.text_logging {
        registry.with(fmt::layer().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true).json()).try_init()
    };
    result.map_err(|e| anyhow!("install tracing subscriber: {e}"))
}
