// ABOUTME: Server binary: configuration, logging, serving, graceful drain
// ABOUTME: Stops accepting on SIGINT/SIGTERM and drains for the grace period
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

#![forbid(unsafe_code)]

//! # Authgate Server Binary
//!
//! Reads configuration from flags and `AUTHGATE_*` environment variables,
//! builds the login handler, and serves it until a termination signal.

use anyhow::{Context, Result};
use authgate::backends::BackendRegistry;
use authgate::config::Config;
use authgate::routes::LoginHandler;
use authgate::{logging, routes};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = Config::parse();
    logging::init(&config)?;
    config.finalize();
    info!("starting authgate: {}", config.summary());

    let registry = BackendRegistry::builtin();
    let grace_period = config.grace_period;
    let addr = format!("{}:{}", config.host, config.port);
    let handler = LoginHandler::new(config, &registry)?;
    let app = routes::router(Arc::new(handler));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(addr = %addr, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    info!("shutdown signal received, draining in-flight requests");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(grace_period, server).await {
        Ok(joined) => joined.context("server task panicked")??,
        Err(_) => warn!(
            grace_period_secs = grace_period.as_secs(),
            "grace period elapsed, aborting remaining requests"
        ),
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
