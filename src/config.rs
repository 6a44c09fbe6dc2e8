// ABOUTME: Handler and server configuration from CLI flags and environment
// ABOUTME: Flags win over AUTHGATE_* variables; backend/oauth entries repeat
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! # Configuration Surface
//!
//! Every option is a `clap` flag with an `AUTHGATE_*` environment fallback.
//! Durations use the compact `500ms` / `5s` / `10m` / `2h` / `1d` forms.
//! Backends and OAuth2 providers are configured with repeatable entries:
//!
//! ```text
//! authgate-server --backend simple,alice=secret \
//!                 --oauth github,client_id=...,client_secret=...
//! ```

use clap::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Runtime configuration of the login service
#[derive(Parser, Debug, Clone)]
#[command(name = "authgate-server")]
#[command(about = "HTTP login service issuing signed JWTs")]
#[command(version)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "AUTHGATE_HOST", default_value = "localhost")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "AUTHGATE_PORT", default_value_t = 6789)]
    pub port: u16,

    /// Path prefix the login endpoint is served under
    #[arg(long, env = "AUTHGATE_LOGIN_PATH", default_value = "/login")]
    pub login_path: String,

    /// Where a browser is redirected after a successful login
    #[arg(long, env = "AUTHGATE_SUCCESS_URL", default_value = "/")]
    pub success_url: String,

    /// Where a browser is redirected after logout; default re-renders the form
    #[arg(long, env = "AUTHGATE_LOGOUT_URL")]
    pub logout_url: Option<String>,

    /// Name of the token cookie
    #[arg(long, env = "AUTHGATE_COOKIE_NAME", default_value = "jwt_token")]
    pub cookie_name: String,

    /// Cookie domain attribute
    #[arg(long, env = "AUTHGATE_COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,

    /// Cookie lifetime; 0 means a browser-session cookie
    #[arg(long, env = "AUTHGATE_COOKIE_EXPIRY", default_value = "0", value_parser = parse_duration)]
    pub cookie_expiry: Duration,

    /// Whether the cookie is HttpOnly
    #[arg(long, env = "AUTHGATE_COOKIE_HTTP_ONLY", default_value_t = true, action = clap::ArgAction::Set)]
    pub cookie_http_only: bool,

    /// Shared JWT signing secret; a random one is generated when absent
    #[arg(long, env = "AUTHGATE_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime
    #[arg(long, env = "AUTHGATE_JWT_EXPIRY", default_value = "24h", value_parser = parse_duration)]
    pub jwt_expiry: Duration,

    /// How often a token may be refreshed
    #[arg(long, env = "AUTHGATE_JWT_REFRESHES", default_value_t = 0)]
    pub jwt_refreshes: u64,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, env = "AUTHGATE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Human-readable log lines instead of JSON
    #[arg(long, env = "AUTHGATE_TEXT_LOGGING", default_value_t = true, action = clap::ArgAction::Set)]
    pub text_logging: bool,

    /// How long in-flight requests may drain on shutdown
    #[arg(long, env = "AUTHGATE_GRACE_PERIOD", default_value = "5s", value_parser = parse_duration)]
    pub grace_period: Duration,

    /// Credential backend entry: name,opt=val,... (repeatable, checked in order)
    #[arg(long = "backend", env = "AUTHGATE_BACKEND", value_parser = ModuleOptions::parse, action = clap::ArgAction::Append)]
    pub backends: Vec<ModuleOptions>,

    /// OAuth2 provider entry: name,client_id=..,client_secret=..,... (repeatable)
    #[arg(long = "oauth", env = "AUTHGATE_OAUTH", value_parser = ModuleOptions::parse, action = clap::ArgAction::Append)]
    pub oauth: Vec<ModuleOptions>,
}

impl Config {
    /// Fill derived values: generates a signing secret when none was given.
    pub fn finalize(&mut self) {
        if self.jwt_secret.is_none() {
            warn!("no JWT secret configured, generating a random one; \
                   tokens will not survive a restart");
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            self.jwt_secret = Some(secret);
        }
    }

    /// One-line startup summary with the secret masked
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "host={} port={} login_path={} success_url={} cookie_name={} \
             jwt_secret=... jwt_expiry={:?} jwt_refreshes={} backends=[{}] oauth=[{}]",
            self.host,
            self.port,
            self.login_path,
            self.success_url,
            self.cookie_name,
            self.jwt_expiry,
            self.jwt_refreshes,
            self.backends
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            self.oauth
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6789,
            login_path: "/login".into(),
            success_url: "/".into(),
            logout_url: None,
            cookie_name: "jwt_token".into(),
            cookie_domain: None,
            cookie_expiry: Duration::ZERO,
            cookie_http_only: true,
            jwt_secret: None,
            jwt_expiry: Duration::from_secs(24 * 3600),
            jwt_refreshes: 0,
            log_level: "info".into(),
            text_logging: true,
            grace_period: Duration::from_secs(5),
            backends: Vec::new(),
            oauth: Vec::new(),
        }
    }
}

/// One configured backend or OAuth2 provider: a name plus flat options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOptions {
    pub name: String,
    pub opts: HashMap<String, String>,
}

impl ModuleOptions {
    /// Parse a `name,key=value,...` entry.
    ///
    /// # Errors
    ///
    /// Fails when the name is missing or an option has no `=`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut parts = raw.split(',');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() || name.contains('=') {
            return Err(format!(
                "entry must start with a name, got: {raw}"
            ));
        }

        let mut opts = HashMap::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(format!("option without value in entry: {part}"));
            };
            opts.insert(key.trim().to_owned(), value.trim().to_owned());
        }
        Ok(Self {
            name: name.to_owned(),
            opts,
        })
    }
}

/// Parse a compact duration such as `500ms`, `5s`, `10m`, `2h`, `1h30m`, `1d`.
///
/// # Errors
///
/// Returns a message describing the malformed input.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_ms: u64 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("missing unit in duration: {raw}"))?;
        if digits_end == 0 {
            return Err(format!("invalid duration: {raw}"));
        }
        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| format!("invalid duration: {raw}"))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let unit_ms: u64 = match unit {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(format!("unknown duration unit {unit} in: {raw}")),
        };
        total_ms = total_ms.saturating_add(value.saturating_mul(unit_ms));
    }
    Ok(Duration::from_millis(total_ms))
}
