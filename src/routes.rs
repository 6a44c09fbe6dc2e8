// ABOUTME: The login endpoint: routing, backend fan-out, token issuance, responses
// ABOUTME: Multiplexes credential login, OAuth2 redirects, refresh, and logout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! # Login Handler
//!
//! One endpoint serves everything below the configured login path. Requests
//! matching a registered OAuth2 callback are delegated to the flow
//! controller; everything else is credential login, refresh, or logout,
//! dispatched by method and content type. Browser clients (`Accept:
//! text/html`) get redirects and the embedded form, machine clients get the
//! bare token or a plain-text error.

use crate::backends::{Authenticator, BackendRegistry};
use crate::config::Config;
use crate::credentials::{self, Credentials};
use crate::errors::LoginError;
use crate::form::{self, LoginFormData};
use crate::middleware::{access_log, trace_request};
use crate::models::UserInfo;
use crate::oauth2::{FlowOutcome, Manager};
use crate::token::TokenCodec;
use anyhow::{bail, Context, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
const CONTENT_TYPE_JWT: &str = "application/jwt";
const CONTENT_TYPE_PLAIN: &str = "text/plain";
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";
const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// The login protocol engine.
///
/// Exclusively owns the ordered authenticator list and the OAuth2
/// controller; both live for the process lifetime and are never mutated
/// after construction.
pub struct LoginHandler {
    config: Config,
    backends: Vec<Box<dyn Authenticator>>,
    oauth: Manager,
    codec: TokenCodec,
}

impl LoginHandler {
    /// Build the handler from the configuration.
    ///
    /// # Errors
    ///
    /// Fails when neither backends nor OAuth2 providers are configured, when
    /// the signing secret is missing, or when any backend or provider entry
    /// is rejected.
    pub fn new(config: Config, registry: &BackendRegistry) -> Result<Self> {
        let mut backends = Vec::with_capacity(config.backends.len());
        for entry in &config.backends {
            let backend = registry
                .create(&entry.name, &entry.opts)
                .with_context(|| format!("configure backend {}", entry.name))?;
            backends.push(backend);
        }
        Self::with_authenticators(config, backends)
    }

    /// Build the handler around an explicit ordered authenticator list.
    ///
    /// # Errors
    ///
    /// As [`LoginHandler::new`], minus the backend construction.
    pub fn with_authenticators(
        config: Config,
        backends: Vec<Box<dyn Authenticator>>,
    ) -> Result<Self> {
        if backends.is_empty() && config.oauth.is_empty() {
            bail!("no login backends or OAuth2 providers configured");
        }
        let secret = config
            .jwt_secret
            .as_deref()
            .context("no JWT secret configured")?
            .to_owned();

        let mut oauth = Manager::new(config.login_path.clone());
        for entry in &config.oauth {
            oauth
                .add_config(&entry.name, &entry.opts)
                .with_context(|| format!("configure OAuth2 provider {}", entry.name))?;
        }

        let codec = TokenCodec::new(&secret, config.jwt_expiry);
        Ok(Self {
            config,
            backends,
            oauth,
            codec,
        })
    }

    /// Serve one request below or outside the login path
    pub async fn handle(&self, req: Request) -> Response {
        let path = req.uri().path().to_owned();
        if !path.starts_with(&self.config.login_path) {
            return plain_error(&LoginError::NotFound);
        }
        if self.oauth.config_for_request(&path).is_some() {
            return self.handle_oauth(req, &path).await;
        }
        self.handle_login(req).await
    }

    async fn handle_oauth(&self, req: Request, path: &str) -> Response {
        let wants_html = wants_html(req.headers());
        if req.method() != Method::GET {
            return plain_error(&LoginError::MalformedRequest);
        }
        let Some(config) = self.oauth.config_for_request(path) else {
            return self.respond_error(wants_html, "");
        };
        let redirect_uri = config
            .redirect_uri
            .clone()
            .unwrap_or_else(|| external_url(req.headers(), path));

        match self.oauth.handle(config, req.uri().query(), &redirect_uri).await {
            Ok(FlowOutcome::StartedFlow(url)) => built(
                Response::builder()
                    .status(StatusCode::FOUND)
                    .header(header::LOCATION, url)
                    .body(Body::empty()),
            ),
            Ok(FlowOutcome::Authenticated {
                user_info,
                return_url,
            }) => {
                info!(
                    username = %user_info.sub,
                    provider = %config.provider,
                    "successfully authenticated"
                );
                let location = return_url.unwrap_or_else(|| self.config.success_url.clone());
                self.respond_authenticated_to(wants_html, user_info, &location)
            }
            Err(e) => {
                error!(error = %e, provider = %config.provider, "oauth2 flow failed");
                self.respond_error(wants_html, "")
            }
        }
    }

    async fn handle_login(&self, req: Request) -> Response {
        let method = req.method().clone();
        let headers = req.headers().clone();
        let wants_html = wants_html(&headers);
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let allowed = match method {
            Method::GET | Method::DELETE => true,
            Method::POST => credentials::supported_content_type(content_type),
            _ => false,
        };
        if !allowed {
            return plain_error(&LoginError::MalformedRequest);
        }

        if method == Method::DELETE {
            return self.respond_logout();
        }

        if method == Method::GET {
            let user_info = self
                .cookie_token(&headers)
                .and_then(|token| self.codec.parse(&token));
            return self.render_form(
                StatusCode::OK,
                &LoginFormData {
                    login_path: &self.config.login_path,
                    authenticated: user_info.is_some(),
                    username: user_info.as_ref().map_or("", |u| u.sub.as_str()),
                    ..LoginFormData::default()
                },
            );
        }

        let creds: Credentials = match credentials::from_request(req).await {
            Ok(creds) => creds,
            Err(e) => return plain_error(&e),
        };

        if creds.logout {
            return self.respond_logout();
        }
        if !creds.username.is_empty() {
            return self
                .handle_authentication(wants_html, &creds.username, &creds.password)
                .await;
        }

        let token = if creds.token.is_empty() {
            self.cookie_token(&headers)
        } else {
            Some(creds.token)
        };
        if let Some(user_info) = token.as_deref().and_then(|t| self.codec.parse(t)) {
            return self.handle_refresh(wants_html, user_info);
        }
        plain_error(&LoginError::MalformedRequest)
    }

    /// Fan out to the backends in configured order; first match wins, first
    /// operational error aborts.
    async fn handle_authentication(
        &self,
        wants_html: bool,
        username: &str,
        password: &str,
    ) -> Response {
        for backend in &self.backends {
            match backend.authenticate(username, password).await {
                Err(e) => {
                    error!(username = %username, error = %e, "authentication backend failure");
                    return self.respond_error(wants_html, username);
                }
                Ok(Some(user_info)) => {
                    info!(
                        username = %username,
                        origin = user_info.origin.as_deref().unwrap_or(""),
                        "successfully authenticated"
                    );
                    return self.respond_authenticated(wants_html, user_info);
                }
                Ok(None) => {}
            }
        }
        info!(username = %username, "failed authentication");
        self.respond_auth_failure(wants_html, username)
    }

    fn handle_refresh(&self, wants_html: bool, mut user_info: UserInfo) -> Response {
        if user_info.refreshes >= self.config.jwt_refreshes {
            return plain_error(&LoginError::MaxRefreshesReached);
        }
        user_info.refreshes += 1;
        info!(
            username = %user_info.sub,
            refreshes = user_info.refreshes,
            "refreshed jwt"
        );
        self.respond_authenticated(wants_html, user_info)
    }

    fn respond_authenticated(&self, wants_html: bool, user_info: UserInfo) -> Response {
        let success_url = self.config.success_url.clone();
        self.respond_authenticated_to(wants_html, user_info, &success_url)
    }

    fn respond_authenticated_to(
        &self,
        wants_html: bool,
        user_info: UserInfo,
        location: &str,
    ) -> Response {
        let token = match self.codec.mint(&user_info) {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "minting token failed");
                return self.respond_error(wants_html, &user_info.sub);
            }
        };

        if wants_html {
            return built(
                Response::builder()
                    .status(StatusCode::SEE_OTHER)
                    .header(header::LOCATION, location)
                    .header(header::SET_COOKIE, self.auth_cookie(&token))
                    .body(Body::empty()),
            );
        }
        built(
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, CONTENT_TYPE_JWT)
                .body(Body::from(token)),
        )
    }

    fn respond_logout(&self) -> Response {
        let cookie = self.logout_cookie();
        if let Some(logout_url) = &self.config.logout_url {
            return built(
                Response::builder()
                    .status(StatusCode::SEE_OTHER)
                    .header(header::LOCATION, logout_url.as_str())
                    .header(header::SET_COOKIE, cookie)
                    .body(Body::empty()),
            );
        }
        built(
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, CONTENT_TYPE_HTML)
                .header(header::SET_COOKIE, cookie)
                .body(Body::from(form::render(&LoginFormData {
                    login_path: &self.config.login_path,
                    ..LoginFormData::default()
                }))),
        )
    }

    fn respond_auth_failure(&self, wants_html: bool, username: &str) -> Response {
        if wants_html {
            return self.render_form(
                StatusCode::FORBIDDEN,
                &LoginFormData {
                    login_path: &self.config.login_path,
                    failure: true,
                    username,
                    ..LoginFormData::default()
                },
            );
        }
        plain_error(&LoginError::WrongCredentials)
    }

    fn respond_error(&self, wants_html: bool, username: &str) -> Response {
        if wants_html {
            return self.render_form(
                StatusCode::INTERNAL_SERVER_ERROR,
                &LoginFormData {
                    login_path: &self.config.login_path,
                    error: true,
                    username,
                    ..LoginFormData::default()
                },
            );
        }
        built(
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(header::CONTENT_TYPE, CONTENT_TYPE_PLAIN)
                .body(Body::from("Internal Server Error")),
        )
    }

    fn render_form(&self, status: StatusCode, data: &LoginFormData<'_>) -> Response {
        built(
            Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, CONTENT_TYPE_HTML)
                .body(Body::from(form::render(data))),
        )
    }

    fn cookie_token(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(header::COOKIE)?.to_str().ok()?;
        raw.split(';').map(str::trim).find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            (name == self.config.cookie_name).then(|| value.to_owned())
        })
    }

    fn auth_cookie(&self, token: &str) -> String {
        let mut cookie = format!("{}={token}; Path=/", self.config.cookie_name);
        if self.config.cookie_http_only {
            cookie.push_str("; HttpOnly");
        }
        if !self.config.cookie_expiry.is_zero() {
            let expires = Utc::now()
                + chrono::Duration::seconds(
                    i64::try_from(self.config.cookie_expiry.as_secs()).unwrap_or(i64::MAX),
                );
            cookie.push_str(&format!(
                "; Expires={}",
                expires.format(COOKIE_DATE_FORMAT)
            ));
        }
        if let Some(domain) = &self.config.cookie_domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        cookie
    }

    fn logout_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=delete; Path=/; HttpOnly; Expires={EPOCH_EXPIRES}",
            self.config.cookie_name
        );
        if let Some(domain) = &self.config.cookie_domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        cookie
    }
}

/// The complete service: trace span, access log, then the login handler as
/// the fallback so it owns every path.
pub fn router(handler: Arc<LoginHandler>) -> Router {
    Router::new()
        .fallback(serve)
        .with_state(handler)
        .layer(axum::middleware::from_fn(access_log))
        .layer(axum::middleware::from_fn(trace_request))
}

async fn serve(State(handler): State<Arc<LoginHandler>>, req: Request) -> Response {
    handler.handle(req).await
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

// Reconstruct the externally visible URL of the request for the OAuth2
// redirect URI, honoring a proxy's forwarded proto.
fn external_url(headers: &HeaderMap, path: &str) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}{path}")
}

fn plain_error(error: &LoginError) -> Response {
    built(
        Response::builder()
            .status(error.status())
            .header(header::CONTENT_TYPE, CONTENT_TYPE_PLAIN)
            .body(Body::from(error.to_string())),
    )
}

fn built(response: Result<Response, axum::http::Error>) -> Response {
    response.unwrap_or_else(|e| {
        error!(error = %e, "building response failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}
