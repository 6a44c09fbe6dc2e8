// ABOUTME: Integration tests for the OAuth2 redirect dance via the login endpoint
// ABOUTME: Runs the exchange and userinfo legs against a local stub provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

#![allow(clippy::unwrap_used, clippy::expect_used)]

use authgate::config::{Config, ModuleOptions};
use authgate::oauth2::FlowState;
use authgate::routes::{self, LoginHandler};
use authgate::token::TokenCodec;
use axum::body::{to_bytes, Body};
use axum::extract::Form;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const CLIENT_ID: &str = "client42";
const CLIENT_SECRET: &str = "topsecret";
const ACCESS_TOKEN: &str = "at-123";

fn github_app(extra: impl FnOnce(&mut HashMap<String, String>)) -> Router {
    let mut opts: HashMap<String, String> = HashMap::from([
        ("client_id".into(), CLIENT_ID.into()),
        ("client_secret".into(), CLIENT_SECRET.into()),
    ]);
    extra(&mut opts);

    let config = Config {
        jwt_secret: Some(SECRET.into()),
        oauth: vec![ModuleOptions {
            name: "github".into(),
            opts,
        }],
        ..Config::default()
    };
    let handler = LoginHandler::with_authenticators(config, Vec::new()).expect("handler");
    routes::router(Arc::new(handler))
}

/// Minimal identity provider: a token endpoint validating the exchange
/// parameters and a userinfo endpoint validating the bearer token.
async fn spawn_stub_provider() -> SocketAddr {
    async fn token(Form(params): Form<HashMap<String, String>>) -> impl IntoResponse {
        let valid = params.get("grant_type").map(String::as_str) == Some("authorization_code")
            && params.get("client_id").map(String::as_str) == Some(CLIENT_ID)
            && params.get("client_secret").map(String::as_str) == Some(CLIENT_SECRET)
            && params.contains_key("code")
            && params.contains_key("redirect_uri");
        if !valid {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_request" })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({ "access_token": ACCESS_TOKEN, "token_type": "bearer" })),
        )
    }

    async fn userinfo(headers: HeaderMap) -> impl IntoResponse {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(&format!("Bearer {ACCESS_TOKEN}"));
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        (
            StatusCode::OK,
            Json(json!({
                "login": "octocat",
                "name": "The Octocat",
                "avatar_url": "https://avatars.example.com/u/1",
            })),
        )
    }

    let stub = Router::new()
        .route("/token", post(token))
        .route("/user", get(userinfo));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub provider");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, stub).await.expect("stub serves");
    });
    addr
}

fn query_params(url: &str) -> HashMap<String, String> {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
    serde_urlencoded::from_str(query).expect("query parses")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn provider_callback_path_starts_the_flow() {
    let response = github_app(|_| {})
        .oneshot(Request::get("/login/github").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(!location.contains(CLIENT_SECRET), "secret must stay server-side");

    let params = query_params(&location);
    assert_eq!(params["client_id"], CLIENT_ID);
    assert_eq!(params["response_type"], "code");
    FlowState::decode(&params["state"]).expect("state envelope decodes");
}

#[tokio::test]
async fn return_url_rides_inside_the_state_envelope() {
    let response = github_app(|_| {})
        .oneshot(
            Request::get("/login/github?return_url=/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    let state = FlowState::decode(&query_params(&location)["state"]).expect("state decodes");
    assert_eq!(state.return_url.as_deref(), Some("/dashboard"));
}

#[tokio::test]
async fn non_get_requests_to_a_callback_path_are_rejected() {
    let response = github_app(|_| {})
        .oneshot(
            Request::post("/login/github")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=alice"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_error_aborts_with_500() {
    let response = github_app(|_| {})
        .oneshot(
            Request::get("/login/github?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn tampered_state_aborts_with_500() {
    let response = github_app(|_| {})
        .oneshot(
            Request::get("/login/github?code=abc&state=tampered")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn callback_without_state_aborts_with_500() {
    let response = github_app(|_| {})
        .oneshot(
            Request::get("/login/github?code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn full_flow_round_trips_the_state_and_mints_a_token() {
    let stub = spawn_stub_provider().await;
    let app = github_app(|opts| {
        opts.insert("token_url".into(), format!("http://{stub}/token"));
        opts.insert("userinfo_url".into(), format!("http://{stub}/user"));
    });

    // Redirect leg: capture the state exactly as placed on the Location URL.
    let response = app
        .clone()
        .oneshot(Request::get("/login/github").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    let state = query_params(&location)["state"].clone();

    // Callback leg: the provider returns the state verbatim plus a code.
    let response = app
        .oneshot(
            Request::get(format!("/login/github?code=codeword&state={state}"))
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/jwt"
    );
    let token = body_text(response).await;
    let claims = TokenCodec::new(SECRET, Duration::from_secs(3600))
        .parse(&token)
        .expect("token verifies");
    assert_eq!(claims.sub, "octocat");
    assert_eq!(claims.origin.as_deref(), Some("github"));
    assert_eq!(claims.attributes["name"], json!("The Octocat"));
}

#[tokio::test]
async fn browser_callback_sets_the_cookie_and_redirects() {
    let stub = spawn_stub_provider().await;
    let app = github_app(|opts| {
        opts.insert("token_url".into(), format!("http://{stub}/token"));
        opts.insert("userinfo_url".into(), format!("http://{stub}/user"));
    });

    let state = FlowState {
        nonce: "nonce".into(),
        return_url: None,
    }
    .encode();
    let response = app
        .oneshot(
            Request::get(format!("/login/github?code=codeword&state={state}"))
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("jwt_token="));
}

#[tokio::test]
async fn browser_callback_honors_the_embedded_return_url() {
    let stub = spawn_stub_provider().await;
    let app = github_app(|opts| {
        opts.insert("token_url".into(), format!("http://{stub}/token"));
        opts.insert("userinfo_url".into(), format!("http://{stub}/user"));
    });

    let state = FlowState {
        nonce: "nonce".into(),
        return_url: Some("/dashboard".into()),
    }
    .encode();
    let response = app
        .oneshot(
            Request::get(format!("/login/github?code=codeword&state={state}"))
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/dashboard"
    );
}

#[tokio::test]
async fn absolute_return_url_in_the_state_is_rejected() {
    let state = FlowState {
        nonce: "nonce".into(),
        return_url: Some("https://evil.example.com/".into()),
    }
    .encode();
    let response = github_app(|_| {})
        .oneshot(
            Request::get(format!("/login/github?code=codeword&state={state}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn failing_token_exchange_surfaces_as_500() {
    let stub = spawn_stub_provider().await;
    let app = github_app(|opts| {
        // Wrong path: the stub answers 404 and the exchange fails.
        opts.insert("token_url".into(), format!("http://{stub}/nope"));
        opts.insert("userinfo_url".into(), format!("http://{stub}/user"));
    });

    let state = FlowState {
        nonce: "nonce".into(),
        return_url: None,
    }
    .encode();
    let response = app
        .oneshot(
            Request::get(format!("/login/github?code=codeword&state={state}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
