// ABOUTME: Extracts login credentials from JSON, form, and multipart bodies
// ABOUTME: Missing fields become empty strings; the handler decides meaning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use crate::errors::LoginError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;
use std::collections::HashMap;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The three fields a login request may carry, plus the logout marker.
///
/// The parser never fails on a missing field; it is the combination that
/// gives a request its meaning (credential login, refresh, logout).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub token: String,
    pub logout: bool,
}

/// Whether a POST body of this content type can be parsed at all.
///
/// Anything else is rejected with 400 before the parser runs.
#[must_use]
pub fn supported_content_type(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("application/json")
        || content_type.starts_with("application/x-www-form-urlencoded")
        || content_type.starts_with("multipart/form-data")
}

/// Parse the request body into [`Credentials`] according to its content type.
///
/// # Errors
///
/// [`LoginError::MalformedRequest`] when the body cannot be decoded.
pub async fn from_request(req: Request) -> Result<Credentials, LoginError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    if content_type.starts_with("application/json") {
        return from_json(req).await;
    }
    if content_type.starts_with("multipart/form-data") {
        return from_multipart(req).await;
    }
    from_form(req).await
}

async fn from_json(req: Request) -> Result<Credentials, LoginError> {
    let body = read_body(req).await?;
    let fields: HashMap<String, Value> =
        serde_json::from_slice(&body).map_err(|_| LoginError::MalformedRequest)?;
    Ok(credentials_from(|name| {
        fields.get(name).map(json_field_to_string).unwrap_or_default()
    }))
}

async fn from_form(req: Request) -> Result<Credentials, LoginError> {
    let body = read_body(req).await?;
    let fields: HashMap<String, String> =
        serde_urlencoded::from_bytes(&body).map_err(|_| LoginError::MalformedRequest)?;
    Ok(credentials_from(|name| {
        fields.get(name).cloned().unwrap_or_default()
    }))
}

async fn from_multipart(req: Request) -> Result<Credentials, LoginError> {
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|_| LoginError::MalformedRequest)?;

    let mut fields: HashMap<String, String> = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| LoginError::MalformedRequest)?
    {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|_| LoginError::MalformedRequest)?;
        fields.insert(name, value);
    }
    Ok(credentials_from(|name| {
        fields.get(name).cloned().unwrap_or_default()
    }))
}

async fn read_body(req: Request) -> Result<Vec<u8>, LoginError> {
    axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|_| LoginError::MalformedRequest)
}

fn credentials_from(mut field: impl FnMut(&str) -> String) -> Credentials {
    Credentials {
        username: field("username"),
        password: field("password"),
        token: field("token"),
        logout: field("logout") == "true",
    }
}

// JSON bodies may carry `"logout": true` as a bare boolean; stringify so the
// form and JSON paths agree.
fn json_field_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
