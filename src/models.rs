// ABOUTME: Claims bundle describing an authenticated principal
// ABOUTME: Serialized form is the JWT payload minted by the token codec
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! # User Claims Model
//!
//! [`UserInfo`] is the value object produced by a successful authentication,
//! carried through token minting and parsing. Each request produces a fresh
//! bundle; only a refresh mutates one (counter incremented, expiry reset).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Claims describing an authenticated user.
///
/// Beyond the fixed fields, OAuth2 providers contribute an open set of
/// attributes (email, name, picture, groups, ...) kept in `attributes` and
/// flattened into the token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Subject, the authenticated username
    #[serde(default)]
    pub sub: String,

    /// Expiry as absolute UNIX seconds
    #[serde(default)]
    pub exp: i64,

    /// How often this token has been refreshed
    #[serde(default)]
    pub refreshes: u64,

    /// Name of the backend or provider that authenticated the subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Additional provider-supplied attributes
    #[serde(flatten)]
    pub attributes: HashMap<String, Value>,
}

impl UserInfo {
    /// Create a claims bundle for a subject with no extra attributes
    #[must_use]
    pub fn for_subject(sub: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            origin: Some(origin.into()),
            ..Self::default()
        }
    }

    /// A bundle is valid iff the subject is non-empty and the expiry lies in
    /// the future.
    #[must_use]
    pub fn valid(&self) -> bool {
        !self.sub.is_empty() && self.exp > Utc::now().timestamp()
    }

    /// Attach a provider attribute, dropping null values
    pub fn set_attribute(&mut self, key: &str, value: Value) {
        if !value.is_null() {
            self.attributes.insert(key.to_owned(), value);
        }
    }
}
