// ABOUTME: Stateless JWT codec binding claims to an HMAC-SHA-512 signature
// ABOUTME: Mints tokens with a fresh expiry and verifies supplied ones
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! # Token Codec
//!
//! Signs [`UserInfo`] claims as a compact JWT (`HS512`) and parses them back.
//! The server keeps no token store; revocation is handled by the expiry and
//! the capped refresh counter carried inside the claims.

use crate::models::UserInfo;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

/// Mints and parses signed bearer tokens.
///
/// Symmetric by design: issuer and downstream verifier share the secret.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    expiry_secs: i64,
}

impl TokenCodec {
    /// Create a codec for the given shared secret and token lifetime
    #[must_use]
    pub fn new(secret: &str, expiry: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            header: Header::new(Algorithm::HS512),
            validation,
            expiry_secs: i64::try_from(expiry.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Sign the claims, stamping `exp` to now plus the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn mint(&self, user_info: &UserInfo) -> Result<String, jsonwebtoken::errors::Error> {
        let mut claims = user_info.clone();
        claims.exp = Utc::now().timestamp().saturating_add(self.expiry_secs);
        encode(&self.header, &claims, &self.encoding_key)
    }

    /// Verify a compact token and return its claims.
    ///
    /// `None` for anything that must not be trusted: bad signature, expired
    /// `exp`, or an empty subject.
    #[must_use]
    pub fn parse(&self, token: &str) -> Option<UserInfo> {
        let data = decode::<UserInfo>(token, &self.decoding_key, &self.validation).ok()?;
        if data.claims.sub.is_empty() {
            return None;
        }
        Some(data.claims)
    }
}
