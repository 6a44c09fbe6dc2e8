// ABOUTME: Built-in OAuth2 provider adapters with default endpoints
// ABOUTME: Each adapter maps a provider's userinfo document onto claims
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use super::OAuthError;
use crate::models::UserInfo;
use serde_json::Value;

/// A provider adapter knows the default endpoints of an identity provider
/// and how to turn its userinfo document into a claims bundle.
pub trait ProviderAdapter: Send + Sync {
    /// Provider name, also the default callback sub-path
    fn name(&self) -> &'static str;

    /// Authorization endpoint the user agent is redirected to
    fn auth_url(&self) -> &'static str;

    /// Token endpoint for the code exchange
    fn token_url(&self) -> &'static str;

    /// Userinfo endpoint queried with the access token
    fn userinfo_url(&self) -> &'static str;

    /// Scopes requested when the configuration names none
    fn default_scope(&self) -> &'static str;

    /// Extract claims from the provider's userinfo document.
    ///
    /// # Errors
    ///
    /// Fails when the document lacks a usable subject.
    fn map_userinfo(&self, raw: &Value) -> Result<UserInfo, OAuthError>;
}

/// Resolve a built-in adapter by provider name
#[must_use]
pub fn adapter_for(name: &str) -> Option<&'static dyn ProviderAdapter> {
    match name {
        "github" => Some(&GithubAdapter),
        "google" => Some(&GoogleAdapter),
        _ => None,
    }
}

/// GitHub OAuth2 adapter
pub struct GithubAdapter;

impl ProviderAdapter for GithubAdapter {
    fn name(&self) -> &'static str {
        "github"
    }

    fn auth_url(&self) -> &'static str {
        "https://github.com/login/oauth/authorize"
    }

    fn token_url(&self) -> &'static str {
        "https://github.com/login/oauth/access_token"
    }

    fn userinfo_url(&self) -> &'static str {
        "https://api.github.com/user"
    }

    fn default_scope(&self) -> &'static str {
        ""
    }

    fn map_userinfo(&self, raw: &Value) -> Result<UserInfo, OAuthError> {
        let Some(login) = raw.get("login").and_then(Value::as_str) else {
            return Err(OAuthError::UserinfoFailed(
                "github userinfo carries no login".into(),
            ));
        };
        let mut info = UserInfo {
            sub: login.to_owned(),
            ..UserInfo::default()
        };
        for (source, target) in [("name", "name"), ("email", "email"), ("avatar_url", "picture")] {
            if let Some(value) = raw.get(source) {
                info.set_attribute(target, value.clone());
            }
        }
        Ok(info)
    }
}

/// Google OpenID Connect adapter
pub struct GoogleAdapter;

impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        "google"
    }

    fn auth_url(&self) -> &'static str {
        "https://accounts.google.com/o/oauth2/v2/auth"
    }

    fn token_url(&self) -> &'static str {
        "https://oauth2.googleapis.com/token"
    }

    fn userinfo_url(&self) -> &'static str {
        "https://openidconnect.googleapis.com/v1/userinfo"
    }

    fn default_scope(&self) -> &'static str {
        "openid email profile"
    }

    fn map_userinfo(&self, raw: &Value) -> Result<UserInfo, OAuthError> {
        let Some(sub) = raw.get("sub").and_then(Value::as_str) else {
            return Err(OAuthError::UserinfoFailed(
                "google userinfo carries no sub".into(),
            ));
        };
        let mut info = UserInfo {
            sub: sub.to_owned(),
            ..UserInfo::default()
        };
        for key in ["name", "email", "picture"] {
            if let Some(value) = raw.get(key) {
                info.set_attribute(key, value.clone());
            }
        }
        Ok(info)
    }
}
