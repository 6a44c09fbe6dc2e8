// ABOUTME: In-memory backend checking against a configured user/password map
// ABOUTME: Options are literally user=password pairs; this backend never errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use super::{Authenticator, BackendDescriptor, BackendOptions};
use crate::models::UserInfo;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;

const NAME: &str = "simple";

/// Registry entry for the static-map backend
#[must_use]
pub fn descriptor() -> BackendDescriptor {
    BackendDescriptor::new(
        NAME,
        "Simple login backend opts: user1=password,user2=password,..",
        from_options,
    )
}

fn from_options(opts: &BackendOptions) -> Result<Box<dyn Authenticator>> {
    if opts.is_empty() {
        bail!("no users provided for simple backend");
    }
    Ok(Box::new(SimpleBackend {
        user_password: opts.clone(),
    }))
}

/// Backend working on a map of username/password pairs
pub struct SimpleBackend {
    user_password: HashMap<String, String>,
}

impl SimpleBackend {
    #[must_use]
    pub fn new(user_password: HashMap<String, String>) -> Self {
        Self { user_password }
    }
}

#[async_trait]
impl Authenticator for SimpleBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserInfo>> {
        match self.user_password.get(username) {
            Some(configured) if configured == password => {
                Ok(Some(UserInfo::for_subject(username, NAME)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimpleBackend {
        SimpleBackend::new(HashMap::from([("alice".into(), "secret".into())]))
    }

    #[tokio::test]
    async fn matching_credentials_authenticate() {
        let info = backend()
            .authenticate("alice", "secret")
            .await
            .expect("no error")
            .expect("authenticated");
        assert_eq!(info.sub, "alice");
        assert_eq!(info.origin.as_deref(), Some("simple"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_clean_mismatches() {
        assert!(backend()
            .authenticate("alice", "wrong")
            .await
            .expect("no error")
            .is_none());
        assert!(backend()
            .authenticate("bob", "secret")
            .await
            .expect("no error")
            .is_none());
    }

    #[test]
    fn empty_options_are_rejected() {
        assert!(from_options(&BackendOptions::new()).is_err());
    }
}
