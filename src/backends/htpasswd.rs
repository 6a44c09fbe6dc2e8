// ABOUTME: Password-file backend with bcrypt and SHA-256 hash schemes
// ABOUTME: Reloads the file on demand whenever its mtime or size changes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

use super::{Authenticator, BackendDescriptor, BackendOptions};
use crate::models::UserInfo;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::warn;

const NAME: &str = "htpasswd";
const SHA256_PREFIX: &str = "{SHA256}";

/// Registry entry for the password-file backend
#[must_use]
pub fn descriptor() -> BackendDescriptor {
    BackendDescriptor::new(
        NAME,
        "Password file backend opts: file=/path/to/htpasswd (bcrypt or {SHA256} hashes)",
        from_options,
    )
}

fn from_options(opts: &BackendOptions) -> Result<Box<dyn Authenticator>> {
    let Some(path) = opts.get("file") else {
        bail!("htpasswd backend requires a file option");
    };
    Ok(Box::new(HtpasswdBackend::open(PathBuf::from(path))?))
}

/// Backend checking credentials against a colon-separated `user:hash` file
pub struct HtpasswdBackend {
    path: PathBuf,
    cache: RwLock<Snapshot>,
}

struct Snapshot {
    modified: Option<SystemTime>,
    len: u64,
    entries: Arc<HashMap<String, String>>,
}

impl HtpasswdBackend {
    /// Open and validate the password file.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable, a line is malformed, or a hash uses
    /// an unsupported scheme.
    pub fn open(path: PathBuf) -> Result<Self> {
        let snapshot = load(&path)?;
        Ok(Self {
            path,
            cache: RwLock::new(snapshot),
        })
    }

    /// Current entries, re-reading the file when it changed on disk
    fn entries(&self) -> Result<Arc<HashMap<String, String>>> {
        let meta = fs::metadata(&self.path)
            .with_context(|| format!("stat htpasswd file {}", self.path.display()))?;
        let modified = meta.modified().ok();
        let len = meta.len();

        {
            let cached = self.cache.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            if cached.modified == modified && cached.len == len {
                return Ok(Arc::clone(&cached.entries));
            }
        }

        let fresh = load(&self.path)?;
        let entries = Arc::clone(&fresh.entries);
        *self
            .cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = fresh;
        Ok(entries)
    }
}

#[async_trait]
impl Authenticator for HtpasswdBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserInfo>> {
        let entries = self.entries()?;
        match entries.get(username) {
            Some(hash) if verify(password, hash) => {
                Ok(Some(UserInfo::for_subject(username, NAME)))
            }
            _ => Ok(None),
        }
    }
}

fn load(path: &Path) -> Result<Snapshot> {
    let meta = fs::metadata(path)
        .with_context(|| format!("stat htpasswd file {}", path.display()))?;
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read htpasswd file {}", path.display()))?;

    let mut entries = HashMap::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((user, hash)) = line.split_once(':') else {
            bail!("malformed htpasswd line {}: missing colon", number + 1);
        };
        if !hash.starts_with("$2") && !hash.starts_with(SHA256_PREFIX) {
            bail!(
                "unsupported hash scheme for user {user} on line {}",
                number + 1
            );
        }
        entries.insert(user.to_owned(), hash.to_owned());
    }

    Ok(Snapshot {
        modified: meta.modified().ok(),
        len: meta.len(),
        entries: Arc::new(entries),
    })
}

fn verify(password: &str, hash: &str) -> bool {
    if let Some(encoded) = hash.strip_prefix(SHA256_PREFIX) {
        let Ok(want) = BASE64.decode(encoded) else {
            warn!("undecodable {SHA256_PREFIX} hash in htpasswd file");
            return false;
        };
        let got = Sha256::digest(password.as_bytes());
        return ring::constant_time::verify_slices_are_equal(&want, got.as_slice()).is_ok();
    }

    bcrypt::verify(password, hash).unwrap_or_else(|e| {
        warn!(error = %e, "bcrypt verification failed on stored hash");
        false
    })
}
