// ABOUTME: Authenticator contract and the registry of backend factories
// ABOUTME: The registry is an explicit value built at startup, never global state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Authgate Contributors

//! # Credential Backends
//!
//! Every backend implements [`Authenticator`]: given a username and password
//! it reports authenticated (with claims), a clean mismatch, or an
//! operational failure. Instances are built once from a flat options mapping
//! and must be safe for concurrent calls for the process lifetime.
//!
//! Cancellation is structural: dropping the in-flight future (the caller
//! disconnected) aborts any outbound request a backend has running.

pub mod htpasswd;
pub mod httpupstream;
pub mod osiam;
pub mod simple;

use crate::models::UserInfo;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Flat `key → value` options a backend is constructed from
pub type BackendOptions = HashMap<String, String>;

/// Uniform credential-check interface implemented by each backend adapter.
///
/// `Ok(Some(claims))` means authenticated, `Ok(None)` a clean credential
/// mismatch, and `Err` an operational failure (network, upstream 5xx).
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserInfo>>;
}

type Factory = fn(&BackendOptions) -> Result<Box<dyn Authenticator>>;

/// Immutable description of an available backend
pub struct BackendDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    factory: Factory,
}

/// Name → factory map resolving configured backends at startup.
///
/// Built explicitly by the caller; once the handler owns its authenticator
/// list the registry is no longer consulted.
pub struct BackendRegistry {
    descriptors: Vec<BackendDescriptor>,
}

impl BackendRegistry {
    /// An empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// The registry of all built-in backends
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(simple::descriptor());
        registry.register(htpasswd::descriptor());
        registry.register(httpupstream::descriptor());
        registry.register(osiam::descriptor());
        registry
    }

    /// Add a backend description; a duplicate name replaces the earlier entry
    pub fn register(&mut self, descriptor: BackendDescriptor) {
        self.descriptors
            .retain(|existing| existing.name != descriptor.name);
        self.descriptors.push(descriptor);
    }

    /// Construct a configured backend by name.
    ///
    /// # Errors
    ///
    /// Fails for an unknown backend name or when the factory rejects the
    /// options.
    pub fn create(&self, name: &str, opts: &BackendOptions) -> Result<Box<dyn Authenticator>> {
        let Some(descriptor) = self.descriptors.iter().find(|d| d.name == name) else {
            bail!(
                "no such login backend: {name} (known backends: {})",
                self.descriptors
                    .iter()
                    .map(|d| d.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        };
        (descriptor.factory)(opts)
    }

    /// Iterate the registered descriptors, e.g. for `--help` output
    pub fn descriptors(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.descriptors.iter()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BackendDescriptor {
    /// Describe a backend by name, help text, and factory
    #[must_use]
    pub const fn new(name: &'static str, help: &'static str, factory: Factory) -> Self {
        Self {
            name,
            help,
            factory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_known_backends() {
        let registry = BackendRegistry::builtin();
        let names: Vec<_> = registry.descriptors().map(|d| d.name).collect();
        assert_eq!(names, ["simple", "htpasswd", "httpupstream", "osiam"]);

        let mut opts = BackendOptions::new();
        opts.insert("alice".into(), "secret".into());
        assert!(registry.create("simple", &opts).is_ok());
    }

    #[test]
    fn unknown_backend_is_a_startup_error() {
        let registry = BackendRegistry::builtin();
        let err = match registry.create("ldap", &BackendOptions::new()) {
            Err(e) => e,
            Ok(_) => panic!("unknown backend must fail"),
        };
        assert!(err.to_string().contains("no such login backend: ldap"));
    }

    #[test]
    fn duplicate_registration_replaces() {
        fn failing(_: &BackendOptions) -> Result<Box<dyn Authenticator>> {
            bail!("always fails")
        }

        let mut registry = BackendRegistry::builtin();
        registry.register(BackendDescriptor::new("simple", "override", failing));
        assert_eq!(
            registry.descriptors().filter(|d| d.name == "simple").count(),
            1
        );
        let mut opts = BackendOptions::new();
        opts.insert("alice".into(), "secret".into());
        assert!(registry.create("simple", &opts).is_err());
    }
}
