//! rgo builders: turn configuration records into resource documents.
//!
//! Builders are pure. The namespace, creation timestamp and environment lookup
//! all come in through [`BuildContext`], so a given context and config always
//! produce the same documents.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rgo_config::Config;
use rgo_core::document::{Metadata, LABEL_CREATED_AT, LABEL_MANAGED_BY, MANAGED_BY};
use rgo_core::Manifest;

mod apps;
mod projects;
pub mod resolve;
mod secrets;

pub use apps::build_applications;
pub use projects::build_projects;
pub use secrets::{build_credential_secrets, build_repo_secrets};

pub const DEFAULT_NAMESPACE: &str = "argo-cd";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Inputs shared by every builder.
#[derive(Clone)]
pub struct BuildContext {
    pub namespace: String,
    /// Value of the `created-at` label.
    pub created_at: String,
    env: EnvLookup,
}

impl BuildContext {
    /// Context stamped with the current UTC time and reading the process environment.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            created_at: timestamp_label(chrono::Utc::now()),
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Resolve `${VAR}` placeholders against this context's environment.
    pub fn resolve(&self, value: &str) -> String {
        resolve::resolve_env_placeholders_with(value, |name| (self.env)(name))
    }

    pub(crate) fn metadata(&self, name: &str, extra_labels: &[(&str, &str)]) -> Metadata {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string());
        labels.insert(LABEL_CREATED_AT.to_string(), self.created_at.clone());
        for (k, v) in extra_labels {
            labels.insert((*k).to_string(), (*v).to_string());
        }
        Metadata { name: name.to_string(), namespace: self.namespace.clone(), labels, resource_version: None }
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext").field("namespace", &self.namespace).field("created_at", &self.created_at).finish_non_exhaustive()
    }
}

/// Label values may not contain `:`, so RFC 3339 is out.
pub fn timestamp_label(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Every object the config describes, in apply order: projects, repository
/// secrets, credential secrets, applications.
pub fn build_all(cfg: &Config, ctx: &BuildContext) -> Vec<Manifest> {
    let mut out = Vec::with_capacity(cfg.object_count());
    out.extend(build_projects(&cfg.projects, ctx));
    out.extend(build_repo_secrets(&cfg.repositories, ctx));
    out.extend(build_credential_secrets(&cfg.credentials, ctx));
    out.extend(build_applications(&cfg.applications, ctx));
    out
}
