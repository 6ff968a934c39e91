//! Typed resource documents.
//!
//! Every document shares a header (`apiVersion`, `kind`, `metadata`) and carries
//! exactly one payload variant. Serialized output matches what the API server
//! expects for that kind, so the same value feeds both the store and the
//! dry-run renderer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ResourceKind;

pub const ARGO_API_VERSION: &str = "argoproj.io/v1alpha1";
pub const CORE_API_VERSION: &str = "v1";

pub const LABEL_MANAGED_BY: &str = "managed-by";
pub const LABEL_CREATED_AT: &str = "created-at";
pub const LABEL_SECRET_TYPE: &str = "argocd.argoproj.io/secret-type";
pub const MANAGED_BY: &str = "rgo";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Concurrency token; only set right before an update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// One managed object. Identity is `(kind, namespace, name)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    api_version: &'static str,
    kind: &'static str,
    pub metadata: Metadata,
    #[serde(flatten)]
    pub body: Body,
}

impl ResourceDocument {
    pub fn new(metadata: Metadata, body: Body) -> Self {
        let kind = body.kind();
        Self { api_version: kind.api_version(), kind: kind.as_str(), metadata, body }
    }

    pub fn kind(&self) -> ResourceKind { self.body.kind() }
    pub fn api_version(&self) -> &'static str { self.api_version }
    pub fn name(&self) -> &str { &self.metadata.name }
    pub fn namespace(&self) -> &str { &self.metadata.namespace }

    pub fn set_resource_version(&mut self, rv: Option<String>) {
        self.metadata.resource_version = rv;
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Payload variants. Untagged so that each one flattens into its native field
/// (`spec` for Argo kinds, `stringData` for secrets).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    AppProject {
        spec: AppProjectSpec,
    },
    Application {
        spec: ApplicationSpec,
    },
    RepositorySecret {
        #[serde(rename = "stringData")]
        string_data: RepositoryData,
    },
    CredentialSecret {
        #[serde(rename = "stringData")]
        string_data: CredentialData,
    },
}

impl Body {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Body::AppProject { .. } => ResourceKind::AppProject,
            Body::Application { .. } => ResourceKind::Application,
            Body::RepositorySecret { .. } | Body::CredentialSecret { .. } => ResourceKind::Secret,
        }
    }
}

// ---- AppProject ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppProjectSpec {
    pub description: String,
    pub source_repos: Vec<String>,
    pub destinations: Vec<Destination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub server: String,
    pub namespace: String,
}

// ---- Application ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub project: String,
    pub destination: Destination,
    #[serde(flatten)]
    pub source: ApplicationSource,
    pub sync_policy: SyncPolicy,
}

/// Source shape of an Application. Git and Helm render as a single `source`;
/// OCI Helm renders as a two-entry `sources` list (chart first, values ref second).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApplicationSource {
    Git { source: GitSource },
    Helm { source: HelmSource },
    OciHelm { sources: (OciChartSource, ValuesRefSource) },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub path: String,
    pub target_revision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmSource {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub target_revision: String,
    pub helm: HelmParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OciChartSource {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub chart: String,
    pub target_revision: String,
    pub helm: HelmParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesRefSource {
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub target_revision: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmParams {
    pub value_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automated: Option<Automated>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Automated {
    pub prune: bool,
    pub self_heal: bool,
}

// ---- Secrets ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Git,
    Helm,
}

/// `stringData` of a repository secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryData {
    pub url: String,
    #[serde(rename = "type")]
    pub repo_type: RepoType,
    pub name: String,
    /// Serialized as the string `"true"`; secrets only hold strings.
    #[serde(rename = "enableOCI", skip_serializing_if = "Option::is_none")]
    pub enable_oci: Option<&'static str>,
    #[serde(flatten)]
    pub auth: SecretAuth,
}

/// `stringData` of a credential template secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialData {
    pub url: String,
    #[serde(flatten)]
    pub auth: SecretAuth,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_private_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(name: &str) -> Metadata {
        Metadata { name: name.into(), namespace: "argo-cd".into(), labels: BTreeMap::new(), resource_version: None }
    }

    #[test]
    fn header_follows_body_kind() {
        let doc = ResourceDocument::new(
            meta("creds"),
            Body::CredentialSecret {
                string_data: CredentialData { url: "https://github.com.git".into(), auth: SecretAuth::default() },
            },
        );
        let v = doc.to_json().unwrap();
        assert_eq!(v["apiVersion"], "v1");
        assert_eq!(v["kind"], "Secret");
        assert_eq!(v["stringData"], json!({ "url": "https://github.com.git" }));
        assert!(v.get("spec").is_none());
    }

    #[test]
    fn oci_helm_source_serializes_as_two_entry_list() {
        let spec = ApplicationSpec {
            project: "p".into(),
            destination: Destination { server: "https://kubernetes.default.svc".into(), namespace: "default".into() },
            source: ApplicationSource::OciHelm {
                sources: (
                    OciChartSource {
                        repo_url: "ghcr.io/acme/charts".into(),
                        chart: "web".into(),
                        target_revision: "1.2.3".into(),
                        helm: HelmParams { value_files: vec!["$values/web/values.yaml".into()] },
                    },
                    ValuesRefSource {
                        repo_url: "https://github.com/acme/values.git".into(),
                        target_revision: "HEAD".into(),
                        reference: "values".into(),
                    },
                ),
            },
            sync_policy: SyncPolicy::default(),
        };
        let v = ResourceDocument::new(meta("web"), Body::Application { spec }).to_json().unwrap();
        let sources = v["spec"]["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0]["chart"], "web");
        assert_eq!(sources[1]["ref"], "values");
        assert!(v["spec"].get("source").is_none());
        assert_eq!(v["spec"]["syncPolicy"], json!({}));
    }

    #[test]
    fn resource_version_only_present_when_set() {
        let mut doc = ResourceDocument::new(
            meta("p"),
            Body::AppProject { spec: AppProjectSpec { description: String::new(), source_repos: vec![], destinations: vec![] } },
        );
        assert!(doc.to_json().unwrap()["metadata"].get("resourceVersion").is_none());
        doc.set_resource_version(Some("42".into()));
        assert_eq!(doc.to_json().unwrap()["metadata"]["resourceVersion"], "42");
    }
}
