//! rgo core: resource kinds, store coordinates, documents, errors and the store seam.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod document;

pub use document::{Body, Metadata, ResourceDocument};

/// Kinds the tool manages. Both repository and credential documents are `Secret`s.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    AppProject,
    Application,
    Secret,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::AppProject, ResourceKind::Application, ResourceKind::Secret];

    pub fn from_plural(plural: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.plural() == plural)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::AppProject => "AppProject",
            ResourceKind::Application => "Application",
            ResourceKind::Secret => "Secret",
        }
    }

    pub const fn group(self) -> &'static str {
        match self {
            ResourceKind::AppProject | ResourceKind::Application => "argoproj.io",
            ResourceKind::Secret => "",
        }
    }

    pub const fn version(self) -> &'static str {
        match self {
            ResourceKind::AppProject | ResourceKind::Application => "v1alpha1",
            ResourceKind::Secret => "v1",
        }
    }

    pub const fn api_version(self) -> &'static str {
        match self {
            ResourceKind::AppProject | ResourceKind::Application => document::ARGO_API_VERSION,
            ResourceKind::Secret => document::CORE_API_VERSION,
        }
    }

    pub const fn plural(self) -> &'static str {
        match self {
            ResourceKind::AppProject => "appprojects",
            ResourceKind::Application => "applications",
            ResourceKind::Secret => "secrets",
        }
    }

    /// Parse a delete selector kind (`app|application`, `project|appproject`, `secret`).
    pub fn from_selector(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "app" | "application" => Ok(ResourceKind::Application),
            "project" | "appproject" => Ok(ResourceKind::AppProject),
            "secret" => Ok(ResourceKind::Secret),
            _ => Err(Error::UnsupportedKind(s.to_string())),
        }
    }

    pub fn coordinates(self, namespace: &str) -> ResourceCoordinates {
        ResourceCoordinates {
            group: self.group().to_string(),
            version: self.version().to_string(),
            plural: self.plural().to_string(),
            namespace: namespace.to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Store addressing tuple for a kind within a namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceCoordinates {
    pub group: String,
    pub version: String,
    pub plural: String,
    pub namespace: String,
}

impl ResourceCoordinates {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() { self.version.clone() } else { format!("{}/{}", self.group, self.version) }
    }
}

/// Identity of one managed object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind, namespace: namespace.into(), name: name.into() }
    }

    pub fn coordinates(&self) -> ResourceCoordinates { self.kind.coordinates(&self.namespace) }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A built document paired with where it lives in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub document: ResourceDocument,
    pub coordinates: ResourceCoordinates,
}

impl Manifest {
    pub fn new(document: ResourceDocument) -> Self {
        let coordinates = document.kind().coordinates(document.namespace());
        Self { document, coordinates }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.document.kind(), self.document.namespace(), self.document.name())
    }
}

/// What the store returned for an existing object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveObject {
    pub resource_version: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Op {
    Apply,
    Delete,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Op::Apply => "apply", Op::Delete => "delete" })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("unsupported kind: {0} (expected app|application, project|appproject, secret)")]
    UnsupportedKind(String),
    #[error("render: {0}")]
    Render(String),
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("{op} {target}: {source}")]
    Object {
        op: Op,
        target: ObjectRef,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the identity of the object an operation failed on.
    pub fn at(self, op: Op, target: ObjectRef) -> Self {
        Error::Object { op, target, source: Box::new(self) }
    }

    /// The innermost error, looking through `Object` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Object { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool { matches!(self.root(), Error::NotFound(_)) }

    pub fn target(&self) -> Option<&ObjectRef> {
        match self {
            Error::Object { target, .. } => Some(target),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Remote object store addressed by coordinates + name.
///
/// Implementations must report a missing object as [`Error::NotFound`] and a
/// rejected stale update as [`Error::Conflict`]; the reconciler branches on both.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, coords: &ResourceCoordinates, name: &str) -> Result<LiveObject>;
    async fn create(&self, coords: &ResourceCoordinates, doc: &ResourceDocument) -> Result<()>;
    async fn update(&self, coords: &ResourceCoordinates, doc: &ResourceDocument) -> Result<()>;
    async fn delete(&self, coords: &ResourceCoordinates, name: &str) -> Result<()>;
}

pub mod prelude {
    pub use super::{Error, LiveObject, Manifest, ObjectRef, Op, ResourceCoordinates, ResourceDocument, ResourceKind, ResourceStore, Result};
}
