//! rgo kubehub: the [`ResourceStore`] backed by the Kubernetes API.

#![forbid(unsafe_code)]

use anyhow::{Context, Result as AnyResult};
use kube::{
    api::{Api, DeleteParams, PostParams},
    core::{ApiResource, DynamicObject},
    Client,
};
use rgo_core::{Error, LiveObject, ResourceCoordinates, ResourceDocument, ResourceKind, ResourceStore, Result};
use tracing::debug;

/// Store over a kube client. Each call addresses the resource directly from
/// its coordinates, no discovery round trip.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self { Self { client } }

    /// In-cluster config first, then the local kubeconfig.
    pub async fn connect() -> AnyResult<Self> {
        let client = Client::try_default().await.context("creating kube client (in-cluster or kubeconfig)")?;
        Ok(Self::new(client))
    }

    fn api(&self, coords: &ResourceCoordinates) -> Api<DynamicObject> {
        let ar = api_resource(coords);
        if coords.namespace.is_empty() {
            Api::all_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), &coords.namespace, &ar)
        }
    }
}

pub fn api_resource(coords: &ResourceCoordinates) -> ApiResource {
    ApiResource {
        group: coords.group.clone(),
        version: coords.version.clone(),
        api_version: coords.api_version(),
        kind: ResourceKind::from_plural(&coords.plural).map(|k| k.as_str().to_string()).unwrap_or_default(),
        plural: coords.plural.clone(),
    }
}

fn to_dynamic(doc: &ResourceDocument) -> Result<DynamicObject> {
    let json = doc.to_json().map_err(|e| Error::Transport(format!("encoding {}: {}", doc.name(), e)))?;
    serde_json::from_value(json).map_err(|e| Error::Transport(format!("encoding {}: {}", doc.name(), e)))
}

/// 404 and 409 keep their meaning; everything else is a transport failure.
pub fn map_kube_error(e: kube::Error, what: &str) -> Error {
    match e {
        kube::Error::Api(ae) if ae.code == 404 => Error::NotFound(format!("{}: {}", what, ae.message)),
        kube::Error::Api(ae) if ae.code == 409 => Error::Conflict(format!("{}: {}", what, ae.message)),
        kube::Error::Api(ae) => Error::Transport(format!("{}: {} ({} {})", what, ae.message, ae.code, ae.reason)),
        other => Error::Transport(format!("{}: {}", what, other)),
    }
}

fn describe(coords: &ResourceCoordinates, name: &str) -> String {
    format!("{}/{}/{}", coords.namespace, coords.plural, name)
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get(&self, coords: &ResourceCoordinates, name: &str) -> Result<LiveObject> {
        let what = describe(coords, name);
        let obj = self.api(coords).get(name).await.map_err(|e| map_kube_error(e, &what))?;
        let resource_version = obj.metadata.resource_version.clone();
        debug!(object = %what, rv = ?resource_version, "get");
        let raw = serde_json::to_value(&obj).map_err(|e| Error::Transport(format!("{}: decoding: {}", what, e)))?;
        Ok(LiveObject { resource_version, raw })
    }

    async fn create(&self, coords: &ResourceCoordinates, doc: &ResourceDocument) -> Result<()> {
        let what = describe(coords, doc.name());
        let obj = to_dynamic(doc)?;
        self.api(coords).create(&PostParams::default(), &obj).await.map_err(|e| map_kube_error(e, &what))?;
        debug!(object = %what, "created");
        Ok(())
    }

    async fn update(&self, coords: &ResourceCoordinates, doc: &ResourceDocument) -> Result<()> {
        let what = describe(coords, doc.name());
        let obj = to_dynamic(doc)?;
        self.api(coords).replace(doc.name(), &PostParams::default(), &obj).await.map_err(|e| map_kube_error(e, &what))?;
        debug!(object = %what, "replaced");
        Ok(())
    }

    async fn delete(&self, coords: &ResourceCoordinates, name: &str) -> Result<()> {
        let what = describe(coords, name);
        self.api(coords).delete(name, &DeleteParams::default()).await.map_err(|e| map_kube_error(e, &what))?;
        debug!(object = %what, "deleted");
        Ok(())
    }
}
