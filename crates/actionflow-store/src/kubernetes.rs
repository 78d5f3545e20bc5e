//! Kubernetes-backed object store
//!
//! Talks to the API server through `kube` dynamic objects, so the Tekton
//! CRDs need no generated types.

use crate::error::{Result, StoreError};
use crate::{ObjectStore, manifest_key};
use actionflow_core::objects::{TEKTON_GROUP, TEKTON_VERSION};
use actionflow_core::{Manifest, ObjectKind};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta};
use kube::{Client, Error as KubeError};
use tracing::{debug, instrument};

pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the ambient kubeconfig or in-cluster service account
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| StoreError::Transport(format!("failed to create kube client: {}", e)))?;
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str, kind: ObjectKind) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &api_resource(kind))
    }
}

pub(crate) fn api_resource(kind: ObjectKind) -> ApiResource {
    let gvk = GroupVersionKind::gvk(TEKTON_GROUP, TEKTON_VERSION, kind.kind());
    ApiResource::from_gvk_with_plural(&gvk, kind.plural())
}

fn to_dynamic(manifest: &Manifest) -> Result<DynamicObject> {
    Ok(serde_json::from_value(manifest.as_value().clone())?)
}

fn from_dynamic(mut object: DynamicObject, kind: ObjectKind) -> Result<Manifest> {
    if object.types.is_none() {
        object.types = Some(TypeMeta {
            api_version: api_resource(kind).api_version,
            kind: kind.kind().to_string(),
        });
    }
    Ok(Manifest::from_value(serde_json::to_value(&object)?)?)
}

fn map_kube_error(
    err: KubeError,
    creating: bool,
    kind: ObjectKind,
    namespace: &str,
    name: &str,
) -> StoreError {
    match err {
        KubeError::Api(response) if response.code == 404 => {
            StoreError::not_found(kind, namespace, name)
        }
        KubeError::Api(response) if response.code == 409 && creating => {
            StoreError::already_exists(kind, namespace, name)
        }
        KubeError::Api(response) if response.code == 409 => {
            StoreError::conflict(kind, namespace, name, response.message)
        }
        KubeError::Api(response) => StoreError::Transport(format!(
            "{} {}/{}: {} ({})",
            kind, namespace, name, response.message, response.code
        )),
        other => StoreError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    #[instrument(skip(self, manifest))]
    async fn create(&self, namespace: &str, manifest: &Manifest) -> Result<Manifest> {
        let (kind, name) = manifest_key(manifest)?;
        debug!(%kind, name = %name, "creating object");
        let created = self
            .api(namespace, kind)
            .create(&PostParams::default(), &to_dynamic(manifest)?)
            .await
            .map_err(|e| map_kube_error(e, true, kind, namespace, &name))?;
        from_dynamic(created, kind)
    }

    #[instrument(skip(self))]
    async fn get(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<Manifest> {
        debug!("fetching object");
        let object = self
            .api(namespace, kind)
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, false, kind, namespace, name))?;
        from_dynamic(object, kind)
    }

    #[instrument(skip(self, manifest))]
    async fn update(&self, namespace: &str, manifest: &Manifest) -> Result<Manifest> {
        let (kind, name) = manifest_key(manifest)?;
        debug!(%kind, name = %name, version = ?manifest.resource_version(), "replacing object");
        let replaced = self
            .api(namespace, kind)
            .replace(&name, &PostParams::default(), &to_dynamic(manifest)?)
            .await
            .map_err(|e| map_kube_error(e, false, kind, namespace, &name))?;
        from_dynamic(replaced, kind)
    }

    #[instrument(skip(self))]
    async fn delete(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()> {
        debug!("deleting object");
        self.api(namespace, kind)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_kube_error(e, false, kind, namespace, name))?;
        Ok(())
    }
}
