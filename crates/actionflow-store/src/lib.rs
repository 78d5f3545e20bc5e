//! actionflow-store
//!
//! The object store is the system of record for Tasks and StepActions. The
//! reconciler only talks to it through [`ObjectStore`], exchanging
//! [`Manifest`] documents.
//!
//! Two implementations ship here:
//! - [`MemoryStore`]: in-process, records every call; backs tests and `actionflow render`
//! - [`KubeStore`]: a Kubernetes API server hosting the Tekton CRDs

pub mod error;
pub mod kubernetes;
pub mod memory;

pub use error::{Result, StoreError};
pub use kubernetes::KubeStore;
pub use memory::{MemoryStore, StoreCall, StoreOp};

use actionflow_core::{Manifest, ObjectKind};
use async_trait::async_trait;

/// Namespaced object storage with optimistic concurrency
///
/// Objects are addressed by `(namespace, kind, name)`. Every stored object
/// carries a `resourceVersion`; `update` must present the current one or it
/// fails with [`StoreError::Conflict`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a new object; fails with `AlreadyExists` when the name is taken
    async fn create(&self, namespace: &str, manifest: &Manifest) -> Result<Manifest>;

    /// Fetch an object, including its current `resourceVersion`
    async fn get(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<Manifest>;

    /// Replace an object; the manifest must carry the current `resourceVersion`
    async fn update(&self, namespace: &str, manifest: &Manifest) -> Result<Manifest>;

    async fn delete(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()>;
}

/// Kind and name of a manifest handed to a store
pub(crate) fn manifest_key(manifest: &Manifest) -> Result<(ObjectKind, String)> {
    let kind = manifest
        .kind()
        .ok_or_else(|| StoreError::Serialization("manifest has no supported kind".to_string()))?;
    let name = manifest
        .name()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StoreError::Serialization("manifest has no metadata.name".to_string()))?;
    Ok((kind, name.to_string()))
}
