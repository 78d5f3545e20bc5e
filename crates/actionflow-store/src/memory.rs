//! In-process object store
//!
//! Behaves like the API server for the parts the reconciler depends on:
//! resource versions increase monotonically and a stale version on update
//! is rejected. Every call is recorded so tests can assert on ordering.

use crate::error::{Result, StoreError};
use crate::{ObjectStore, manifest_key};
use actionflow_core::{Manifest, ObjectKind};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    Get,
    Update,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOp::Create => write!(f, "create"),
            StoreOp::Get => write!(f, "get"),
            StoreOp::Update => write!(f, "update"),
            StoreOp::Delete => write!(f, "delete"),
        }
    }
}

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub kind: ObjectKind,
    pub name: String,
}

impl StoreCall {
    pub fn new(op: StoreOp, kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            op,
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for StoreCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.op, self.kind, self.name)
    }
}

type ObjectKey = (String, ObjectKind, String);

#[derive(Default)]
struct Inner {
    objects: HashMap<ObjectKey, Manifest>,
    last_version: u64,
    calls: Vec<StoreCall>,
    failures: Vec<(StoreOp, ObjectKind, StoreError)>,
    bump_after_get: HashSet<ObjectKind>,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }

    fn take_failure(&mut self, op: StoreOp, kind: ObjectKind) -> Option<StoreError> {
        let pos = self
            .failures
            .iter()
            .position(|(o, k, _)| *o == op && *k == kind)?;
        Some(self.failures.remove(pos).2)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Fail the next `op` on `kind` with `error`
    pub fn inject_failure(&self, op: StoreOp, kind: ObjectKind, error: StoreError) {
        self.lock().failures.push((op, kind, error));
    }

    /// After the next successful `get` of `kind`, modify the stored object
    /// as a concurrent writer would, invalidating the version just returned
    pub fn bump_version_after_get(&self, kind: ObjectKind) {
        self.lock().bump_after_get.insert(kind);
    }

    /// Stored object without recording a call
    pub fn object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Option<Manifest> {
        self.lock()
            .objects
            .get(&(namespace.to_string(), kind, name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a panicking test thread must not hide the recorded state
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create(&self, namespace: &str, manifest: &Manifest) -> Result<Manifest> {
        let (kind, name) = manifest_key(manifest)?;
        let mut inner = self.lock();
        inner.calls.push(StoreCall::new(StoreOp::Create, kind, &name));
        debug!(%kind, namespace, name = %name, "memory store create");

        if let Some(err) = inner.take_failure(StoreOp::Create, kind) {
            return Err(err);
        }

        let key = (namespace.to_string(), kind, name);
        if inner.objects.contains_key(&key) {
            return Err(StoreError::already_exists(kind, namespace, &key.2));
        }

        let mut stored = manifest.clone();
        stored.set_resource_version(inner.next_version());
        inner.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<Manifest> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::new(StoreOp::Get, kind, name));
        debug!(%kind, namespace, name = %name, "memory store get");

        if let Some(err) = inner.take_failure(StoreOp::Get, kind) {
            return Err(err);
        }

        let key = (namespace.to_string(), kind, name.to_string());
        let found = inner
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, namespace, name))?;

        if inner.bump_after_get.remove(&kind) {
            let version = inner.next_version();
            if let Some(stored) = inner.objects.get_mut(&key) {
                stored.set_resource_version(version);
            }
        }

        Ok(found)
    }

    async fn update(&self, namespace: &str, manifest: &Manifest) -> Result<Manifest> {
        let (kind, name) = manifest_key(manifest)?;
        let mut inner = self.lock();
        inner.calls.push(StoreCall::new(StoreOp::Update, kind, &name));
        debug!(%kind, namespace, name = %name, "memory store update");

        if let Some(err) = inner.take_failure(StoreOp::Update, kind) {
            return Err(err);
        }

        let key = (namespace.to_string(), kind, name);
        let current = inner
            .objects
            .get(&key)
            .and_then(|m| m.resource_version())
            .map(str::to_string)
            .ok_or_else(|| StoreError::not_found(kind, namespace, &key.2))?;

        match manifest.resource_version() {
            Some(presented) if presented == current => {}
            presented => {
                return Err(StoreError::conflict(
                    kind,
                    namespace,
                    &key.2,
                    format!(
                        "resourceVersion {} does not match current {}",
                        presented.unwrap_or("<none>"),
                        current
                    ),
                ));
            }
        }

        let mut stored = manifest.clone();
        stored.set_resource_version(inner.next_version());
        inner.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::new(StoreOp::Delete, kind, name));
        debug!(%kind, namespace, name = %name, "memory store delete");

        if let Some(err) = inner.take_failure(StoreOp::Delete, kind) {
            return Err(err);
        }

        inner
            .objects
            .remove(&(namespace.to_string(), kind, name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(kind, namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(kind: &str, name: &str) -> Manifest {
        Manifest::from_value(json!({
            "apiVersion": "tekton.dev/v1beta1",
            "kind": kind,
            "metadata": { "name": name, "namespace": "ns" },
            "spec": {}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_version() {
        let store = MemoryStore::new();
        let a = store.create("ns", &manifest("Task", "a")).await.unwrap();
        let b = store.create("ns", &manifest("Task", "b")).await.unwrap();

        assert_eq!(a.resource_version(), Some("1"));
        assert_eq!(b.resource_version(), Some("2"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_create_existing() {
        let store = MemoryStore::new();
        store.create("ns", &manifest("Task", "a")).await.unwrap();
        let err = store.create("ns", &manifest("Task", "a")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        // same name, other kind or namespace is fine
        store.create("ns", &manifest("StepAction", "a")).await.unwrap();
        store.create("other", &manifest("Task", "a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        let err = store.get("ns", ObjectKind::Task, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_requires_current_version() {
        let store = MemoryStore::new();
        store.create("ns", &manifest("Task", "a")).await.unwrap();

        let mut current = store.get("ns", ObjectKind::Task, "a").await.unwrap();
        let updated = store.update("ns", &current).await.unwrap();
        assert_eq!(updated.resource_version(), Some("2"));

        // version "1" is now stale
        let err = store.update("ns", &current).await.unwrap_err();
        assert!(err.is_conflict());

        current.set_resource_version("2");
        store.update("ns", &current).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_without_version_conflicts() {
        let store = MemoryStore::new();
        store.create("ns", &manifest("Task", "a")).await.unwrap();
        let err = store.update("ns", &manifest("Task", "a")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_bump_version_after_get() {
        let store = MemoryStore::new();
        store.create("ns", &manifest("StepAction", "s")).await.unwrap();
        store.bump_version_after_get(ObjectKind::StepAction);

        let fetched = store.get("ns", ObjectKind::StepAction, "s").await.unwrap();
        assert_eq!(fetched.resource_version(), Some("1"));
        let err = store.update("ns", &fetched).await.unwrap_err();
        assert!(err.is_conflict());

        // one-shot
        let fetched = store.get("ns", ObjectKind::StepAction, "s").await.unwrap();
        store.update("ns", &fetched).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let store = MemoryStore::new();
        store.inject_failure(
            StoreOp::Create,
            ObjectKind::Task,
            StoreError::Transport("connection reset".into()),
        );

        let err = store.create("ns", &manifest("Task", "a")).await.unwrap_err();
        assert_eq!(err, StoreError::Transport("connection reset".into()));
        assert!(store.is_empty());

        store.create("ns", &manifest("Task", "a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_calls_recorded_in_order() {
        let store = MemoryStore::new();
        store.create("ns", &manifest("StepAction", "s")).await.unwrap();
        store.create("ns", &manifest("Task", "t")).await.unwrap();
        store.delete("ns", ObjectKind::Task, "t").await.unwrap();
        let _ = store.delete("ns", ObjectKind::Task, "t").await;

        let calls: Vec<String> = store.calls().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            calls,
            [
                "create StepAction/s",
                "create Task/t",
                "delete Task/t",
                "delete Task/t"
            ]
        );
    }
}
