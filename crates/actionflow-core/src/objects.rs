//! Typed Tekton objects and their manifest form
//!
//! `Task` and `StepAction` are built as plain structs. They only become a
//! generic JSON document ([`Manifest`]) when handed to an object store.

use crate::error::{CoreError, Result};
use crate::metadata::LabelSet;
use crate::model::{ComputeResources, EnvVar, Param};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const TEKTON_GROUP: &str = "tekton.dev";
pub const TEKTON_VERSION: &str = "v1beta1";
pub const TEKTON_API_VERSION: &str = "tekton.dev/v1beta1";

/// Object kinds managed by actionflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Task,
    StepAction,
}

impl ObjectKind {
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectKind::Task => "Task",
            ObjectKind::StepAction => "StepAction",
        }
    }

    /// Plural resource name used in API paths
    pub fn plural(&self) -> &'static str {
        match self {
            ObjectKind::Task => "tasks",
            ObjectKind::StepAction => "stepactions",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "Task" => Some(ObjectKind::Task),
            "StepAction" => Some(ObjectKind::StepAction),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: LabelSet,
    /// Concurrency token assigned by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub metadata: ObjectMeta,
    pub spec: TaskSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    pub steps: Vec<TaskStep>,
    #[serde(default)]
    pub params: Vec<Param>,
}

/// A Task step: either a reference to a StepAction or an inline script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskStep {
    Reference(StepReference),
    Inline(InlineStep),
}

impl TaskStep {
    pub fn name(&self) -> &str {
        match self {
            TaskStep::Reference(r) => &r.name,
            TaskStep::Inline(s) => &s.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReference {
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: NamedRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// Value passed to a referenced StepAction's parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBinding {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineStep {
    pub name: String,
    pub image: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_resources: Option<ComputeResources>,
}

// ---------------------------------------------------------------------------
// StepAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepAction {
    pub metadata: ObjectMeta,
    pub spec: StepActionSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepActionSpec {
    pub image: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

// ---------------------------------------------------------------------------
// Manifest conversion
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<S> {
    api_version: String,
    kind: String,
    metadata: ObjectMeta,
    spec: S,
}

/// Common behavior of the typed objects
pub trait TektonObject: Sized {
    type Spec: Serialize + DeserializeOwned;

    const KIND: ObjectKind;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;
    fn spec(&self) -> &Self::Spec;
    fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn namespace(&self) -> &str {
        &self.metadata().namespace
    }

    fn to_manifest(&self) -> Result<Manifest> {
        let envelope = Envelope {
            api_version: TEKTON_API_VERSION.to_string(),
            kind: Self::KIND.kind().to_string(),
            metadata: self.metadata().clone(),
            spec: self.spec(),
        };
        Ok(Manifest(serde_json::to_value(envelope)?))
    }

    fn from_manifest(manifest: &Manifest) -> Result<Self> {
        if manifest.kind() != Some(Self::KIND) {
            return Err(CoreError::InvalidManifest(format!(
                "expected kind {}, got {:?}",
                Self::KIND,
                manifest.0.get("kind")
            )));
        }
        let envelope: Envelope<Self::Spec> = serde_json::from_value(manifest.0.clone())?;
        Ok(Self::from_parts(envelope.metadata, envelope.spec))
    }
}

impl TektonObject for Task {
    type Spec = TaskSpec;
    const KIND: ObjectKind = ObjectKind::Task;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }
    fn from_parts(metadata: ObjectMeta, spec: TaskSpec) -> Self {
        Self { metadata, spec }
    }
}

impl TektonObject for StepAction {
    type Spec = StepActionSpec;
    const KIND: ObjectKind = ObjectKind::StepAction;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
    fn spec(&self) -> &StepActionSpec {
        &self.spec
    }
    fn from_parts(metadata: ObjectMeta, spec: StepActionSpec) -> Self {
        Self { metadata, spec }
    }
}

/// A serialized object as exchanged with an object store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(serde_json::Value);

impl Manifest {
    /// Wrap a JSON document, requiring `kind`, `metadata.name` and `metadata.namespace`
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let manifest = Self(value);
        if manifest.kind().is_none() {
            return Err(CoreError::InvalidManifest(
                "missing or unsupported kind".to_string(),
            ));
        }
        if manifest.name().is_none_or(str::is_empty)
            || manifest.namespace().is_none_or(str::is_empty)
        {
            return Err(CoreError::InvalidManifest(
                "missing or empty metadata.name/metadata.namespace".to_string(),
            ));
        }
        Ok(manifest)
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        self.0
            .get("kind")
            .and_then(|k| k.as_str())
            .and_then(ObjectKind::from_kind)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata_str("resourceVersion")
    }

    pub fn set_resource_version(&mut self, version: impl Into<String>) {
        if let Some(metadata) = self.0.get_mut("metadata").and_then(|m| m.as_object_mut()) {
            metadata.insert(
                "resourceVersion".to_string(),
                serde_json::Value::String(version.into()),
            );
        }
    }

    /// String-valued labels; non-string values are skipped
    pub fn labels(&self) -> LabelSet {
        self.0
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(|l| l.as_object())
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
    }
}
