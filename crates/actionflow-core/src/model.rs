//! Declarative action model
//!
//! These types are what callers hand to the reconciler. They are usually
//! loaded from an action file (YAML or JSON) and validated with
//! [`crate::validate::validate_spec`] before any object is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace used when an action does not name one
pub const DEFAULT_NAMESPACE: &str = "tekton-pipelines";

/// A declarative action: the input to every reconciler operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Human readable name of the action (e.g. "restart")
    pub display_name: String,

    /// Blueprint resource the action belongs to
    pub resource_name: String,

    /// Unique name of the environment the action runs in
    pub environment_name: String,

    /// Blueprint resource kind (only used in labels)
    pub resource_kind: String,

    /// Target namespace for the generated objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Task description; defaults to the generated task id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered user steps
    pub steps: Vec<Step>,

    /// User parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,

    /// Custom labels, overridden by auto-derived labels on collision
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ActionSpec {
    /// Namespace with the default applied
    pub fn namespace(&self) -> &str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }
}

/// A single user step of the Task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub image: String,
    pub script: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ComputeResources>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// Compute requests and limits (e.g. cpu, memory)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResources {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

impl ComputeResources {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A Task parameter declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

impl Param {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParamType::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Array,
    Object,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Array => write!(f, "array"),
            ParamType::Object => write!(f, "object"),
        }
    }
}

/// Which credential bootstrap an action gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialFlavor {
    /// Cluster credentials: a base64 kubeconfig passed as a Task parameter
    Kubernetes,
    /// Cloud credentials: an AWS bootstrap script baked into the StepAction
    Aws,
}

impl CredentialFlavor {
    pub fn is_cloud(&self) -> bool {
        matches!(self, CredentialFlavor::Aws)
    }
}

impl std::fmt::Display for CredentialFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialFlavor::Kubernetes => write!(f, "kubernetes"),
            CredentialFlavor::Aws => write!(f, "aws"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_yaml() {
        let yaml = r#"
display_name: restart
resource_name: my-app
environment_name: prod
resource_kind: service
steps:
  - name: restart
    image: bitnami/kubectl:latest
    script: kubectl rollout restart deploy/my-app
    resources:
      requests:
        cpu: 100m
    env:
      - name: APP
        value: my-app
params:
  - name: replicas
    type: string
labels:
  team: platform
"#;
        let spec: ActionSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(spec.steps.len(), 1);
        assert_eq!(spec.steps[0].env[0], EnvVar::new("APP", "my-app"));
        assert_eq!(
            spec.steps[0].resources.as_ref().unwrap().requests["cpu"],
            "100m"
        );
        assert_eq!(spec.params[0].param_type, ParamType::String);
        assert_eq!(spec.labels["team"], "platform");
    }

    #[test]
    fn test_unknown_param_type_rejected() {
        let yaml = "name: x\ntype: number\n";
        assert!(serde_yaml::from_str::<Param>(yaml).is_err());
    }

    #[test]
    fn test_empty_namespace_uses_default() {
        let spec = ActionSpec {
            display_name: "a".into(),
            resource_name: "b".into(),
            environment_name: "c".into(),
            resource_kind: "d".into(),
            namespace: Some(String::new()),
            description: None,
            steps: vec![],
            params: vec![],
            labels: BTreeMap::new(),
        };
        assert_eq!(spec.namespace(), "tekton-pipelines");
    }
}
