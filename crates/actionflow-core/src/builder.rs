//! Task and StepAction builders
//!
//! The Task always starts with a step referencing the credential StepAction.
//! Every user step then gets an environment variable pointing at the files
//! that StepAction writes.

use crate::identity::ResourceIdentity;
use crate::metadata::LabelSet;
use crate::model::{ActionSpec, CredentialFlavor, EnvVar, Param, Step};
use crate::objects::{
    InlineStep, NamedRef, ObjectMeta, ParamBinding, StepAction, StepActionSpec, StepReference,
    Task, TaskSpec, TaskStep,
};

/// Image running the credential bootstrap
pub const BOOTSTRAP_IMAGE: &str = "facetscloud/actions-base-image:v1.1.0";

/// Name of the first Task step
pub const CREDENTIAL_STEP_NAME: &str = "setup-credentials";

pub const USER_EMAIL_PARAM: &str = "USER_EMAIL";
pub const USER_KUBECONFIG_PARAM: &str = "USER_KUBECONFIG";

pub const KUBECONFIG_PATH: &str = "/workspace/.kube/config";
pub const AWS_CONFIG_PATH: &str = "/workspace/.aws/config";
pub const AWS_CREDENTIALS_PATH: &str = "/workspace/.aws/credentials";

/// Decodes the base64 kubeconfig parameter into [`KUBECONFIG_PATH`]
pub const KUBERNETES_BOOTSTRAP_SCRIPT: &str = r#"#!/bin/bash
set -e
mkdir -p /workspace/.kube
echo -n "$USER_KUBECONFIG" | base64 -d > /workspace/.kube/config
chmod 600 /workspace/.kube/config
"#;

/// The credential bootstrap for one process: flavor plus compiled script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBootstrap {
    pub flavor: CredentialFlavor,
    pub script: String,
}

impl CredentialBootstrap {
    pub fn kubernetes() -> Self {
        Self {
            flavor: CredentialFlavor::Kubernetes,
            script: KUBERNETES_BOOTSTRAP_SCRIPT.to_string(),
        }
    }

    pub fn aws(script: impl Into<String>) -> Self {
        Self {
            flavor: CredentialFlavor::Aws,
            script: script.into(),
        }
    }
}

/// Environment variables injected into every user step
pub fn credential_env(flavor: CredentialFlavor) -> Vec<EnvVar> {
    match flavor {
        CredentialFlavor::Kubernetes => vec![EnvVar::new("KUBECONFIG", KUBECONFIG_PATH)],
        CredentialFlavor::Aws => vec![
            EnvVar::new("AWS_CONFIG_FILE", AWS_CONFIG_PATH),
            EnvVar::new("AWS_SHARED_CREDENTIALS_FILE", AWS_CREDENTIALS_PATH),
        ],
    }
}

/// Parameters declared on the Task ahead of the user's own
pub fn injected_params(flavor: CredentialFlavor) -> Vec<Param> {
    match flavor {
        CredentialFlavor::Kubernetes => vec![
            Param::string(USER_EMAIL_PARAM),
            Param::string(USER_KUBECONFIG_PARAM),
        ],
        // credentials are baked into the StepAction
        CredentialFlavor::Aws => vec![],
    }
}

/// Build the Task for an action
pub fn build_task(
    identity: &ResourceIdentity,
    spec: &ActionSpec,
    labels: &LabelSet,
    flavor: CredentialFlavor,
) -> Task {
    tracing::debug!(task = %identity.task_id, %flavor, steps = spec.steps.len(), "building task");

    let mut steps = Vec::with_capacity(spec.steps.len() + 1);
    steps.push(credential_step(identity, flavor));
    steps.extend(spec.steps.iter().map(|s| user_step(s, flavor)));

    let mut params = injected_params(flavor);
    params.extend(spec.params.iter().cloned());

    let description = spec
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| identity.task_id.clone());

    Task {
        metadata: ObjectMeta {
            name: identity.task_id.clone(),
            namespace: spec.namespace().to_string(),
            labels: labels.clone(),
            resource_version: None,
        },
        spec: TaskSpec {
            description,
            steps,
            params,
        },
    }
}

/// Build the StepAction holding the credential bootstrap script
pub fn build_credential_step_action(
    identity: &ResourceIdentity,
    namespace: &str,
    labels: &LabelSet,
    bootstrap: &CredentialBootstrap,
) -> StepAction {
    let (params, env) = match bootstrap.flavor {
        CredentialFlavor::Kubernetes => (
            vec![Param::string(USER_KUBECONFIG_PARAM)],
            vec![EnvVar::new(
                USER_KUBECONFIG_PARAM,
                param_ref(USER_KUBECONFIG_PARAM),
            )],
        ),
        CredentialFlavor::Aws => (vec![], vec![]),
    };

    StepAction {
        metadata: ObjectMeta {
            name: identity.credential_setup_id.clone(),
            namespace: namespace.to_string(),
            labels: labels.clone(),
            resource_version: None,
        },
        spec: StepActionSpec {
            image: BOOTSTRAP_IMAGE.to_string(),
            script: bootstrap.script.clone(),
            params,
            env,
        },
    }
}

fn credential_step(identity: &ResourceIdentity, flavor: CredentialFlavor) -> TaskStep {
    let params = match flavor {
        CredentialFlavor::Kubernetes => vec![ParamBinding {
            name: USER_KUBECONFIG_PARAM.to_string(),
            value: param_ref(USER_KUBECONFIG_PARAM),
        }],
        CredentialFlavor::Aws => vec![],
    };

    TaskStep::Reference(StepReference {
        name: CREDENTIAL_STEP_NAME.to_string(),
        reference: NamedRef {
            name: identity.credential_setup_id.clone(),
        },
        params,
    })
}

fn user_step(step: &Step, flavor: CredentialFlavor) -> TaskStep {
    let mut env = step.env.clone();
    env.extend(credential_env(flavor));

    TaskStep::Inline(InlineStep {
        name: step.name.clone(),
        image: step.image.clone(),
        script: step.script.clone(),
        env,
        compute_resources: step.resources.clone().filter(|r| !r.is_empty()),
    })
}

fn param_ref(name: &str) -> String {
    format!("$(params.{})", name)
}
