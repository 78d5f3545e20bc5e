//! actionflow core
//!
//! Turns a declarative [`ActionSpec`] into the two Tekton objects that back it:
//! a `Task` holding the user's steps and a `StepAction` holding the credential
//! bootstrap referenced from the Task's first step.
//!
//! ```text
//! ActionSpec ──┬── identity  ─── ResourceIdentity ─┐
//!              ├── metadata  ─── LabelSet ─────────┼── builder ── Task / StepAction
//!              └── validate                        │
//! CredentialBootstrap (resolved once per process) ─┘
//! ```

pub mod builder;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod model;
pub mod objects;
pub mod validate;

// Re-exports
pub use builder::{
    CredentialBootstrap, build_credential_step_action, build_task, credential_env,
    injected_params,
};
pub use error::{CoreError, Result};
pub use identity::{ResourceIdentity, credential_setup_id_for, generate_identity};
pub use metadata::{LabelSet, ResourceMetadata, build_labels, cluster_id_from_env};
pub use model::{
    ActionSpec, ComputeResources, CredentialFlavor, DEFAULT_NAMESPACE, EnvVar, Param, ParamType,
    Step,
};
pub use objects::{Manifest, ObjectKind, ObjectMeta, StepAction, Task, TaskStep, TektonObject};
pub use validate::{validate_identity, validate_labels, validate_namespace, validate_spec};
