//! Lifecycle of one action against the object store
//!
//! Store calls are issued one at a time in a fixed order:
//!
//! | operation | calls                                                  |
//! |-----------|--------------------------------------------------------|
//! | create    | create StepAction, create Task                         |
//! | read      | get Task                                               |
//! | update    | get + update StepAction, then get + update Task        |
//! | delete    | delete Task, delete StepAction                         |
//! | import    | get Task                                               |
//!
//! Nothing is rolled back. A failed Task create leaves the StepAction in
//! place, and a failed StepAction delete after the Task is gone leaves it
//! orphaned; both surface as errors.

use crate::error::{Operation, ReconcileError, Result};
use crate::state::{ActionState, ReconcilePhase};
use actionflow_core::metadata::{
    LABEL_CLOUD_ACTION, LABEL_DISPLAY_NAME, LABEL_ENVIRONMENT, LABEL_RESOURCE_KIND,
    LABEL_RESOURCE_NAME, REQUIRED_LABELS, normalize_cluster_id,
};
use actionflow_core::{
    ActionSpec, CredentialBootstrap, CredentialFlavor, LabelSet, Manifest, ObjectKind,
    ResourceIdentity, StepAction, Task, TektonObject, build_credential_step_action, build_labels,
    build_task, cluster_id_from_env, credential_setup_id_for, generate_identity,
    validate_identity, validate_labels, validate_namespace, validate_spec,
};
use actionflow_store::ObjectStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Non-fatal notice that an import could not recover everything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    pub id: String,
    pub message: String,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub state: ActionState,
    pub warning: ImportWarning,
}

/// Both objects for one action, built and validated
#[derive(Debug, Clone)]
pub struct PlannedObjects {
    pub identity: ResourceIdentity,
    pub labels: LabelSet,
    pub step_action: StepAction,
    pub task: Task,
}

pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    bootstrap: CredentialBootstrap,
    cluster_id: String,
}

impl Reconciler {
    /// `bootstrap` is resolved once per process; the cluster id comes from `CLUSTER_ID`
    pub fn new(store: Arc<dyn ObjectStore>, bootstrap: CredentialBootstrap) -> Self {
        Self {
            store,
            bootstrap,
            cluster_id: cluster_id_from_env(),
        }
    }

    pub fn with_cluster_id(mut self, cluster_id: &str) -> Self {
        self.cluster_id = normalize_cluster_id(Some(cluster_id));
        self
    }

    pub fn flavor(&self) -> CredentialFlavor {
        self.bootstrap.flavor
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Validate the spec and build both objects without touching the store
    pub fn plan(&self, spec: &ActionSpec) -> Result<PlannedObjects> {
        validate_spec(spec)?;
        let identity = generate_identity(
            &spec.resource_name,
            &spec.environment_name,
            &spec.display_name,
        );
        self.plan_with(identity, spec.namespace(), spec)
    }

    fn plan_with(
        &self,
        identity: ResourceIdentity,
        namespace: &str,
        spec: &ActionSpec,
    ) -> Result<PlannedObjects> {
        validate_identity(&identity)?;
        validate_namespace(namespace)?;

        let labels = build_labels(
            &spec.display_name,
            &spec.resource_name,
            &spec.resource_kind,
            &spec.environment_name,
            &self.cluster_id,
            self.flavor(),
            &spec.labels,
        );
        validate_labels(&labels)?;

        let step_action =
            build_credential_step_action(&identity, namespace, &labels, &self.bootstrap);
        let mut task = build_task(&identity, spec, &labels, self.flavor());
        task.metadata.namespace = namespace.to_string();

        Ok(PlannedObjects {
            identity,
            labels,
            step_action,
            task,
        })
    }

    #[tracing::instrument(skip(self, spec), fields(display_name = %spec.display_name))]
    pub async fn create(&self, spec: &ActionSpec) -> Result<ActionState> {
        let planned = self.plan(spec)?;
        let namespace = spec.namespace();
        let id = ActionState::state_id(namespace, &planned.identity.task_id);
        transition(&id, ReconcilePhase::Absent, ReconcilePhase::Creating);

        let step_action = self
            .create_object(Operation::Create, &planned.step_action)
            .await?;
        let task = self
            .create_object(Operation::Create, &planned.task)
            .await
            .inspect_err(|_| {
                warn!(
                    id = %id,
                    step_action = %planned.identity.credential_setup_id,
                    "Task creation failed; StepAction left in place"
                );
            })?;

        transition(&id, ReconcilePhase::Creating, ReconcilePhase::Present);
        let now = Utc::now();
        Ok(ActionState {
            id,
            namespace: namespace.to_string(),
            identity: planned.identity,
            display_name: spec.display_name.clone(),
            resource_name: spec.resource_name.clone(),
            environment_name: spec.environment_name.clone(),
            resource_kind: spec.resource_kind.clone(),
            flavor: self.flavor(),
            labels: planned.labels,
            task_version: task.resource_version().map(str::to_string),
            step_action_version: step_action.resource_version().map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    /// Refresh state from the Task; `None` means it is gone and should be forgotten
    #[tracing::instrument(skip(self, state), fields(id = %state.id))]
    pub async fn read(&self, state: &ActionState) -> Result<Option<ActionState>> {
        let task = match self
            .store
            .get(&state.namespace, ObjectKind::Task, state.task_name())
            .await
        {
            Ok(task) => task,
            Err(e) if e.is_not_found() => {
                info!(phase = %ReconcilePhase::Absent, "Task no longer exists");
                return Ok(None);
            }
            Err(e) => {
                return Err(ReconcileError::store(
                    Operation::Read,
                    ObjectKind::Task,
                    &state.namespace,
                    state.task_name(),
                    e,
                ));
            }
        };

        let mut refreshed = state.clone();
        refreshed.labels = task.labels();
        refreshed.task_version = task.resource_version().map(str::to_string);
        if let Some(kind) = refreshed.labels.get(LABEL_RESOURCE_KIND) {
            refreshed.resource_kind = kind.clone();
        }
        Ok(Some(refreshed))
    }

    /// Replace both objects with ones built from `spec`, keeping the identity
    /// and namespace the action was created with
    ///
    /// The configured flavor must match the one the action was created (or
    /// imported) with.
    #[tracing::instrument(skip(self, state, spec), fields(id = %state.id))]
    pub async fn update(&self, state: &ActionState, spec: &ActionSpec) -> Result<ActionState> {
        validate_spec(spec)?;
        if state.flavor != self.flavor() {
            return Err(ReconcileError::FlavorMismatch {
                id: state.id.clone(),
                stored: state.flavor,
                configured: self.flavor(),
            });
        }
        if spec.namespace() != state.namespace {
            warn!(
                requested = spec.namespace(),
                current = %state.namespace,
                "namespace cannot change in place; keeping the current one"
            );
        }

        let planned = self.plan_with(state.identity.clone(), &state.namespace, spec)?;
        transition(&state.id, ReconcilePhase::Present, ReconcilePhase::Updating);

        let step_action = self.replace_object(&planned.step_action).await?;
        let task = self.replace_object(&planned.task).await?;

        transition(&state.id, ReconcilePhase::Updating, ReconcilePhase::Present);
        let mut updated = state.clone();
        updated.display_name = spec.display_name.clone();
        updated.resource_name = spec.resource_name.clone();
        updated.environment_name = spec.environment_name.clone();
        updated.resource_kind = spec.resource_kind.clone();
        updated.flavor = self.flavor();
        updated.labels = planned.labels;
        updated.task_version = task.resource_version().map(str::to_string);
        updated.step_action_version = step_action.resource_version().map(str::to_string);
        updated.touch();
        Ok(updated)
    }

    #[tracing::instrument(skip(self, state), fields(id = %state.id))]
    pub async fn delete(&self, state: &ActionState) -> Result<()> {
        transition(&state.id, ReconcilePhase::Present, ReconcilePhase::Deleting);

        self.delete_object(&state.namespace, ObjectKind::Task, state.task_name())
            .await?;
        self.delete_object(
            &state.namespace,
            ObjectKind::StepAction,
            state.step_action_name(),
        )
        .await
        .inspect_err(|_| {
            warn!(
                step_action = state.step_action_name(),
                "Task deleted but StepAction deletion failed; StepAction is orphaned"
            );
        })?;

        transition(&state.id, ReconcilePhase::Deleting, ReconcilePhase::Absent);
        Ok(())
    }

    /// Adopt an existing Task by `namespace/task_id`
    #[tracing::instrument(skip(self))]
    pub async fn import(&self, import_id: &str) -> Result<ImportOutcome> {
        let (namespace, task_id) = parse_import_id(import_id)?;

        let task = self
            .store
            .get(namespace, ObjectKind::Task, task_id)
            .await
            .map_err(|e| {
                ReconcileError::store(Operation::Import, ObjectKind::Task, namespace, task_id, e)
            })?;

        let labels = task.labels();
        let missing: Vec<String> = REQUIRED_LABELS
            .iter()
            .filter(|key| labels.get(**key).is_none_or(|v| v.is_empty()))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ReconcileError::MissingLabels {
                id: import_id.to_string(),
                missing,
            });
        }

        let label = |key: &str| labels.get(key).cloned().unwrap_or_default();
        let display_name = label(LABEL_DISPLAY_NAME);
        let resource_name = label(LABEL_RESOURCE_NAME);
        let environment_name = label(LABEL_ENVIRONMENT);
        let resource_kind = label(LABEL_RESOURCE_KIND);

        let expected = generate_identity(&resource_name, &environment_name, &display_name);
        if expected.task_id != task_id {
            warn!(
                task_id,
                expected = %expected.task_id,
                "Task name does not match its labels; keeping the existing name"
            );
        }

        let flavor = match labels.get(LABEL_CLOUD_ACTION).map(String::as_str) {
            Some("true") => CredentialFlavor::Aws,
            Some("false") => CredentialFlavor::Kubernetes,
            _ => self.flavor(),
        };

        let identity = ResourceIdentity {
            task_id: task_id.to_string(),
            credential_setup_id: credential_setup_id_for(task_id),
        };
        let now = Utc::now();
        let state = ActionState {
            id: import_id.to_string(),
            namespace: namespace.to_string(),
            identity,
            display_name,
            resource_name,
            environment_name,
            resource_kind,
            flavor,
            task_version: task.resource_version().map(str::to_string),
            step_action_version: None,
            labels,
            created_at: now,
            updated_at: now,
        };

        let warning = ImportWarning {
            id: import_id.to_string(),
            message: "imported from labels only; steps, params, env and resource settings \
                      must be supplied again before the next update"
                .to_string(),
        };
        warn!(%warning, "partial import");
        info!(phase = %ReconcilePhase::Present, "import complete");

        Ok(ImportOutcome { state, warning })
    }

    async fn create_object<T: TektonObject>(&self, op: Operation, object: &T) -> Result<Manifest> {
        let manifest = object.to_manifest()?;
        debug!(kind = %T::KIND, name = object.name(), "store create");
        self.store
            .create(object.namespace(), &manifest)
            .await
            .map_err(|e| ReconcileError::store(op, T::KIND, object.namespace(), object.name(), e))
    }

    async fn replace_object<T: TektonObject>(&self, object: &T) -> Result<Manifest> {
        let (namespace, name) = (object.namespace(), object.name());
        let store_err = |e| ReconcileError::store(Operation::Update, T::KIND, namespace, name, e);

        debug!(kind = %T::KIND, name, "store get");
        let current = self
            .store
            .get(namespace, T::KIND, name)
            .await
            .map_err(store_err)?;

        let mut manifest = object.to_manifest()?;
        if let Some(version) = current.resource_version() {
            manifest.set_resource_version(version);
        }

        debug!(kind = %T::KIND, name, version = ?manifest.resource_version(), "store update");
        self.store
            .update(namespace, &manifest)
            .await
            .map_err(store_err)
    }

    async fn delete_object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()> {
        debug!(%kind, name, "store delete");
        self.store
            .delete(namespace, kind, name)
            .await
            .map_err(|e| ReconcileError::store(Operation::Delete, kind, namespace, name, e))
    }
}

fn transition(id: &str, from: ReconcilePhase, to: ReconcilePhase) {
    info!(id, %from, %to, "phase transition");
}

/// Split `namespace/task_id`
pub fn parse_import_id(import_id: &str) -> Result<(&str, &str)> {
    match import_id.split_once('/') {
        Some((namespace, task_id))
            if !namespace.is_empty() && !task_id.is_empty() && !task_id.contains('/') =>
        {
            Ok((namespace, task_id))
        }
        _ => Err(ReconcileError::InvalidImportId(import_id.to_string())),
    }
}
