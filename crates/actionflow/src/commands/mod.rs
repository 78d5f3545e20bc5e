pub mod create;
pub mod delete;
pub mod import;
pub mod list;
pub mod render;
pub mod status;
pub mod update;
pub mod validate;

use actionflow_config::ProviderConfig;
use actionflow_core::{ActionSpec, CredentialBootstrap, generate_identity};
use actionflow_reconciler::{ActionState, Reconciler, StateManager};
use actionflow_store::{KubeStore, ObjectStore};
use anyhow::Context as _;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options shared by every command
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub cluster_id: Option<String>,
}

impl Context {
    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let config = match &self.config_path {
            Some(path) => actionflow_config::load_config(path)?,
            None => actionflow_config::load()?,
        };
        tracing::debug!(flavor = %config.flavor, variant = %config.variant, "provider config");
        Ok(config)
    }

    /// Resolve credentials once for this process
    pub fn bootstrap(&self) -> anyhow::Result<CredentialBootstrap> {
        self.provider_config()?
            .bootstrap()
            .context("failed to resolve provider credentials")
    }

    pub fn reconciler(&self, store: Arc<dyn ObjectStore>) -> anyhow::Result<Reconciler> {
        let reconciler = Reconciler::new(store, self.bootstrap()?);
        Ok(match &self.cluster_id {
            Some(id) => reconciler.with_cluster_id(id),
            None => reconciler,
        })
    }

    pub async fn kube_reconciler(&self) -> anyhow::Result<Reconciler> {
        let store = KubeStore::try_default()
            .await
            .context("failed to connect to the Kubernetes API")?;
        self.reconciler(Arc::new(store))
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.project_dir)
    }
}

/// Load an action file (YAML or JSON)
pub fn load_action(path: &Path) -> anyhow::Result<ActionSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// State id an action file maps to
pub fn action_id(spec: &ActionSpec) -> String {
    let identity = generate_identity(
        &spec.resource_name,
        &spec.environment_name,
        &spec.display_name,
    );
    ActionState::state_id(spec.namespace(), &identity.task_id)
}

pub fn print_state(state: &ActionState) {
    println!("  ID:         {}", state.id.cyan());
    println!("  Task:       {}", state.task_name());
    println!("  StepAction: {}", state.step_action_name());
    println!(
        "  Action:     {} ({} / {})",
        state.display_name.bold(),
        state.resource_name,
        state.environment_name
    );
    println!("  Flavor:     {}", state.flavor);
    if let Some(version) = &state.task_version {
        println!("  Version:    {}", version);
    }
}
