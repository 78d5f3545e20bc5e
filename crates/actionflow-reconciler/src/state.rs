//! Action state and its on-disk record
//!
//! [`ActionState`] is what the reconciler hands back after each operation.
//! The CLI keeps these in `.actionflow/state.json` so later commands can find
//! the identity an action was created with.
//!
//! ```text
//! .actionflow/
//! ├── state.json          current state
//! ├── state.json.backup   state before the last save
//! ├── state.json.tmp      only present while a save is in flight
//! └── lock.json           holder + acquired_at of the running command
//! ```
//!
//! `lock.json` is created with `create_new`, so exactly one command holds it.
//! A lock older than one hour is considered abandoned and replaced. A lock
//! that cannot be parsed is judged by its modification time instead, since a
//! new holder may not have written it yet.

use crate::error::{ReconcileError, Result};
use actionflow_core::{CredentialFlavor, LabelSet, ResourceIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".actionflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_TEMP: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";

/// Lifecycle phase of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl std::fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcilePhase::Absent => write!(f, "absent"),
            ReconcilePhase::Creating => write!(f, "creating"),
            ReconcilePhase::Present => write!(f, "present"),
            ReconcilePhase::Updating => write!(f, "updating"),
            ReconcilePhase::Deleting => write!(f, "deleting"),
        }
    }
}

/// State of one managed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    /// `namespace/task_id`
    pub id: String,

    pub namespace: String,

    pub identity: ResourceIdentity,

    pub display_name: String,
    pub resource_name: String,
    pub environment_name: String,

    /// Empty when unknown (after import without the label)
    pub resource_kind: String,

    pub flavor: CredentialFlavor,

    /// Labels last written to (or read from) the Task
    #[serde(default)]
    pub labels: LabelSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_action_version: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActionState {
    pub fn state_id(namespace: &str, task_id: &str) -> String {
        format!("{}/{}", namespace, task_id)
    }

    pub fn task_name(&self) -> &str {
        &self.identity.task_id
    }

    pub fn step_action_name(&self) -> &str {
        &self.identity.credential_setup_id
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Contents of `state.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    pub updated_at: DateTime<Utc>,

    /// Actions indexed by `namespace/task_id`
    pub actions: BTreeMap<String, ActionState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            actions: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&ActionState> {
        self.actions.get(id)
    }

    pub fn upsert(&mut self, state: ActionState) {
        self.actions.insert(state.id.clone(), state);
        self.updated_at = Utc::now();
    }

    pub fn remove(&mut self, id: &str) -> Option<ActionState> {
        let removed = self.actions.remove(id);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionState> {
        self.actions.values()
    }
}

/// Reads and writes `.actionflow/state.json` under a project root
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn temp_path(&self) -> PathBuf {
        self.state_dir().join(STATE_TEMP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the state file; a missing file is an empty state
    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(StateFile::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateFile = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(ReconcileError::State(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} actions", state.actions.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as `state.json.backup`
    ///
    /// The new content goes to `state.json.tmp` first and is renamed over
    /// `state.json`, so a failed write leaves the current file in place.
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let tmp = self.temp_path();

        let content = serde_json::to_string_pretty(state)?;
        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
            tracing::debug!("Created state backup");
        }
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved state with {} actions", state.actions.len());
        Ok(())
    }

    /// Acquire an exclusive lock; locks older than one hour are treated as stale
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&lock_info)?;

        // second attempt only after a stale lock was cleared
        for _ in 0..2 {
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
                .await;

            match opened {
                Ok(mut file) => {
                    let written = async {
                        file.write_all(content.as_bytes()).await?;
                        file.flush().await
                    }
                    .await;
                    if let Err(e) = written {
                        drop(file);
                        let _ = fs::remove_file(&lock_path).await;
                        return Err(e.into());
                    }

                    tracing::debug!("Acquired state lock");
                    return Ok(StateLock {
                        lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    clear_stale_lock(&lock_path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReconcileError::Lock(format!(
            "{} was recreated while clearing a stale lock",
            lock_path.display()
        )))
    }
}

/// Remove `lock_path` if its holder is gone; errors while it is still held
async fn clear_stale_lock(lock_path: &Path) -> Result<()> {
    let content = match fs::read_to_string(lock_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<LockInfo>(&content) {
        Ok(lock_info) => {
            if is_fresh(lock_info.acquired_at) {
                return Err(ReconcileError::Lock(format!(
                    "State is locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }
            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }
        Err(parse_error) => {
            // a holder may sit between creating the file and writing it
            let modified: DateTime<Utc> = match fs::metadata(lock_path).await {
                Ok(metadata) => metadata.modified()?.into(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            if is_fresh(modified) {
                return Err(ReconcileError::Lock(format!(
                    "{} is unreadable ({}); delete it if no other actionflow command is running",
                    lock_path.display(),
                    parse_error
                )));
            }
            tracing::warn!("Removing unreadable stale lock {}", lock_path.display());
        }
    }

    match fs::remove_file(lock_path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn is_fresh(since: DateTime<Utc>) -> bool {
    Utc::now().signed_duration_since(since).num_hours() < 1
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// Held while a command mutates the state file; removed on release or drop
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
