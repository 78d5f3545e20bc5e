//! Reconciler error types

use actionflow_core::{CoreError, CredentialFlavor, ObjectKind};
use actionflow_store::StoreError;
use thiserror::Error;

/// Lifecycle operation being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Import => write!(f, "import"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("{op} failed on {kind} {namespace}/{name}: {source}")]
    Store {
        op: Operation,
        kind: ObjectKind,
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Invalid import ID {0:?}: expected <namespace>/<task-name>")]
    InvalidImportId(String),

    #[error("Task {id} is missing required labels: {}", missing.join(", "))]
    MissingLabels { id: String, missing: Vec<String> },

    #[error("{id} was created with {stored} credentials but {configured} is configured; delete and recreate it to switch")]
    FlavorMismatch {
        id: String,
        stored: CredentialFlavor,
        configured: CredentialFlavor,
    },

    #[error("State file error: {0}")]
    State(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconcileError {
    pub(crate) fn store(
        op: Operation,
        kind: ObjectKind,
        namespace: &str,
        name: &str,
        source: StoreError,
    ) -> Self {
        Self::Store {
            op,
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        }
    }

    /// The underlying store error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_conflict)
    }

    pub fn is_not_found(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_not_found)
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
