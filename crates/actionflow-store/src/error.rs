//! Object store error types

use actionflow_core::{CoreError, ObjectKind};
use thiserror::Error;

/// Object store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: ObjectKind,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} was modified concurrently: {message}")]
    Conflict {
        kind: ObjectKind,
        namespace: String,
        name: String,
        message: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: ObjectKind,
        namespace: String,
        name: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn not_found(kind: ObjectKind, namespace: &str, name: &str) -> Self {
        Self::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn already_exists(kind: ObjectKind, namespace: &str, name: &str) -> Self {
        Self::AlreadyExists {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn conflict(
        kind: ObjectKind,
        namespace: &str,
        name: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
