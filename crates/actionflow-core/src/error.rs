use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid action: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
