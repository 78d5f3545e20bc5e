use actionflow_auth::ResolutionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found. Looked in:\n\
        - current directory: actionflow.local.yaml, .actionflow.local.yaml, actionflow.yaml, .actionflow.yaml\n\
        - ./.actionflow/ directory\n\
        - ~/.config/actionflow/actionflow.yaml\n\
        The ACTIONFLOW_CONFIG environment variable can point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
