//! Provider configuration
//!
//! The provider configuration is read once per process. It selects the
//! credential flavor and, for AWS, the resolution variant plus the `aws`
//! block handed to [`actionflow_auth::resolve`].
//!
//! ```yaml
//! flavor: aws
//! variant: dual-mode
//! aws:
//!   region: us-west-2
//!   assume_role:
//!     role_arn: arn:aws:iam::123456789012:role/deployer
//! ```

pub mod error;

pub use error::*;

use actionflow_auth::{AwsProviderConfig, ProviderVariant, aws_bootstrap, resolve};
use actionflow_core::{CredentialBootstrap, CredentialFlavor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "ACTIONFLOW_CONFIG";

const CONFIG_DIR: &str = ".actionflow";
const GLOBAL_CONFIG_FILE: &str = "actionflow.yaml";
const CANDIDATES: [&str; 4] = [
    "actionflow.local.yaml",
    ".actionflow.local.yaml",
    "actionflow.yaml",
    ".actionflow.yaml",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_flavor")]
    pub flavor: CredentialFlavor,

    #[serde(default)]
    pub variant: ProviderVariant,

    #[serde(default)]
    pub aws: Option<AwsProviderConfig>,
}

fn default_flavor() -> CredentialFlavor {
    CredentialFlavor::Aws
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            flavor: default_flavor(),
            variant: ProviderVariant::default(),
            aws: None,
        }
    }
}

impl ProviderConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve credentials and compile the bootstrap script for this provider
    pub fn bootstrap(&self) -> Result<CredentialBootstrap> {
        match self.flavor {
            CredentialFlavor::Kubernetes => Ok(CredentialBootstrap::kubernetes()),
            CredentialFlavor::Aws => {
                let auth = resolve(self.variant, self.aws.as_ref())?;
                Ok(aws_bootstrap(&auth)?)
            }
        }
    }
}

/// Load a config file from an explicit path
pub fn load_config(path: &Path) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded provider config");
    Ok(config)
}

/// Find and load the provider config
pub fn load() -> Result<ProviderConfig> {
    load_config(&find_config_file()?)
}

/// Find the provider config file
///
/// Search order:
/// 1. `ACTIONFLOW_CONFIG` (direct path)
/// 2. current directory: actionflow.local.yaml, .actionflow.local.yaml, actionflow.yaml, .actionflow.yaml
/// 3. the same names under `./.actionflow/`
/// 4. `~/.config/actionflow/actionflow.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            return Ok(path);
        }
        warn!(path = %config_path, "{} points at a missing file, searching defaults", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;

    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    let local_dir = current_dir.join(CONFIG_DIR);
    if local_dir.is_dir()
        && let Some(path) = first_existing(&local_dir)
    {
        return Ok(path);
    }

    if let Some(global) = global_config_path()
        && global.exists()
    {
        return Ok(global);
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// `~/.config/actionflow/actionflow.yaml` (platform config dir)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("actionflow").join(GLOBAL_CONFIG_FILE))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
