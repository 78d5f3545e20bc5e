//! Provider-level AWS configuration as written by the operator
//!
//! Nothing here is validated; see [`crate::resolve`] for that.

use serde::{Deserialize, Serialize};

/// Which credential policy this deployment follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderVariant {
    /// Inline keys, or an explicit STS assume-role call at run time
    #[default]
    DualMode,
    /// Workload identity chained to the target role through `source_profile`
    ChainedIdentity,
}

impl std::fmt::Display for ProviderVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderVariant::DualMode => write!(f, "dual-mode"),
            ProviderVariant::ChainedIdentity => write!(f, "chained-identity"),
        }
    }
}

/// The `aws` block of the provider configuration
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsProviderConfig {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub assume_role: Option<AssumeRoleBlock>,
}

impl AwsProviderConfig {
    /// Both inline keys present and non-empty
    pub fn has_inline_credentials(&self) -> bool {
        non_empty(&self.access_key).is_some() && non_empty(&self.secret_key).is_some()
    }

    /// Either inline key present
    pub fn has_any_inline_material(&self) -> bool {
        non_empty(&self.access_key).is_some() || non_empty(&self.secret_key).is_some()
    }
}

impl std::fmt::Debug for AwsProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProviderConfig")
            .field("region", &self.region)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("assume_role", &self.assume_role)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssumeRoleBlock {
    #[serde(default)]
    pub role_arn: Option<String>,

    #[serde(default)]
    pub session_name: Option<String>,

    #[serde(default)]
    pub external_id: Option<String>,

    /// Session duration in seconds
    #[serde(default)]
    pub duration: Option<i64>,
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
