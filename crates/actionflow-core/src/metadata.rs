//! Labels attached to generated objects

use crate::model::CredentialFlavor;
use std::collections::BTreeMap;

pub type LabelSet = BTreeMap<String, String>;

pub const LABEL_DISPLAY_NAME: &str = "display_name";
pub const LABEL_RESOURCE_NAME: &str = "resource_name";
pub const LABEL_RESOURCE_KIND: &str = "resource_kind";
pub const LABEL_ENVIRONMENT: &str = "environment_unique_name";
pub const LABEL_CLUSTER_ID: &str = "cluster_id";
pub const LABEL_CLOUD_ACTION: &str = "cloud_action";

/// Labels an imported Task must carry
pub const REQUIRED_LABELS: [&str; 5] = [
    LABEL_DISPLAY_NAME,
    LABEL_RESOURCE_NAME,
    LABEL_RESOURCE_KIND,
    LABEL_ENVIRONMENT,
    LABEL_CLUSTER_ID,
];

/// Environment variable holding the cluster identifier
pub const CLUSTER_ID_ENV: &str = "CLUSTER_ID";

/// Cluster id used when [`CLUSTER_ID_ENV`] is unset or empty
pub const UNKNOWN_CLUSTER_ID: &str = "na";

/// Metadata for one action's objects
#[derive(Debug, Clone)]
pub struct ResourceMetadata {
    pub display_name: String,
    pub resource_name: String,
    pub resource_kind: String,
    pub environment_name: String,
    pub cluster_id: String,
    pub flavor: CredentialFlavor,
    pub custom_labels: LabelSet,
}

impl ResourceMetadata {
    /// Labels with custom entries first and auto-derived keys written last,
    /// so the auto-derived values always win.
    pub fn labels(&self) -> LabelSet {
        let mut labels = self.custom_labels.clone();

        labels.insert(LABEL_DISPLAY_NAME.into(), self.display_name.clone());
        labels.insert(LABEL_RESOURCE_NAME.into(), self.resource_name.clone());
        labels.insert(LABEL_RESOURCE_KIND.into(), self.resource_kind.clone());
        labels.insert(LABEL_ENVIRONMENT.into(), self.environment_name.clone());
        labels.insert(
            LABEL_CLUSTER_ID.into(),
            normalize_cluster_id(Some(&self.cluster_id)),
        );
        labels.insert(
            LABEL_CLOUD_ACTION.into(),
            self.flavor.is_cloud().to_string(),
        );

        labels
    }
}

/// Shorthand for building [`ResourceMetadata`] and taking its labels
pub fn build_labels(
    display_name: &str,
    resource_name: &str,
    resource_kind: &str,
    environment_name: &str,
    cluster_id: &str,
    flavor: CredentialFlavor,
    custom_labels: &LabelSet,
) -> LabelSet {
    ResourceMetadata {
        display_name: display_name.to_string(),
        resource_name: resource_name.to_string(),
        resource_kind: resource_kind.to_string(),
        environment_name: environment_name.to_string(),
        cluster_id: cluster_id.to_string(),
        flavor,
        custom_labels: custom_labels.clone(),
    }
    .labels()
}

/// Read the cluster id from the process environment
pub fn cluster_id_from_env() -> String {
    normalize_cluster_id(std::env::var(CLUSTER_ID_ENV).ok().as_deref())
}

/// Absent or empty cluster ids become `"na"`
pub fn normalize_cluster_id(value: Option<&str>) -> String {
    match value {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => UNKNOWN_CLUSTER_ID.to_string(),
    }
}
