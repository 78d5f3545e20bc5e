//! Input validation for action specs
//!
//! Rejects malformed input before any identity or object is derived from it.

use crate::error::{CoreError, Result};
use crate::identity::{MAX_NAME_LEN, ResourceIdentity};
use crate::metadata::LabelSet;
use crate::model::ActionSpec;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of names and display names
pub const MAX_FIELD_LEN: usize = 253;

static NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("valid regex"));

/// Validate a declarative action
pub fn validate_spec(spec: &ActionSpec) -> Result<()> {
    check_len("display_name", &spec.display_name)?;
    check_len("resource_name", &spec.resource_name)?;
    check_len("environment_name", &spec.environment_name)?;

    if spec.resource_kind.is_empty() {
        return Err(CoreError::validation("resource_kind", "must not be empty"));
    }

    if let Some(namespace) = spec.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        validate_namespace(namespace)?;
    }

    if spec.steps.is_empty() {
        return Err(CoreError::validation("steps", "at least one step is required"));
    }

    for (i, step) in spec.steps.iter().enumerate() {
        check_len(&format!("steps[{}].name", i), &step.name)?;
        for (j, env) in step.env.iter().enumerate() {
            if !ENV_NAME_RE.is_match(&env.name) {
                return Err(CoreError::validation(
                    format!("steps[{}].env[{}].name", i, j),
                    format!(
                        "'{}' must be uppercase letters, digits and underscores, not starting with a digit",
                        env.name
                    ),
                ));
            }
        }
    }

    for (i, param) in spec.params.iter().enumerate() {
        check_len(&format!("params[{}].name", i), &param.name)?;
    }

    Ok(())
}

/// Validate a Kubernetes namespace name
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.len() > MAX_NAME_LEN || !NAMESPACE_RE.is_match(namespace) {
        return Err(CoreError::validation(
            "namespace",
            format!(
                "'{}' must be a valid Kubernetes namespace name (lowercase alphanumeric and hyphens, at most {} chars)",
                namespace, MAX_NAME_LEN
            ),
        ));
    }
    Ok(())
}

/// Sanity check on generated names
pub fn validate_identity(identity: &ResourceIdentity) -> Result<()> {
    for (field, name) in [
        ("task_id", &identity.task_id),
        ("credential_setup_id", &identity.credential_setup_id),
    ] {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(CoreError::validation(
                field,
                format!("generated name '{}' is not a valid object name", name),
            ));
        }
    }
    Ok(())
}

/// Labels must have non-empty keys
pub fn validate_labels(labels: &LabelSet) -> Result<()> {
    if labels.keys().any(|k| k.is_empty()) {
        return Err(CoreError::validation("labels", "label keys must not be empty"));
    }
    Ok(())
}

fn check_len(field: &str, value: &str) -> Result<()> {
    let len = value.chars().count();
    if len == 0 || len > MAX_FIELD_LEN {
        return Err(CoreError::validation(
            field,
            format!("length must be between 1 and {}, got {}", MAX_FIELD_LEN, len),
        ));
    }
    Ok(())
}
