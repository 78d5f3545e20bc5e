//! Deterministic object names
//!
//! Task and StepAction names are derived from
//! `(resource_name, environment_name, display_name)` so the same action
//! always maps to the same objects. Kubernetes object names are limited to
//! 63 characters; when a name is too long the trailing part (the hash) is kept.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Maximum length of a generated object name
pub const MAX_NAME_LEN: usize = 63;

/// Prefix of the credential setup StepAction name
pub const CREDENTIAL_SETUP_PREFIX: &str = "setup-credentials-";

/// Names of the two objects backing one action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub task_id: String,
    pub credential_setup_id: String,
}

/// Generate the identity for an action.
///
/// Collisions are only guarded against by the 128-bit digest.
pub fn generate_identity(
    resource_name: &str,
    environment_name: &str,
    display_name: &str,
) -> ResourceIdentity {
    let input = format!("{}-{}-{}", resource_name, environment_name, display_name);
    let hash = hex::encode(Md5::digest(input.as_bytes()));

    ResourceIdentity {
        credential_setup_id: credential_setup_id_for(&hash),
        task_id: clamp_name(&hash).to_string(),
    }
}

/// StepAction name for an existing task id
pub fn credential_setup_id_for(task_id: &str) -> String {
    let name = format!("{}{}", CREDENTIAL_SETUP_PREFIX, task_id);
    clamp_name(&name).to_string()
}

/// Keep the last [`MAX_NAME_LEN`] characters of `name`
fn clamp_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut start = name.len() - MAX_NAME_LEN;
    while !name.is_char_boundary(start) {
        start += 1;
    }
    &name[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn test_identity_for_known_input() {
        let id = generate_identity("my-app", "prod", "restart");
        assert_eq!(id.task_id.len(), 32);
        assert!(is_lower_hex(&id.task_id));
        assert_eq!(
            id.credential_setup_id,
            format!("setup-credentials-{}", id.task_id)
        );
    }

    #[test]
    fn test_identity_matches_md5_of_joined_input() {
        let id = generate_identity("a", "b", "c");
        let expected = hex::encode(Md5::digest(b"a-b-c"));
        assert_eq!(id.task_id, expected);
    }

    #[test]
    fn test_identity_is_deterministic() {
        let long = "x".repeat(253);
        let inputs = [
            ("my-app", "prod", "restart"),
            ("", "", ""),
            ("db", "staging", "backup now"),
            (long.as_str(), "y", "z"),
        ];
        for (r, e, d) in inputs {
            assert_eq!(generate_identity(r, e, d), generate_identity(r, e, d));
        }
    }

    #[test]
    fn test_different_inputs_differ() {
        let a = generate_identity("my-app", "prod", "restart");
        let b = generate_identity("my-app", "dev", "restart");
        assert_ne!(a.task_id, b.task_id);
    }

    #[test]
    fn test_names_within_limit() {
        let long = "n".repeat(253);
        let id = generate_identity(&long, &long, &long);
        assert!(id.task_id.len() <= MAX_NAME_LEN);
        assert!(id.credential_setup_id.len() <= MAX_NAME_LEN);
    }

    #[test]
    fn test_clamp_keeps_suffix() {
        // 18 + 50 = 68 chars, so the leading "setup" is dropped
        let hash = "0123456789abcdef0123456789abcdef0123456789abcdef01";
        let name = credential_setup_id_for(hash);
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert!(name.ends_with(hash));
        assert_eq!(name, format!("-credentials-{}", hash));
    }

    #[test]
    fn test_credential_setup_id_for_task_id() {
        let id = generate_identity("my-app", "prod", "restart");
        assert_eq!(credential_setup_id_for(&id.task_id), id.credential_setup_id);
    }
}
