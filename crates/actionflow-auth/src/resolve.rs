//! Credential resolution
//!
//! Turns the operator's [`AwsProviderConfig`] into exactly one [`AuthConfig`]
//! shape. Resolution happens once per process; the result is passed around
//! explicitly.

use crate::config::{AssumeRoleBlock, AwsProviderConfig, ProviderVariant, non_empty};
use crate::error::{ResolutionError, Result};
use crate::session::{DEFAULT_SESSION_NAME, random_session_name};
use tracing::{debug, warn};

pub const MIN_DURATION_SECONDS: i64 = 900;
pub const MAX_DURATION_SECONDS: i64 = 43_200;
pub const DEFAULT_DURATION_SECONDS: i64 = 3_600;

const ROLE_ARN_PREFIX: &str = "arn:aws:iam::";
const ROLE_ARN_MIN_LEN: usize = 20;

/// Resolved authentication strategy
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// Static keys written into the credentials file
    InlineCredentials {
        access_key: String,
        secret_key: String,
        region: String,
    },
    /// Workload identity chained to the target role; the parent role ARN is
    /// read from `AWS_ROLE_ARN` when the script runs
    AssumeRoleChained {
        role_arn: String,
        session_name: String,
        external_id: Option<String>,
        region: String,
    },
    /// Explicit `sts assume-role` call when the script runs
    AssumeRoleSts {
        role_arn: String,
        session_name: String,
        external_id: Option<String>,
        duration_seconds: u32,
        region: String,
    },
}

impl AuthConfig {
    pub fn region(&self) -> &str {
        match self {
            AuthConfig::InlineCredentials { region, .. }
            | AuthConfig::AssumeRoleChained { region, .. }
            | AuthConfig::AssumeRoleSts { region, .. } => region,
        }
    }

    /// Short name of the strategy, for logs
    pub fn mode(&self) -> &'static str {
        match self {
            AuthConfig::InlineCredentials { .. } => "inline",
            AuthConfig::AssumeRoleChained { .. } => "assume-role-chained",
            AuthConfig::AssumeRoleSts { .. } => "assume-role-sts",
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::InlineCredentials { region, .. } => f
                .debug_struct("InlineCredentials")
                .field("access_key", &"<redacted>")
                .field("secret_key", &"<redacted>")
                .field("region", region)
                .finish(),
            AuthConfig::AssumeRoleChained {
                role_arn,
                session_name,
                external_id,
                region,
            } => f
                .debug_struct("AssumeRoleChained")
                .field("role_arn", role_arn)
                .field("session_name", session_name)
                .field("external_id", external_id)
                .field("region", region)
                .finish(),
            AuthConfig::AssumeRoleSts {
                role_arn,
                session_name,
                external_id,
                duration_seconds,
                region,
            } => f
                .debug_struct("AssumeRoleSts")
                .field("role_arn", role_arn)
                .field("session_name", session_name)
                .field("external_id", external_id)
                .field("duration_seconds", duration_seconds)
                .field("region", region)
                .finish(),
        }
    }
}

/// Resolve the provider configuration under the given variant's rules
pub fn resolve(variant: ProviderVariant, config: Option<&AwsProviderConfig>) -> Result<AuthConfig> {
    let config = config.ok_or(ResolutionError::MissingAwsConfig)?;
    let region = non_empty(&config.region)
        .ok_or(ResolutionError::MissingRegion)?
        .to_string();
    check_single_line("region", &region)?;

    let auth = match variant {
        ProviderVariant::DualMode => resolve_dual_mode(config, region)?,
        ProviderVariant::ChainedIdentity => resolve_chained(config, region)?,
    };

    debug!(%variant, mode = auth.mode(), region = auth.region(), "resolved AWS credentials");
    Ok(auth)
}

fn resolve_dual_mode(config: &AwsProviderConfig, region: String) -> Result<AuthConfig> {
    // inline keys win over assume_role unconditionally
    if config.has_inline_credentials() {
        if config.assume_role.is_some() {
            debug!("inline credentials present, ignoring assume_role block");
        }
        let access_key = non_empty(&config.access_key).unwrap_or_default().to_string();
        let secret_key = non_empty(&config.secret_key).unwrap_or_default().to_string();
        check_single_line("access_key", &access_key)?;
        check_single_line("secret_key", &secret_key)?;
        return Ok(AuthConfig::InlineCredentials {
            access_key,
            secret_key,
            region,
        });
    }

    let assume_role = config
        .assume_role
        .as_ref()
        .ok_or(ResolutionError::MissingCredentials)?;

    let role_arn = validate_role_arn(assume_role)?;
    let session_name = non_empty(&assume_role.session_name)
        .unwrap_or(DEFAULT_SESSION_NAME)
        .to_string();
    let external_id = external_id(assume_role)?;
    let duration_seconds = validate_duration(assume_role.duration)?;
    check_single_line("session_name", &session_name)?;

    Ok(AuthConfig::AssumeRoleSts {
        role_arn,
        session_name,
        external_id,
        duration_seconds,
        region,
    })
}

fn resolve_chained(config: &AwsProviderConfig, region: String) -> Result<AuthConfig> {
    if config.has_any_inline_material() {
        return Err(ResolutionError::InlineCredentialsNotSupported);
    }

    let assume_role = config
        .assume_role
        .as_ref()
        .ok_or(ResolutionError::MissingAssumeRole)?;

    let role_arn = validate_role_arn(assume_role)?;
    let session_name = match non_empty(&assume_role.session_name) {
        Some(name) => name.to_string(),
        None => random_session_name(),
    };
    let external_id = external_id(assume_role)?;
    check_single_line("session_name", &session_name)?;

    if assume_role.duration.is_some() {
        warn!("assume_role.duration is ignored by the chained-identity provider");
    }

    Ok(AuthConfig::AssumeRoleChained {
        role_arn,
        session_name,
        external_id,
        region,
    })
}

fn validate_role_arn(assume_role: &AssumeRoleBlock) -> Result<String> {
    let role_arn = non_empty(&assume_role.role_arn).ok_or(ResolutionError::MissingRoleArn)?;
    if role_arn.len() < ROLE_ARN_MIN_LEN || !role_arn.starts_with(ROLE_ARN_PREFIX) {
        return Err(ResolutionError::InvalidRoleArn(role_arn.to_string()));
    }
    check_single_line("role_arn", role_arn)?;
    Ok(role_arn.to_string())
}

/// Duration defaults to one hour and must lie in `[900, 43200]`
pub fn validate_duration(duration: Option<i64>) -> Result<u32> {
    let duration = duration.unwrap_or(DEFAULT_DURATION_SECONDS);
    if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration) {
        return Err(ResolutionError::InvalidDuration(duration));
    }
    u32::try_from(duration).map_err(|_| ResolutionError::InvalidDuration(duration))
}

fn external_id(assume_role: &AssumeRoleBlock) -> Result<Option<String>> {
    match non_empty(&assume_role.external_id) {
        Some(id) => {
            check_single_line("external_id", id)?;
            Ok(Some(id.to_string()))
        }
        None => Ok(None),
    }
}

// Values end up inside config files written by heredocs.
fn check_single_line(field: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(ResolutionError::InvalidValue {
            field: field.to_string(),
            reason: "must be a single line".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/target-role";

    fn assume_role(duration: Option<i64>) -> AssumeRoleBlock {
        AssumeRoleBlock {
            role_arn: Some(ROLE.into()),
            session_name: None,
            external_id: None,
            duration,
        }
    }

    fn config(inline: bool, role: Option<AssumeRoleBlock>) -> AwsProviderConfig {
        AwsProviderConfig {
            region: Some("us-west-2".into()),
            access_key: inline.then(|| "AKIAEXAMPLE".to_string()),
            secret_key: inline.then(|| "secret".to_string()),
            assume_role: role,
        }
    }

    #[test]
    fn test_missing_config() {
        let err = resolve(ProviderVariant::DualMode, None).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingAwsConfig));
    }

    #[test]
    fn test_missing_region() {
        let mut c = config(true, None);
        c.region = Some(String::new());
        let err = resolve(ProviderVariant::DualMode, Some(&c)).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingRegion));
    }

    #[test]
    fn test_inline_only() {
        let auth = resolve(ProviderVariant::DualMode, Some(&config(true, None))).unwrap();
        assert_eq!(
            auth,
            AuthConfig::InlineCredentials {
                access_key: "AKIAEXAMPLE".into(),
                secret_key: "secret".into(),
                region: "us-west-2".into(),
            }
        );
    }

    #[test]
    fn test_inline_wins_over_assume_role() {
        let c = config(true, Some(assume_role(Some(1))));
        let auth = resolve(ProviderVariant::DualMode, Some(&c)).unwrap();
        assert!(matches!(auth, AuthConfig::InlineCredentials { .. }));
    }

    #[test]
    fn test_neither_inline_nor_assume_role() {
        let err = resolve(ProviderVariant::DualMode, Some(&config(false, None))).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingCredentials));
    }

    #[test]
    fn test_assume_role_defaults() {
        let c = config(false, Some(assume_role(None)));
        let auth = resolve(ProviderVariant::DualMode, Some(&c)).unwrap();
        assert_eq!(
            auth,
            AuthConfig::AssumeRoleSts {
                role_arn: ROLE.into(),
                session_name: DEFAULT_SESSION_NAME.into(),
                external_id: None,
                duration_seconds: 3600,
                region: "us-west-2".into(),
            }
        );
    }

    #[test]
    fn test_duration_boundaries() {
        for ok in [900, 43_200] {
            let c = config(false, Some(assume_role(Some(ok))));
            let auth = resolve(ProviderVariant::DualMode, Some(&c)).unwrap();
            assert!(matches!(
                auth,
                AuthConfig::AssumeRoleSts { duration_seconds, .. } if i64::from(duration_seconds) == ok
            ));
        }
        for bad in [899, 43_201] {
            let c = config(false, Some(assume_role(Some(bad))));
            let err = resolve(ProviderVariant::DualMode, Some(&c)).unwrap_err();
            assert!(matches!(err, ResolutionError::InvalidDuration(d) if d == bad));
        }
    }

    #[test]
    fn test_malformed_role_arn() {
        for bad in ["arn:aws:s3:::bucket/role/abc", "arn:aws:iam::1", "role/admin"] {
            let mut role = assume_role(None);
            role.role_arn = Some(bad.into());
            let c = config(false, Some(role));
            let err = resolve(ProviderVariant::DualMode, Some(&c)).unwrap_err();
            assert!(matches!(err, ResolutionError::InvalidRoleArn(_)), "{}", bad);
        }
    }

    #[test]
    fn test_missing_role_arn() {
        let mut role = assume_role(None);
        role.role_arn = None;
        let c = config(false, Some(role));
        let err = resolve(ProviderVariant::DualMode, Some(&c)).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingRoleArn));
    }

    #[test]
    fn test_empty_external_id_is_omitted() {
        let mut role = assume_role(None);
        role.external_id = Some(String::new());
        let c = config(false, Some(role));
        let auth = resolve(ProviderVariant::DualMode, Some(&c)).unwrap();
        assert!(matches!(auth, AuthConfig::AssumeRoleSts { external_id: None, .. }));
    }

    #[test]
    fn test_chained_requires_assume_role() {
        let err = resolve(ProviderVariant::ChainedIdentity, Some(&config(false, None))).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingAssumeRole));
    }

    #[test]
    fn test_chained_rejects_inline_credentials() {
        let c = config(true, Some(assume_role(None)));
        let err = resolve(ProviderVariant::ChainedIdentity, Some(&c)).unwrap_err();
        assert!(matches!(err, ResolutionError::InlineCredentialsNotSupported));
    }

    #[test]
    fn test_chained_random_session_name() {
        let c = config(false, Some(assume_role(None)));
        let auth = resolve(ProviderVariant::ChainedIdentity, Some(&c)).unwrap();
        match auth {
            AuthConfig::AssumeRoleChained { session_name, .. } => {
                assert!(session_name.starts_with("terraform-"));
                assert_ne!(session_name, DEFAULT_SESSION_NAME);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_chained_keeps_configured_session_name() {
        let mut role = assume_role(None);
        role.session_name = Some("audit-me".into());
        role.external_id = Some("ext-1".into());
        let c = config(false, Some(role));
        let auth = resolve(ProviderVariant::ChainedIdentity, Some(&c)).unwrap();
        assert_eq!(
            auth,
            AuthConfig::AssumeRoleChained {
                role_arn: ROLE.into(),
                session_name: "audit-me".into(),
                external_id: Some("ext-1".into()),
                region: "us-west-2".into(),
            }
        );
    }

    #[test]
    fn test_multiline_values_rejected() {
        let mut role = assume_role(None);
        role.external_id = Some("a\nb".into());
        let c = config(false, Some(role));
        let err = resolve(ProviderVariant::DualMode, Some(&c)).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidValue { .. }));
    }

    #[test]
    fn test_debug_redacts_inline_secret() {
        let auth = resolve(ProviderVariant::DualMode, Some(&config(true, None))).unwrap();
        assert!(!format!("{:?}", auth).contains("secret\""));
    }
}
