//! Credential resolution error types

use thiserror::Error;

/// Terminal errors raised while resolving the provider's AWS configuration
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error(
        "AWS configuration is required for AWS actions. Please add an 'aws' block to the provider configuration"
    )]
    MissingAwsConfig,

    #[error("AWS region is required. Please specify 'region' in the aws block")]
    MissingRegion,

    #[error(
        "AWS authentication is required. Please provide either (access_key + secret_key) or an assume_role block"
    )]
    MissingCredentials,

    #[error("an assume_role block is required for the chained-identity provider")]
    MissingAssumeRole,

    #[error(
        "inline credentials are not supported by the chained-identity provider; remove access_key/secret_key"
    )]
    InlineCredentialsNotSupported,

    #[error("role_arn is required in the assume_role block")]
    MissingRoleArn,

    #[error("invalid role_arn format: {0}. Expected format: arn:aws:iam::ACCOUNT_ID:role/ROLE_NAME")]
    InvalidRoleArn(String),

    #[error(
        "assume_role duration must be between 900 (15 minutes) and 43200 (12 hours), got: {0}"
    )]
    InvalidDuration(i64),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("failed to render bootstrap script: {0}")]
    Template(#[from] tera::Error),
}

pub type Result<T> = std::result::Result<T, ResolutionError>;
