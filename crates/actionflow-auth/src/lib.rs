//! actionflow-auth
//!
//! Resolves the operator's AWS configuration into a single authentication
//! strategy and renders the bash script that materializes it inside the
//! credential StepAction.
//!
//! ```text
//! AwsProviderConfig ──resolve(variant)──▶ AuthConfig ──render──▶ script
//!                                          ├─ InlineCredentials   (files from keys)
//!                                          ├─ AssumeRoleSts       (aws sts assume-role)
//!                                          └─ AssumeRoleChained   (source_profile = irsa)
//! ```

pub mod config;
pub mod error;
pub mod resolve;
pub mod script;
pub mod session;

pub use config::{AssumeRoleBlock, AwsProviderConfig, ProviderVariant};
pub use error::{ResolutionError, Result};
pub use resolve::{AuthConfig, resolve};
pub use script::{ScriptRenderer, render_bootstrap_script};
pub use session::{DEFAULT_SESSION_NAME, random_session_name};

use actionflow_core::CredentialBootstrap;

/// Resolve and render in one go, producing the AWS [`CredentialBootstrap`]
pub fn aws_bootstrap(auth: &AuthConfig) -> Result<CredentialBootstrap> {
    let script = render_bootstrap_script(auth)?;
    Ok(CredentialBootstrap::aws(script))
}
