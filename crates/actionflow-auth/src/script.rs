//! AWS credential bootstrap scripts
//!
//! Each [`AuthConfig`] shape maps to one bash template, rendered with Tera.
//! Every script writes its files under `/workspace/.aws/` and finishes with
//! `chmod 600`.
//!
//! Values are escaped for the position they land in: `shell_quote` for shell
//! words, `heredoc_escape` for unquoted heredoc bodies. Quoted heredocs take
//! values verbatim.

use crate::error::Result;
use crate::resolve::AuthConfig;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera, Value};
use tracing::debug;

pub const INLINE_TEMPLATE: &str = "inline.sh";
pub const STS_TEMPLATE: &str = "sts.sh";
pub const CHAINED_TEMPLATE: &str = "chained.sh";

/// Token file mounted by the EKS pod identity webhook
pub const WEB_IDENTITY_TOKEN_FILE: &str =
    "/var/run/secrets/eks.amazonaws.com/serviceaccount/token";

const INLINE_SCRIPT: &str = r#"#!/bin/bash
set -e

mkdir -p /workspace/.aws

cat > /workspace/.aws/credentials <<'EOFCREDS'
[default]
aws_access_key_id = {{ access_key }}
aws_secret_access_key = {{ secret_key }}
EOFCREDS

cat > /workspace/.aws/config <<'EOFCONFIG'
[default]
region = {{ region }}
EOFCONFIG

chmod 600 /workspace/.aws/credentials /workspace/.aws/config
echo "AWS credentials configured"
"#;

const STS_SCRIPT: &str = r#"#!/bin/bash
set -e

mkdir -p /workspace/.aws

ASSUME_ROLE_ARGS=(
    --role-arn {{ role_arn | shell_quote }}
    --role-session-name {{ session_name | shell_quote }}
    --duration-seconds {{ duration_seconds }}
    --region {{ region | shell_quote }}
    --output json
)
{% if external_id %}ASSUME_ROLE_ARGS+=(--external-id {{ external_id | shell_quote }})
{% endif %}
if ! RESPONSE=$(aws sts assume-role "${ASSUME_ROLE_ARGS[@]}"); then
    echo "ERROR: failed to assume role "{{ role_arn | shell_quote }} >&2
    exit 1
fi

AWS_ACCESS_KEY_ID=$(echo "$RESPONSE" | jq -r '.Credentials.AccessKeyId // empty')
AWS_SECRET_ACCESS_KEY=$(echo "$RESPONSE" | jq -r '.Credentials.SecretAccessKey // empty')
AWS_SESSION_TOKEN=$(echo "$RESPONSE" | jq -r '.Credentials.SessionToken // empty')

if [ -z "$AWS_ACCESS_KEY_ID" ] || [ -z "$AWS_SECRET_ACCESS_KEY" ] || [ -z "$AWS_SESSION_TOKEN" ]; then
    echo "ERROR: assume-role response did not contain temporary credentials" >&2
    exit 1
fi

cat > /workspace/.aws/credentials <<EOFCREDS
[default]
aws_access_key_id = ${AWS_ACCESS_KEY_ID}
aws_secret_access_key = ${AWS_SECRET_ACCESS_KEY}
aws_session_token = ${AWS_SESSION_TOKEN}
EOFCREDS

cat > /workspace/.aws/config <<'EOFCONFIG'
[default]
region = {{ region }}
EOFCONFIG

chmod 600 /workspace/.aws/credentials /workspace/.aws/config
echo "AWS credentials configured for "{{ role_arn | shell_quote }}
"#;

const CHAINED_SCRIPT: &str = r#"#!/bin/bash
set -e

mkdir -p /workspace/.aws

PARENT_ROLE_ARN="${AWS_ROLE_ARN}"
if [ -z "$PARENT_ROLE_ARN" ]; then
    echo "ERROR: AWS_ROLE_ARN environment variable not set. IRSA may not be configured." >&2
    exit 1
fi

cat > /workspace/.aws/config <<EOFCONFIG
[profile irsa]
web_identity_token_file = {{ token_file }}
role_arn = ${PARENT_ROLE_ARN}

[default]
source_profile = irsa
role_arn = {{ role_arn | heredoc_escape }}
role_session_name = {{ session_name | heredoc_escape }}
region = {{ region | heredoc_escape }}
{% if external_id %}external_id = {{ external_id | heredoc_escape }}
{% endif %}EOFCONFIG

chmod 600 /workspace/.aws/config
"#;

#[derive(Serialize)]
struct InlineContext<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct StsContext<'a> {
    role_arn: &'a str,
    session_name: &'a str,
    external_id: Option<&'a str>,
    duration_seconds: u32,
    region: &'a str,
}

#[derive(Serialize)]
struct ChainedContext<'a> {
    role_arn: &'a str,
    session_name: &'a str,
    external_id: Option<&'a str>,
    region: &'a str,
    token_file: &'a str,
}

/// Pick the template for an [`AuthConfig`] and build its context
pub fn script_context(auth: &AuthConfig) -> Result<(&'static str, Context)> {
    let pair = match auth {
        AuthConfig::InlineCredentials {
            access_key,
            secret_key,
            region,
        } => (
            INLINE_TEMPLATE,
            Context::from_serialize(InlineContext {
                access_key,
                secret_key,
                region,
            })?,
        ),
        AuthConfig::AssumeRoleSts {
            role_arn,
            session_name,
            external_id,
            duration_seconds,
            region,
        } => (
            STS_TEMPLATE,
            Context::from_serialize(StsContext {
                role_arn,
                session_name,
                external_id: external_id.as_deref(),
                duration_seconds: *duration_seconds,
                region,
            })?,
        ),
        AuthConfig::AssumeRoleChained {
            role_arn,
            session_name,
            external_id,
            region,
        } => (
            CHAINED_TEMPLATE,
            Context::from_serialize(ChainedContext {
                role_arn,
                session_name,
                external_id: external_id.as_deref(),
                region,
                token_file: WEB_IDENTITY_TOKEN_FILE,
            })?,
        ),
    };
    Ok(pair)
}

/// Renders bootstrap scripts from the built-in templates
pub struct ScriptRenderer {
    tera: Tera,
}

impl ScriptRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        // scripts are not HTML
        tera.autoescape_on(vec![]);
        tera.register_filter("shell_quote", shell_quote_filter);
        tera.register_filter("heredoc_escape", heredoc_escape_filter);
        tera.add_raw_templates(vec![
            (INLINE_TEMPLATE, INLINE_SCRIPT),
            (STS_TEMPLATE, STS_SCRIPT),
            (CHAINED_TEMPLATE, CHAINED_SCRIPT),
        ])?;
        Ok(Self { tera })
    }

    #[tracing::instrument(skip(self, auth), fields(mode = auth.mode()))]
    pub fn render(&self, auth: &AuthConfig) -> Result<String> {
        let (template, context) = script_context(auth)?;
        let script = self.tera.render(template, &context)?;
        debug!(template, bytes = script.len(), "rendered bootstrap script");
        Ok(script)
    }
}

/// Render the bootstrap script for a resolved configuration
pub fn render_bootstrap_script(auth: &AuthConfig) -> Result<String> {
    ScriptRenderer::new()?.render(auth)
}

/// Single-quote a value as one shell word
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escape characters the shell expands inside an unquoted heredoc
pub fn heredoc_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn shell_quote_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("shell_quote expects a string"))?;
    Ok(Value::String(shell_quote(s)))
}

fn heredoc_escape_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("heredoc_escape expects a string"))?;
    Ok(Value::String(heredoc_escape(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/target-role";

    fn sts(external_id: Option<&str>) -> AuthConfig {
        AuthConfig::AssumeRoleSts {
            role_arn: ROLE.into(),
            session_name: "terraform-provider-session".into(),
            external_id: external_id.map(String::from),
            duration_seconds: 1800,
            region: "us-east-1".into(),
        }
    }

    fn chained(external_id: Option<&str>) -> AuthConfig {
        AuthConfig::AssumeRoleChained {
            role_arn: ROLE.into(),
            session_name: "terraform-0011223344556677".into(),
            external_id: external_id.map(String::from),
            region: "eu-central-1".into(),
        }
    }

    #[test]
    fn test_context_selection() {
        let (name, ctx) = script_context(&sts(None)).unwrap();
        assert_eq!(name, STS_TEMPLATE);
        assert_eq!(ctx.get("duration_seconds"), Some(&Value::from(1800)));
        assert_eq!(ctx.get("external_id"), Some(&Value::Null));

        let (name, ctx) = script_context(&chained(Some("ext"))).unwrap();
        assert_eq!(name, CHAINED_TEMPLATE);
        assert_eq!(ctx.get("external_id"), Some(&Value::from("ext")));
        assert_eq!(ctx.get("token_file"), Some(&Value::from(WEB_IDENTITY_TOKEN_FILE)));
    }

    #[test]
    fn test_inline_script() {
        let auth = AuthConfig::InlineCredentials {
            access_key: "AKIAEXAMPLE".into(),
            secret_key: "s3cr3t/key".into(),
            region: "us-west-2".into(),
        };
        let script = render_bootstrap_script(&auth).unwrap();

        assert!(script.starts_with("#!/bin/bash\nset -e\n"));
        assert!(script.contains("aws_access_key_id = AKIAEXAMPLE\n"));
        assert!(script.contains("aws_secret_access_key = s3cr3t/key\n"));
        assert!(script.contains("region = us-west-2\n"));
        assert!(script.contains("chmod 600 /workspace/.aws/credentials /workspace/.aws/config"));
        assert!(!script.contains("sts assume-role"));
    }

    #[test]
    fn test_sts_script_calls_assume_role() {
        let script = render_bootstrap_script(&sts(None)).unwrap();

        assert!(script.contains(r#"aws sts assume-role "${ASSUME_ROLE_ARGS[@]}""#));
        assert!(script.contains(&format!("--role-arn '{}'", ROLE)));
        assert!(script.contains("--role-session-name 'terraform-provider-session'"));
        assert!(script.contains("--duration-seconds 1800"));
        assert!(script.contains(".Credentials.AccessKeyId"));
        assert!(script.contains(".Credentials.SecretAccessKey"));
        assert!(script.contains(".Credentials.SessionToken"));
        assert!(script.contains("aws_session_token = ${AWS_SESSION_TOKEN}"));
        assert!(!script.contains("--external-id"));
        assert!(script.contains("chmod 600"));
    }

    #[test]
    fn test_sts_script_external_id() {
        let script = render_bootstrap_script(&sts(Some("partner-123"))).unwrap();
        assert!(script.contains("ASSUME_ROLE_ARGS+=(--external-id 'partner-123')\n"));
    }

    #[test]
    fn test_chained_script_uses_source_profile() {
        let script = render_bootstrap_script(&chained(None)).unwrap();

        assert!(script.contains("[profile irsa]\n"));
        assert!(script.contains(&format!("web_identity_token_file = {}\n", WEB_IDENTITY_TOKEN_FILE)));
        assert!(script.contains("role_arn = ${PARENT_ROLE_ARN}\n"));
        assert!(script.contains("source_profile = irsa\n"));
        assert!(script.contains(&format!("role_arn = {}\n", ROLE)));
        assert!(script.contains("role_session_name = terraform-0011223344556677\n"));
        assert!(script.contains("region = eu-central-1\nEOFCONFIG\n"));
        assert!(!script.contains("external_id"));
        assert!(!script.contains("sts assume-role"));
        assert!(!script.contains("jq"));
        assert!(script.contains("chmod 600 /workspace/.aws/config"));
    }

    #[test]
    fn test_chained_script_external_id() {
        let script = render_bootstrap_script(&chained(Some("partner-123"))).unwrap();
        assert!(script.contains("region = eu-central-1\nexternal_id = partner-123\nEOFCONFIG\n"));
    }

    #[test]
    fn test_chained_escapes_heredoc_expansion() {
        let mut auth = chained(None);
        if let AuthConfig::AssumeRoleChained { session_name, .. } = &mut auth {
            *session_name = "sess-$(whoami)".into();
        }
        let script = render_bootstrap_script(&auth).unwrap();
        assert!(script.contains(r"role_session_name = sess-\$(whoami)"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_heredoc_escape() {
        assert_eq!(heredoc_escape("a$b`c\\d"), r"a\$b\`c\\d");
        assert_eq!(heredoc_escape("plain"), "plain");
    }
}
