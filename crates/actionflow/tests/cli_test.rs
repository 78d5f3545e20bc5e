#![allow(deprecated)] // TODO: migrate Command::cargo_bin to cargo_bin_cmd!

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const ACTION: &str = r#"
display_name: restart
resource_name: my-app
environment_name: prod
resource_kind: service
namespace: actions
steps:
  - name: restart
    image: bitnami/kubectl
    script: kubectl rollout restart deployment/my-app
"#;

const KUBERNETES_CONFIG: &str = "flavor: kubernetes\n";

const AWS_CONFIG: &str = r#"
flavor: aws
variant: dual-mode
aws:
  region: us-east-1
  assume_role:
    role_arn: arn:aws:iam::123456789012:role/deployer
    duration: 1800
"#;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

/// Top-level help lists the lifecycle commands
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tekton actions"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_update_help() {
    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("update")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<FILE>"))
        .stdout(predicate::str::contains("--id"));
}

#[test]
fn test_validate_action() {
    let temp_dir = tempfile::tempdir().unwrap();
    let action = write(temp_dir.path(), "action.yaml", ACTION);

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("validate")
        .arg(&action)
        .assert()
        .success()
        .stdout(predicate::str::contains("948ce4313702ddbacb27f5aabdf4fe82"))
        .stdout(predicate::str::contains(
            "setup-credentials-948ce4313702ddbacb27f5aabdf4fe82",
        ));
}

#[test]
fn test_validate_rejects_empty_steps() {
    let temp_dir = tempfile::tempdir().unwrap();
    let content = ACTION.split("steps:").next().unwrap().to_string() + "steps: []\n";
    let action = write(temp_dir.path(), "action.yaml", &content);

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("validate").arg(&action).assert().failure();
}

#[test]
fn test_render_kubernetes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let action = write(temp_dir.path(), "action.yaml", ACTION);
    let config = write(temp_dir.path(), "actionflow.yaml", KUBERNETES_CONFIG);

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("render")
        .arg(&action)
        .arg("--config")
        .arg(&config)
        .arg("--cluster-id")
        .arg("cluster-1")
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: StepAction"))
        .stdout(predicate::str::contains("kind: Task"))
        .stdout(predicate::str::contains("USER_KUBECONFIG"))
        .stdout(predicate::str::contains("cluster_id: cluster-1"));
}

#[test]
fn test_render_aws_sts_json() {
    let temp_dir = tempfile::tempdir().unwrap();
    let action = write(temp_dir.path(), "action.yaml", ACTION);
    let config = write(temp_dir.path(), "actionflow.yaml", AWS_CONFIG);

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("render")
        .arg(&action)
        .args(["--config", &config, "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("aws sts assume-role"))
        .stdout(predicate::str::contains("--duration-seconds 1800"))
        .stdout(predicate::str::contains("AWS_SHARED_CREDENTIALS_FILE"));
}

#[test]
fn test_render_rejects_bad_duration() {
    let temp_dir = tempfile::tempdir().unwrap();
    let action = write(temp_dir.path(), "action.yaml", ACTION);
    let config = write(
        temp_dir.path(),
        "actionflow.yaml",
        &AWS_CONFIG.replace("1800", "899"),
    );

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("render")
        .arg(&action)
        .args(["--config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("899"));
}

#[test]
fn test_list_empty() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("list")
        .arg("--project-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No managed actions"));
}

#[test]
fn test_status_unknown_id() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("status")
        .arg("actions/unknown")
        .arg("--project-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not managed"));
}

#[test]
fn test_import_refuses_managed_action() {
    let temp_dir = tempfile::tempdir().unwrap();
    let id = "actions/948ce4313702ddbacb27f5aabdf4fe82";
    let state = serde_json::json!({
        "version": 1,
        "updated_at": "2026-01-01T00:00:00Z",
        "actions": {
            id: {
                "id": id,
                "namespace": "actions",
                "identity": {
                    "task_id": "948ce4313702ddbacb27f5aabdf4fe82",
                    "credential_setup_id": "setup-credentials-948ce4313702ddbacb27f5aabdf4fe82"
                },
                "display_name": "restart",
                "resource_name": "my-app",
                "environment_name": "prod",
                "resource_kind": "service",
                "flavor": "kubernetes",
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z"
            }
        }
    });
    fs::create_dir_all(temp_dir.path().join(".actionflow")).unwrap();
    write(
        &temp_dir.path().join(".actionflow"),
        "state.json",
        &state.to_string(),
    );

    let mut cmd = Command::cargo_bin("actionflow").unwrap();
    cmd.arg("import")
        .arg(id)
        .arg("--project-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already managed"))
        .stderr(predicate::str::contains("--force"));

    // lock released on the way out
    assert!(!temp_dir.path().join(".actionflow/lock.json").exists());
}
