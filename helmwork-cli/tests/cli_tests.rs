use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use predicates::str::contains;

const PROJECT: &str = r#"
charts:
  foo:
    version: 1.0.0
releases:
  myapp:
    chart: foo
    purge: true
tasks:
  deployAll: [helmInstallMyapp]
"#;

fn project_dir(yaml: &str) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    dir.child("helmwork.yaml").write_str(yaml).unwrap();
    dir.child("charts/foo/Chart.yaml")
        .write_str("name: foo\nversion: 1.0.0\n")
        .unwrap();
    dir
}

fn helmwork(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("helmwork"));
    cmd.current_dir(dir.path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn tasks_lists_conventional_names() {
    let dir = project_dir(PROJECT);
    helmwork(&dir)
        .arg("tasks")
        .assert()
        .success()
        .stdout(contains("helmLintFooChart"))
        .stdout(contains("helmUpdateFooChartDependencies"))
        .stdout(contains("helmDeleteMyapp"))
        .stdout(contains("deployAll"));
}

#[test]
fn tasks_json_is_parseable() {
    let dir = project_dir(PROJECT);
    let output = helmwork(&dir).args(["tasks", "--json"]).output().unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|row| row["task"].as_str())
        .collect();
    assert!(names.contains(&"helmPackageFooChart"));
    assert!(names.contains(&"helmInstallMyapp"));
}

#[test]
fn plan_orders_predecessors_first() {
    let dir = project_dir(PROJECT);
    let output = helmwork(&dir)
        .args(["plan", "deployAll", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let order: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|row| row["task"].as_str())
        .collect();
    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert!(position("helmLintFooChart") < position("helmPackageFooChart"));
    assert!(position("helmPackageFooChart") < position("helmInstallMyapp"));
    assert_eq!(order.last(), Some(&"deployAll"));
}

#[test]
fn dry_run_prints_invocations_in_order() {
    let dir = project_dir(PROJECT);
    helmwork(&dir)
        .args(["run", "helmDeleteMyapp", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("[dry-run] helm init --client-only"))
        .stdout(contains("[dry-run] helm delete --purge myapp"))
        .stdout(contains("2 succeeded"));
}

#[test]
fn dry_run_with_project_flag_from_elsewhere() {
    let dir = project_dir(PROJECT);
    let elsewhere = TempDir::new().unwrap();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("helmwork"));
    cmd.current_dir(elsewhere.path())
        .env("NO_COLOR", "1")
        .arg("--project")
        .arg(dir.child("helmwork.yaml").path())
        .args(["run", "helmLintFooChart", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("[dry-run] helm lint"));
    dir.child("build/helm/charts/foo/Chart.yaml")
        .assert(predicate::path::exists());
}

#[test]
fn unknown_task_fails() {
    let dir = project_dir(PROJECT);
    helmwork(&dir)
        .args(["run", "helmLintNothingChart"])
        .assert()
        .failure()
        .stderr(contains("unknown task `helmLintNothingChart`"));
}

#[test]
fn missing_project_file_fails() {
    let dir = TempDir::new().unwrap();
    helmwork(&dir)
        .arg("tasks")
        .assert()
        .failure()
        .stderr(contains("project file not found"));
}

#[test]
fn alias_shadowing_a_library_task_is_rejected() {
    let dir = project_dir("tasks:\n  helmLintAllChart: [helmLintFooChart]\n");
    helmwork(&dir)
        .arg("tasks")
        .assert()
        .failure()
        .stderr(contains("helmLintAllChart"));
}

#[test]
fn failing_helm_aborts_the_run() {
    let yaml = format!("helm:\n  executable: helmwork-no-such-helm\n{PROJECT}");
    let dir = project_dir(&yaml);
    helmwork(&dir)
        .args(["run", "helmDeleteMyapp"])
        .assert()
        .failure()
        .stdout(contains("NOT RUN"))
        .stderr(contains("helmInitServer"));
}
