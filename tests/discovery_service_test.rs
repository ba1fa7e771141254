//! Tests for DiscoveryService
//!
//! Script files below the root become namespaces named after their path:
//! - `tasks/db.toml` → `db`
//! - `tasks/cloud/aws.toml` → `cloud aws`
//! - broken files are recorded, files without `[app]` are skipped

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use rsinvoke::application::services::DiscoveryService;
use rsinvoke::application::ApplicationError;
use rsinvoke::domain::Namespace;
use rsinvoke::infrastructure::script::{ShellConfig, TomlScriptLoader};
use rsinvoke::infrastructure::traits::{RealCommandRunner, RealFileSystem};
use rsinvoke::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

const MODULE: &str = r#"
[app]
help = "Test module"

[app.commands.hello]
run = "echo hello"
"#;

fn service() -> DiscoveryService {
    let fs = Arc::new(RealFileSystem);
    let loader = TomlScriptLoader::new(fs.clone(), Arc::new(RealCommandRunner), ShellConfig::default());
    DiscoveryService::new(fs, Arc::new(loader))
}

fn write_script(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(&path, content).expect("write script");
    path
}

fn ns(text: &str) -> Namespace {
    text.parse().expect("valid namespace")
}

fn namespaces(root: &Path, recursive: bool) -> Vec<String> {
    service()
        .discover(root, recursive)
        .expect("discover")
        .namespaces()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn given_flat_root_when_discovering_then_one_namespace_per_file() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "docs.toml", MODULE);
    write_script(temp.path(), "lint.toml", MODULE);

    assert_eq!(namespaces(temp.path(), true), vec!["db", "docs", "lint"]);
}

#[test]
fn given_nested_dirs_when_discovering_recursively_then_nested_namespaces() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "cloud/aws.toml", MODULE);
    write_script(temp.path(), "cloud/gcp/compute.toml", MODULE);

    let registry = service().discover(temp.path(), true).unwrap();

    assert_eq!(registry.len(), 3);
    assert!(registry.get(&ns("cloud aws")).is_some());
    assert!(registry.get(&ns("cloud gcp compute")).is_some());
    let entry = registry.get(&ns("db")).unwrap();
    assert_eq!(entry.location, temp.path().join("db.toml"));
    assert_eq!(entry.app.help(), Some("Test module"));
}

#[test]
fn given_nested_dirs_when_not_recursive_then_only_top_level() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "cloud/aws.toml", MODULE);

    assert_eq!(namespaces(temp.path(), false), vec!["db"]);
}

#[test]
fn given_file_without_app_when_discovering_then_skipped_silently() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "notes.toml", "[notes]\ntext = \"plain data\"\n");

    let registry = service().discover(temp.path(), true).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.failures().is_empty());
}

#[test]
fn given_broken_file_when_discovering_then_recorded_and_siblings_load() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    let broken = write_script(temp.path(), "deploy.toml", "[app\nrun = ");
    write_script(temp.path(), "lint.toml", MODULE);

    let registry = service().discover(temp.path(), true).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.failures().len(), 1);
    let failure = &registry.failures()[0];
    assert_eq!(failure.path, broken);
    assert_eq!(failure.namespace, Some(ns("deploy")));
}

#[test]
fn given_invalid_command_declaration_when_discovering_then_recorded() {
    let temp = TempDir::new().unwrap();
    write_script(
        temp.path(),
        "db.toml",
        "[app.commands.migrate]\nrun = \"migrate {missing}\"\n",
    );

    let registry = service().discover(temp.path(), true).unwrap();

    assert!(registry.is_empty());
    assert_eq!(registry.failures().len(), 1);
}

#[test]
fn given_two_files_with_same_namespace_when_discovering_then_configuration_error() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "db.task", MODULE);

    let result = service()
        .with_extensions(vec!["toml".into(), "task".into()])
        .discover(temp.path(), true);

    match result {
        Err(ApplicationError::Configuration { message, paths }) => {
            assert!(message.contains("db"), "message: {message}");
            assert_eq!(paths.len(), 2);
        }
        Err(other) => panic!("expected configuration error, got {other}"),
        Ok(_) => panic!("expected configuration error"),
    }
}

#[test]
fn given_command_named_like_nested_group_when_discovering_then_configuration_error() {
    let temp = TempDir::new().unwrap();
    write_script(
        temp.path(),
        "cloud.toml",
        "[app.commands.aws]\nrun = \"echo aws\"\n",
    );
    write_script(temp.path(), "cloud/aws.toml", MODULE);

    let result = service().discover(temp.path(), true);

    assert!(matches!(result, Err(ApplicationError::Configuration { .. })));
}

#[test]
fn given_app_next_to_same_named_dir_when_discovering_then_both_mounted() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "cloud.toml", MODULE);
    write_script(temp.path(), "cloud/aws.toml", MODULE);

    assert_eq!(namespaces(temp.path(), true), vec!["cloud", "cloud aws"]);
}

#[test]
fn given_missing_root_when_discovering_then_configuration_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    let result = service().discover(&missing, true);

    assert!(matches!(result, Err(ApplicationError::Configuration { .. })));
}

#[test]
fn given_empty_root_when_discovering_then_empty_registry() {
    let temp = TempDir::new().unwrap();

    let registry = service().discover(temp.path(), true).unwrap();

    assert!(registry.is_empty());
    assert!(registry.failures().is_empty());
}

#[test]
fn given_hidden_and_excluded_entries_when_discovering_then_ignored() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), ".secret.toml", MODULE);
    write_script(temp.path(), ".cache/tool.toml", MODULE);
    write_script(temp.path(), "fixtures/sample.toml", MODULE);
    write_script(temp.path(), "skip.toml", MODULE);

    let registry = service()
        .with_exclude(vec!["fixtures".into(), "skip.toml".into()])
        .discover(temp.path(), true)
        .unwrap();

    let found: Vec<String> = registry.namespaces().map(ToString::to_string).collect();
    assert_eq!(found, vec!["db"]);
}

#[test]
fn given_other_extensions_when_discovering_then_only_matching_files() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "README.md", "# tasks\n");
    write_script(temp.path(), "upper.TOML", MODULE);

    assert_eq!(namespaces(temp.path(), true), vec!["db", "upper"]);
}

#[test]
fn given_unchanged_tree_when_discovering_twice_then_same_registry() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "db.toml", MODULE);
    write_script(temp.path(), "cloud/aws.toml", MODULE);
    write_script(temp.path(), "broken.toml", "[app");

    let first = service().discover(temp.path(), true).unwrap();
    let second = service().discover(temp.path(), true).unwrap();

    let names = |r: &rsinvoke::domain::Registry| -> Vec<String> {
        r.namespaces().map(ToString::to_string).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.failures(), second.failures());
}
