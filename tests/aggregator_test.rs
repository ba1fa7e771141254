//! Tests for the aggregated root command
//!
//! In-process sub-applications record their invocations so dispatch can be
//! checked without spawning processes.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::error::ErrorKind;
use rstest::rstest;

use rsinvoke::application::services::{build_root, command_tree};
use rsinvoke::application::DispatchError;
use rsinvoke::domain::{
    ArgValue, CommandSpec, DiscoveryError, DomainError, Invocation, Namespace, ParamKind,
    ParamSpec, Registry, SubApplication,
};
use rsinvoke::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

type Calls = Rc<RefCell<Vec<(String, Invocation)>>>;

struct RecordingApp {
    commands: Vec<CommandSpec>,
    calls: Calls,
    status: i32,
}

impl SubApplication for RecordingApp {
    fn help(&self) -> Option<&str> {
        Some("Recording app")
    }

    fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    fn invoke(&self, command: &str, invocation: &Invocation) -> Result<i32, DomainError> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), invocation.clone()));
        Ok(self.status)
    }
}

struct FailingApp;

impl SubApplication for FailingApp {
    fn commands(&self) -> &[CommandSpec] {
        static COMMANDS: std::sync::OnceLock<Vec<CommandSpec>> = std::sync::OnceLock::new();
        COMMANDS.get_or_init(|| vec![CommandSpec::new("boom")])
    }

    fn invoke(&self, command: &str, _invocation: &Invocation) -> Result<i32, DomainError> {
        Err(DomainError::CommandFailed {
            command: command.to_string(),
            message: "no such program".to_string(),
        })
    }
}

fn ns(text: &str) -> Namespace {
    text.parse().expect("valid namespace")
}

fn param(name: &str, kind: ParamKind) -> ParamSpec {
    ParamSpec::new(name, kind)
}

fn baz_command() -> CommandSpec {
    let mut tags = param("tag", ParamKind::String);
    tags.multiple = true;
    let mut target = param("target", ParamKind::Path);
    target.positional = true;
    let mut level = param("level", ParamKind::Float);
    level.default = Some("0.5".into());
    let mut verbose = param("verbose", ParamKind::Bool);
    verbose.short = Some('v');

    CommandSpec::new("baz")
        .with_help("Do the baz thing")
        .with_param(param("x", ParamKind::Int))
        .with_param(tags)
        .with_param(target)
        .with_param(level)
        .with_param(verbose)
}

fn registry_with(namespace: &str, commands: Vec<CommandSpec>, status: i32) -> (Registry, Calls) {
    let calls: Calls = Rc::default();
    let mut registry = Registry::new();
    registry
        .insert(
            ns(namespace),
            PathBuf::from(format!("tasks/{}.toml", namespace.replace(' ', "/"))),
            Box::new(RecordingApp {
                commands,
                calls: calls.clone(),
                status,
            }),
        )
        .expect("insert");
    (registry, calls)
}

#[test]
fn given_nested_namespace_when_dispatching_then_typed_values_reach_command() {
    let (registry, calls) = registry_with("foo bar", vec![baz_command()], 0);
    let root = build_root(registry);

    let code = root
        .dispatch([
            "rsinvoke", "foo", "bar", "baz", "--x", "1", "--tag", "a", "--tag", "b", "-v", "out",
        ])
        .expect("dispatch");

    assert_eq!(code, 0);
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    let (command, inv) = &calls[0];
    assert_eq!(command, "baz");
    assert_eq!(inv.get("x"), Some(&ArgValue::Int(1)));
    assert_eq!(
        inv.get("tag"),
        Some(&ArgValue::List(vec![
            ArgValue::Str("a".into()),
            ArgValue::Str("b".into())
        ]))
    );
    assert_eq!(inv.get("target"), Some(&ArgValue::Path(PathBuf::from("out"))));
    assert_eq!(inv.get("level"), Some(&ArgValue::Float(0.5)));
    assert_eq!(inv.get("verbose"), Some(&ArgValue::Bool(true)));
}

#[test]
fn given_optional_params_omitted_when_dispatching_then_absent_or_false() {
    let (registry, calls) = registry_with("foo bar", vec![baz_command()], 0);
    let root = build_root(registry);

    root.dispatch(["rsinvoke", "foo", "bar", "baz"])
        .expect("dispatch");

    let calls = calls.borrow();
    let (_, inv) = &calls[0];
    assert_eq!(inv.get("x"), None);
    assert_eq!(inv.get("tag"), None);
    assert_eq!(inv.get("verbose"), Some(&ArgValue::Bool(false)));
}

#[test]
fn given_help_on_group_when_dispatching_then_lists_commands_and_runs_nothing() {
    let (registry, calls) = registry_with("foo bar", vec![baz_command()], 0);
    let root = build_root(registry);

    let err = root
        .dispatch(["rsinvoke", "foo", "bar", "--help"])
        .expect_err("help is reported through clap");

    let DispatchError::Usage(e) = &err else {
        panic!("expected usage error, got {err}");
    };
    assert_eq!(e.kind(), ErrorKind::DisplayHelp);
    assert_eq!(err.exit_code(), 0);
    let rendered = e.render().to_string();
    assert!(rendered.contains("baz"), "help output: {rendered}");
    assert!(rendered.contains("Do the baz thing"), "help output: {rendered}");
    assert!(calls.borrow().is_empty());
}

#[rstest]
#[case::unknown_namespace(&["rsinvoke", "nope", "baz"])]
#[case::unknown_command(&["rsinvoke", "foo", "bar", "qux"])]
#[case::group_without_command(&["rsinvoke", "foo", "bar"])]
#[case::bad_int(&["rsinvoke", "foo", "bar", "baz", "--x", "one"])]
#[case::unknown_option(&["rsinvoke", "foo", "bar", "baz", "--nope"])]
fn given_invalid_command_line_when_dispatching_then_usage_error_and_nothing_runs(
    #[case] argv: &[&str],
) {
    let (registry, calls) = registry_with("foo bar", vec![baz_command()], 0);
    let root = build_root(registry);

    let err = root.dispatch(argv.iter().copied()).expect_err("usage error");

    assert!(matches!(err, DispatchError::Usage(_)), "got {err}");
    assert_ne!(err.exit_code(), 0);
    assert!(calls.borrow().is_empty());
}

#[test]
fn given_alias_when_dispatching_then_runs_canonical_command() {
    let mut spec = CommandSpec::new("migrate");
    spec.aliases = vec!["mig".into()];
    let (registry, calls) = registry_with("db", vec![spec], 0);
    let root = build_root(registry);

    root.dispatch(["rsinvoke", "db", "mig"]).expect("dispatch");

    assert_eq!(calls.borrow()[0].0, "migrate");
}

#[test]
fn given_nonzero_status_when_running_then_exit_code_propagates() {
    let (registry, _calls) = registry_with("db", vec![CommandSpec::new("migrate")], 3);
    let root = build_root(registry);

    let err = root
        .dispatch(["rsinvoke", "db", "migrate"])
        .expect_err("command failed");
    assert!(matches!(err, DispatchError::CommandExited { code: 3, .. }));

    assert_eq!(root.run(["rsinvoke", "db", "migrate"]), 3);
}

#[test]
fn given_launch_failure_when_running_then_software_exit_code() {
    let mut registry = Registry::new();
    registry
        .insert(ns("ops"), "tasks/ops.toml", Box::new(FailingApp))
        .unwrap();
    let root = build_root(registry);

    let err = root
        .dispatch(["rsinvoke", "ops", "boom"])
        .expect_err("launch failure");
    assert!(matches!(err, DispatchError::Launch { .. }));

    assert_eq!(root.run(["rsinvoke", "ops", "boom"]), 70);
}

#[test]
fn given_broken_namespace_when_dispatching_then_broken_error_with_cause() {
    let (mut registry, calls) = registry_with("db", vec![CommandSpec::new("migrate")], 0);
    registry
        .record_failure(DiscoveryError::new(
            "tasks/deploy.toml",
            Some(ns("deploy")),
            "syntax error: expected `]`",
        ))
        .unwrap();
    let root = build_root(registry);

    let err = root
        .dispatch(["rsinvoke", "deploy", "ship", "--fast"])
        .expect_err("broken namespace");

    match &err {
        DispatchError::Broken { namespace, cause } => {
            assert_eq!(namespace, "deploy");
            assert!(cause.message.contains("expected"));
        }
        other => panic!("expected broken namespace, got {other}"),
    }
    assert_eq!(err.exit_code(), 70);
    assert!(calls.borrow().is_empty());

    // healthy siblings keep working
    assert_eq!(root.run(["rsinvoke", "db", "migrate"]), 0);
}

#[test]
fn given_app_and_nested_group_with_same_prefix_when_dispatching_then_both_reachable() {
    let calls: Calls = Rc::default();
    let mut registry = Registry::new();
    for (namespace, command) in [("cloud", "status"), ("cloud aws", "deploy")] {
        registry
            .insert(
                ns(namespace),
                format!("tasks/{namespace}.toml"),
                Box::new(RecordingApp {
                    commands: vec![CommandSpec::new(command)],
                    calls: calls.clone(),
                    status: 0,
                }),
            )
            .unwrap();
    }
    let root = build_root(registry);

    root.dispatch(["rsinvoke", "cloud", "status"]).unwrap();
    root.dispatch(["rsinvoke", "cloud", "aws", "deploy"]).unwrap();

    let names: Vec<String> = calls.borrow().iter().map(|(c, _)| c.clone()).collect();
    assert_eq!(names, vec!["status", "deploy"]);
}

#[test]
fn given_hidden_command_when_listing_then_omitted_but_still_dispatchable() {
    let mut hidden = CommandSpec::new("internal").with_help("Not for humans");
    hidden.hidden = true;
    let mut visible = CommandSpec::new("migrate").with_help("Apply migrations\nLong text.");
    visible.aliases = vec!["mig".into()];
    let (mut registry, calls) = registry_with("db", vec![visible, hidden], 0);
    registry
        .record_failure(DiscoveryError::new(
            "tasks/deploy.toml",
            Some(ns("deploy")),
            "bad",
        ))
        .unwrap();
    let root = build_root(registry);

    let listing = command_tree(&root).to_string();

    assert!(listing.contains("db - Recording app"), "listing: {listing}");
    assert!(listing.contains("migrate (mig) - Apply migrations"), "listing: {listing}");
    assert!(!listing.contains("Long text."), "listing: {listing}");
    assert!(!listing.contains("internal"), "listing: {listing}");
    assert!(listing.contains("deploy [failed to load: bad]"), "listing: {listing}");

    root.dispatch(["rsinvoke", "db", "internal"]).unwrap();
    assert_eq!(calls.borrow()[0].0, "internal");
}

#[test]
fn given_empty_registry_when_running_without_args_then_help_and_nonzero_usage() {
    let root = build_root(Registry::new());

    let err = root.dispatch(["rsinvoke"]).expect_err("no command given");

    let DispatchError::Usage(e) = &err else {
        panic!("expected usage error, got {err}");
    };
    assert_eq!(
        e.kind(),
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    );
}

#[test]
fn given_broken_script_when_help_is_shown_then_warning_reported() {
    let (mut registry, _calls) = registry_with("db", vec![CommandSpec::new("migrate")], 0);
    registry
        .record_failure(DiscoveryError::new(
            "tasks/deploy.toml",
            Some(ns("deploy")),
            "expected `]`",
        ))
        .unwrap();
    let root = build_root(registry);

    let mut diag = Vec::new();
    let code = root.run_reporting_to(["rsinvoke", "--help"], &mut diag);

    assert_eq!(code, 0);
    let diag = String::from_utf8(diag).unwrap();
    assert!(diag.contains("failed to load"), "diagnostics: {diag}");
    assert!(diag.contains("tasks/deploy.toml"), "diagnostics: {diag}");
    assert!(diag.contains("expected `]`"), "diagnostics: {diag}");
}

#[test]
fn given_broken_script_when_running_healthy_command_then_no_warning() {
    let (mut registry, calls) = registry_with("db", vec![CommandSpec::new("migrate")], 0);
    registry
        .record_failure(DiscoveryError::new(
            "tasks/deploy.toml",
            Some(ns("deploy")),
            "expected `]`",
        ))
        .unwrap();
    let root = build_root(registry);

    let mut diag = Vec::new();
    let code = root.run_reporting_to(["rsinvoke", "db", "migrate"], &mut diag);

    assert_eq!(code, 0);
    assert!(diag.is_empty(), "diagnostics: {}", String::from_utf8_lossy(&diag));
    assert_eq!(calls.borrow().len(), 1);
}
