//! Aggregator: mounts the registry into one clap command tree and dispatches
//!
//! Parsing, help and usage errors are clap's; this module only decides
//! where each sub-application lives and which handle runs.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::builder::ValueParser;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use tracing::{debug, instrument};

use crate::application::DispatchError;
use crate::domain::{
    ArgValue, CommandSpec, DiscoveryError, Invocation, Namespace, ParamKind, ParamSpec, Registry,
};

/// Program name used when no base command is given.
pub const DEFAULT_BIN_NAME: &str = "rsinvoke";

/// One group in the mounted tree.
#[derive(Debug, Default)]
pub(crate) struct MountNode {
    /// Sub-application mounted at exactly this path
    pub(crate) app: Option<Namespace>,
    /// Index into the registry's failures if a broken script owns this path
    pub(crate) broken: Option<usize>,
    pub(crate) children: BTreeMap<String, MountNode>,
}

impl MountNode {
    fn child_mut(&mut self, segment: &str) -> &mut MountNode {
        self.children.entry(segment.to_string()).or_default()
    }
}

/// The root command with every sub-application mounted under its namespace.
pub struct RootApplication {
    command: Command,
    pub(crate) tree: MountNode,
    pub(crate) registry: Registry,
}

/// Mount `registry` under a bare root command.
pub fn build_root(registry: Registry) -> RootApplication {
    build_root_with(Command::new(DEFAULT_BIN_NAME), registry)
}

/// Mount `registry` under `base`, keeping the base command's own arguments.
pub fn build_root_with(base: Command, registry: Registry) -> RootApplication {
    let mut tree = MountNode::default();
    for namespace in registry.namespaces() {
        let mut node = &mut tree;
        for segment in namespace.segments() {
            node = node.child_mut(segment);
        }
        node.app = Some(namespace.clone());
    }
    for (idx, failure) in registry.failures().iter().enumerate() {
        let Some(namespace) = &failure.namespace else {
            continue;
        };
        let mut node = &mut tree;
        for segment in namespace.segments() {
            node = node.child_mut(segment);
        }
        node.broken = Some(idx);
    }

    let mut command = base
        .subcommand_required(true)
        .arg_required_else_help(true)
        .disable_help_subcommand(true);
    for (segment, child) in &tree.children {
        command = command.subcommand(group_command(segment, child, &registry));
    }

    debug!(
        "build_root: mounted {} namespaces under `{}`",
        registry.len(),
        command.get_name()
    );
    RootApplication {
        command,
        tree,
        registry,
    }
}

fn group_command(segment: &str, node: &MountNode, registry: &Registry) -> Command {
    let mut cmd = Command::new(segment.to_string()).disable_help_subcommand(true);

    if let Some(entry) = node.app.as_ref().and_then(|ns| registry.get(ns)) {
        if let Some(help) = entry.app.help() {
            cmd = cmd.about(help.to_string());
        }
        for spec in entry.app.commands() {
            cmd = cmd.subcommand(leaf_command(spec));
        }
    }
    for (child_segment, child) in &node.children {
        cmd = cmd.subcommand(group_command(child_segment, child, registry));
    }

    match node.broken.and_then(|idx| registry.failures().get(idx)) {
        Some(failure) => cmd
            .about(format!("[failed to load: {}]", failure.message))
            .allow_external_subcommands(true),
        None => cmd.subcommand_required(true).arg_required_else_help(true),
    }
}

fn leaf_command(spec: &CommandSpec) -> Command {
    let mut cmd = Command::new(spec.name.clone())
        .hide(spec.hidden)
        .disable_help_subcommand(true);
    if let Some(help) = &spec.help {
        cmd = cmd.about(help.clone());
    }
    for alias in &spec.aliases {
        cmd = cmd.visible_alias(alias.clone());
    }
    for param in &spec.params {
        cmd = cmd.arg(param_arg(param));
    }
    cmd
}

fn param_arg(param: &ParamSpec) -> Arg {
    let mut arg = Arg::new(param.name.clone());
    if let Some(help) = &param.help {
        arg = arg.help(help.clone());
    }
    if !param.positional {
        arg = arg.long(param.name.clone());
        if let Some(short) = param.short {
            arg = arg.short(short);
        }
    }

    if param.kind == ParamKind::Bool {
        return arg.action(ArgAction::SetTrue);
    }

    arg = arg
        .value_parser(kind_parser(param.kind))
        .required(param.required);
    arg = match (param.multiple, param.positional) {
        (true, true) => arg.num_args(1..).action(ArgAction::Append),
        (true, false) => arg.action(ArgAction::Append),
        (false, _) => arg.action(ArgAction::Set),
    };
    if let Some(default) = &param.default {
        arg = arg.default_value(default.clone());
    }
    arg
}

fn kind_parser(kind: ParamKind) -> ValueParser {
    match kind {
        ParamKind::Int => value_parser!(i64).into(),
        ParamKind::Float => value_parser!(f64).into(),
        ParamKind::Path => ValueParser::path_buf(),
        ParamKind::String | ParamKind::Bool => ValueParser::string(),
    }
}

/// Collect the typed values clap produced for `spec`.
fn invocation_from(spec: &CommandSpec, matches: &ArgMatches) -> Invocation {
    let mut invocation = Invocation::new();
    for param in &spec.params {
        let id = param.name.as_str();
        let value = match param.kind {
            ParamKind::Bool => Some(ArgValue::Bool(matches.get_flag(id))),
            ParamKind::String => collect(matches, id, param.multiple, ArgValue::Str),
            ParamKind::Int => collect(matches, id, param.multiple, ArgValue::Int),
            ParamKind::Float => collect(matches, id, param.multiple, ArgValue::Float),
            ParamKind::Path => collect::<PathBuf>(matches, id, param.multiple, ArgValue::Path),
        };
        if let Some(value) = value {
            invocation.insert(param.name.clone(), value);
        }
    }
    invocation
}

fn collect<T>(
    matches: &ArgMatches,
    id: &str,
    multiple: bool,
    wrap: fn(T) -> ArgValue,
) -> Option<ArgValue>
where
    T: Clone + Send + Sync + 'static,
{
    let values: Vec<ArgValue> = matches.get_many::<T>(id)?.cloned().map(wrap).collect();
    if multiple {
        Some(ArgValue::List(values))
    } else {
        values.into_iter().next()
    }
}

/// Where a parsed command path ends up.
enum Target<'a> {
    Command {
        namespace: &'a Namespace,
        spec: &'a CommandSpec,
        matches: &'a ArgMatches,
    },
    Broken {
        path: String,
        failure: &'a DiscoveryError,
    },
}

impl RootApplication {
    /// The mounted clap command, e.g. for completion generation.
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse `argv` and run the selected command.
    ///
    /// Returns the command's exit status. Help display and usage errors come
    /// back as `DispatchError::Usage` carrying clap's rendered message.
    #[instrument(level = "debug", skip_all)]
    pub fn dispatch<I, T>(&self, argv: I) -> Result<i32, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().try_get_matches_from(argv)?;

        match self.resolve(&matches)? {
            Target::Command {
                namespace,
                spec,
                matches,
            } => {
                let entry = self
                    .registry
                    .get(namespace)
                    .ok_or_else(|| DispatchError::Unresolved(namespace.to_string()))?;
                let invocation = invocation_from(spec, matches);
                let label = format!("{namespace} {}", spec.name);
                debug!("dispatch: `{}` with {} values", label, invocation.len());

                let code = entry
                    .app
                    .invoke(&spec.name, &invocation)
                    .map_err(|source| DispatchError::Launch {
                        command: label.clone(),
                        source,
                    })?;
                if code == 0 {
                    Ok(0)
                } else {
                    Err(DispatchError::CommandExited {
                        command: label,
                        code,
                    })
                }
            }
            Target::Broken { path, failure } => Err(DispatchError::Broken {
                namespace: path,
                cause: failure.clone(),
            }),
        }
    }

    /// Parse `argv`, run the selected command and report to the terminal.
    ///
    /// Returns the process exit code.
    pub fn run<I, T>(&self, argv: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.run_reporting_to(argv, &mut io::stderr())
    }

    /// Like [`run`](Self::run), with diagnostics written to `diag`.
    ///
    /// Help text still goes where clap sends it.
    pub fn run_reporting_to<I, T, W>(&self, argv: I, diag: &mut W) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        W: Write,
    {
        match self.dispatch(argv) {
            Ok(code) => code,
            Err(DispatchError::Usage(e)) => {
                if matches!(
                    e.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    let _ = self.warn_broken(diag);
                }
                let _ = e.print();
                e.exit_code()
            }
            Err(e) => {
                let _ = writeln!(diag, "{}: {}", "error".red().bold(), e);
                e.exit_code()
            }
        }
    }

    /// Write one warning per script that failed to load.
    pub fn warn_broken<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for failure in self.registry.failures() {
            writeln!(out, "{}: failed to load {}", "Warning".yellow(), failure)?;
        }
        Ok(())
    }

    fn resolve<'a>(&'a self, root: &'a ArgMatches) -> Result<Target<'a>, DispatchError> {
        let mut node = &self.tree;
        let mut matches = root;
        let mut path: Vec<&str> = Vec::new();

        while let Some((name, sub)) = matches.subcommand() {
            if let Some(child) = node.children.get(name) {
                path.push(name);
                node = child;
                matches = sub;
                continue;
            }
            let mounted = node
                .app
                .as_ref()
                .and_then(|ns| self.registry.get(ns).map(|entry| (ns, entry)));
            if let Some((namespace, entry)) = mounted {
                if let Some(spec) = entry.app.commands().iter().find(|c| c.name == name) {
                    return Ok(Target::Command {
                        namespace,
                        spec,
                        matches: sub,
                    });
                }
            }
            break;
        }

        match node.broken.and_then(|idx| self.registry.failures().get(idx)) {
            Some(failure) => Ok(Target::Broken {
                path: path.join(" "),
                failure,
            }),
            None => Err(DispatchError::Unresolved(path.join(" "))),
        }
    }
}
