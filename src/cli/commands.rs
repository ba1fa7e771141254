//! Command execution: settings, discovery and dispatch for one process run

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{build_root_with, command_tree, RootApplication};
use crate::application::{ApplicationError, ApplicationResult};
use crate::cli::args::Cli;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::Registry;
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::{display_relative, resolve_against};

/// Run one invocation of the tool and return the process exit code.
///
/// `argv` is the full command line including the program name.
#[instrument(level = "debug", skip_all)]
pub fn execute(cli: &Cli, argv: Vec<OsString>) -> CliResult<i32> {
    if cli.config_template {
        output::info(&Settings::template());
        return Ok(exitcode::OK);
    }
    if cli.version_requested {
        output::info(Cli::command().render_version().trim_end());
        return Ok(exitcode::OK);
    }

    let start = start_dir(cli)?;
    let mut settings = Settings::load(&start)?;
    apply_overrides(cli, &start, &mut settings)?;
    debug!("execute: settings={:?}", settings);

    if cli.show_config {
        return cmd_show_config(&settings);
    }

    let container = ServiceContainer::new(settings);
    let root = match discover(&container) {
        Ok(root) => root,
        // root help stays available when the scripts cannot be scanned
        Err(e) if cli.help_requested => {
            output::warning(&e);
            build_root_with(Cli::command(), Registry::new())
        }
        Err(e) => return Err(e.into()),
    };

    if cli.list {
        return Ok(cmd_list(&root, &container.settings));
    }
    if let Some(shell) = cli.completion {
        let mut cmd = root.command().clone();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(exitcode::OK);
    }

    Ok(root.run(argv))
}

fn start_dir(cli: &Cli) -> CliResult<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| InfraError::io("determine current directory", e))?;
    let Some(dir) = &cli.project_dir else {
        return Ok(cwd);
    };
    let dir = resolve_against(&cwd, &dir.to_string_lossy())
        .map_err(|e| ApplicationError::config(format!("expand project dir: {e}")))?;
    if !dir.is_dir() {
        return Err(CliError::Usage(format!(
            "project directory does not exist: {}",
            dir.display()
        )));
    }
    Ok(dir)
}

/// Command line overrides, the last configuration layer.
fn apply_overrides(cli: &Cli, start: &Path, settings: &mut Settings) -> ApplicationResult<()> {
    if let Some(root) = &cli.root {
        settings.root = resolve_against(start, &root.to_string_lossy())
            .map_err(|e| ApplicationError::config(format!("expand root: {e}")))?;
    }
    if cli.no_recursive {
        settings.recursive = false;
    }
    Ok(())
}

/// Scan the configured root and mount the results under the root options.
pub fn discover(container: &ServiceContainer) -> ApplicationResult<RootApplication> {
    let settings = &container.settings;
    let registry = container
        .discovery_service()
        .discover(&settings.root, settings.recursive)?;
    Ok(build_root_with(Cli::command(), registry))
}

fn cmd_show_config(settings: &Settings) -> CliResult<i32> {
    output::header("# Effective settings");
    match &settings.project_config {
        Some(path) => output::info(&format!("# project config: {}", path.display())),
        None => output::info("# project config: none"),
    }
    output::info(&settings.to_toml()?);
    Ok(exitcode::OK)
}

fn cmd_list(root: &RootApplication, settings: &Settings) -> i32 {
    output::info(&command_tree(root));
    for failure in root.registry().failures() {
        output::warning(&format!(
            "failed to load {}: {}",
            display_relative(&failure.path, &settings.root),
            failure.message
        ));
    }
    exitcode::OK
}
