//! CLI argument definitions using clap
//!
//! Only the root options live here. Namespaces and their commands are
//! discovered at runtime and mounted below this command.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser, ValueHint};

/// Discover task scripts below a project directory and run their commands
#[derive(Parser, Debug, Default)]
#[command(name = "rsinvoke")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "rsinvoke [OPTIONS] <NAMESPACE>... <COMMAND> [ARGS]...")]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Discovery root, overrides the configured one
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Only scan the top level of the discovery root
    #[arg(long)]
    pub no_recursive: bool,

    /// Print the discovered command tree
    #[arg(long)]
    pub list: bool,

    /// Print the effective settings as TOML
    #[arg(long)]
    pub show_config: bool,

    /// Print a commented settings template
    #[arg(long)]
    pub config_template: bool,

    /// Generate shell completions for the discovered commands
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completion: Option<clap_complete::Shell>,

    /// `--help` given before any namespace
    #[arg(skip)]
    pub help_requested: bool,

    /// `--version` given before any namespace
    #[arg(skip)]
    pub version_requested: bool,
}

impl Cli {
    /// Read the root options before any namespace is known.
    ///
    /// Everything from the first positional token on is left for the full
    /// command tree. If the root options themselves do not parse, defaults
    /// are returned and the full parse reports the error.
    pub fn bootstrap<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cmd = Self::command()
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(Arg::new("help").short('h').long("help").action(ArgAction::SetTrue))
            .arg(Arg::new("version").short('V').long("version").action(ArgAction::SetTrue))
            .allow_external_subcommands(true);

        let Ok(matches) = cmd.try_get_matches_from(argv) else {
            return Self::default();
        };
        let Ok(mut cli) = Self::from_arg_matches(&matches) else {
            return Self::default();
        };
        cli.help_requested = matches.get_flag("help");
        cli.version_requested = matches.get_flag("version");
        cli
    }
}
