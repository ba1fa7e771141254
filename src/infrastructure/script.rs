//! TOML script modules
//!
//! A script file exposes its sub-application under the top-level `[app]`
//! table. Files without it are not command modules and are skipped.
//!
//! ```toml
//! [app]
//! help = "Database maintenance"
//!
//! [app.commands.migrate]
//! help = "Apply pending migrations"
//! run = "migrate-tool up {--steps}"
//!
//! [[app.commands.migrate.params]]
//! name = "steps"
//! kind = "int"
//! default = 1
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{
    validate_commands, CommandSpec, DomainError, Invocation, LoadOutcome, ParamKind, ParamSpec,
    RunTemplate, SubApplication,
};
use crate::infrastructure::traits::{CommandRunner, FileSystem, ScriptLoader};

/// Well-known table a script module declares its sub-application in.
pub const APP_SYMBOL: &str = "app";

/// Prefix of the environment variables carrying parameter values.
pub const ARG_ENV_PREFIX: &str = "RSINVOKE_ARG_";

/// Shell used to run command bodies: `program args... <script>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppManifest {
    help: Option<String>,
    #[serde(default)]
    commands: BTreeMap<String, CommandManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandManifest {
    help: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    hidden: bool,
    run: String,
    #[serde(default)]
    params: Vec<ParamManifest>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum KindManifest {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Path,
}

impl From<KindManifest> for ParamKind {
    fn from(kind: KindManifest) -> Self {
        match kind {
            KindManifest::String => ParamKind::String,
            KindManifest::Int => ParamKind::Int,
            KindManifest::Float => ParamKind::Float,
            KindManifest::Bool => ParamKind::Bool,
            KindManifest::Path => ParamKind::Path,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamManifest {
    name: String,
    #[serde(default)]
    kind: KindManifest,
    help: Option<String>,
    #[serde(default)]
    required: bool,
    default: Option<toml::Value>,
    #[serde(default)]
    positional: bool,
    #[serde(default)]
    multiple: bool,
    short: Option<char>,
}

impl ParamManifest {
    fn into_spec(self, command: &str) -> Result<ParamSpec, DomainError> {
        let default = match self.default {
            None => None,
            Some(toml::Value::String(s)) => Some(s),
            Some(toml::Value::Integer(i)) => Some(i.to_string()),
            Some(toml::Value::Float(x)) => Some(x.to_string()),
            Some(toml::Value::Boolean(b)) => Some(b.to_string()),
            Some(other) => {
                return Err(DomainError::InvalidParam {
                    command: command.to_string(),
                    param: self.name,
                    reason: format!("unsupported default of type {}", other.type_str()),
                })
            }
        };
        Ok(ParamSpec {
            name: self.name,
            kind: self.kind.into(),
            help: self.help,
            required: self.required,
            default,
            positional: self.positional,
            multiple: self.multiple,
            short: self.short,
        })
    }
}

/// A sub-application declared by a TOML script file.
pub struct ScriptApp {
    location: PathBuf,
    help: Option<String>,
    commands: Vec<CommandSpec>,
    bodies: HashMap<String, RunTemplate>,
    shell: ShellConfig,
    runner: Arc<dyn CommandRunner>,
}

impl ScriptApp {
    fn from_manifest(
        location: &Path,
        manifest: AppManifest,
        shell: ShellConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, DomainError> {
        if manifest.commands.is_empty() {
            return Err(DomainError::Syntax(format!(
                "[{APP_SYMBOL}] declares no commands"
            )));
        }

        let mut commands = Vec::with_capacity(manifest.commands.len());
        let mut bodies = HashMap::new();
        for (name, cmd) in manifest.commands {
            let params = cmd
                .params
                .into_iter()
                .map(|p| p.into_spec(&name))
                .collect::<Result<Vec<_>, _>>()?;
            let spec = CommandSpec {
                name: name.clone(),
                help: cmd.help,
                aliases: cmd.aliases,
                hidden: cmd.hidden,
                params,
            };
            let body = RunTemplate::parse(&cmd.run, &spec)?;
            bodies.insert(name, body);
            commands.push(spec);
        }
        validate_commands(&commands)?;

        Ok(Self {
            location: location.to_path_buf(),
            help: manifest.help,
            commands,
            bodies,
            shell,
            runner,
        })
    }

    /// Environment exported to the command body.
    fn environment(&self, invocation: &Invocation) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = invocation
            .iter()
            .map(|(name, value)| {
                let key = format!(
                    "{ARG_ENV_PREFIX}{}",
                    name.to_uppercase().replace('-', "_")
                );
                (key, value.tokens().join("\n"))
            })
            .collect();
        env.push((
            "RSINVOKE_SCRIPT".to_string(),
            self.location.display().to_string(),
        ));
        if let Some(dir) = self.location.parent() {
            env.push(("RSINVOKE_SCRIPT_DIR".to_string(), dir.display().to_string()));
        }
        env
    }
}

impl SubApplication for ScriptApp {
    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    #[instrument(level = "debug", skip(self, invocation), fields(script = %self.location.display()))]
    fn invoke(&self, command: &str, invocation: &Invocation) -> Result<i32, DomainError> {
        let body = self
            .bodies
            .get(command)
            .ok_or_else(|| DomainError::UnknownCommand(command.to_string()))?;
        let script = body.render(invocation)?;
        debug!("invoke: {} {:?} -> {}", self.shell.program, self.shell.args, script);

        let mut args = self.shell.args.clone();
        args.push(script);
        self.runner
            .run(&self.shell.program, &args, &self.environment(invocation))
            .map_err(|e| DomainError::CommandFailed {
                command: command.to_string(),
                message: format!("{}: {e}", self.shell.program),
            })
    }
}

/// Loads TOML script modules.
pub struct TomlScriptLoader {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
    shell: ShellConfig,
}

impl TomlScriptLoader {
    pub fn new(fs: Arc<dyn FileSystem>, runner: Arc<dyn CommandRunner>, shell: ShellConfig) -> Self {
        Self { fs, runner, shell }
    }
}

impl ScriptLoader for TomlScriptLoader {
    fn load(&self, path: &Path) -> Result<LoadOutcome, DomainError> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| DomainError::Unreadable(e.to_string()))?;
        let mut table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| DomainError::Syntax(e.message().to_string()))?;

        let Some(app) = table.remove(APP_SYMBOL) else {
            return Ok(LoadOutcome::NoApp);
        };
        let manifest: AppManifest = app
            .try_into()
            .map_err(|e: toml::de::Error| DomainError::Syntax(format!("[{APP_SYMBOL}]: {}", e.message())))?;

        let app = ScriptApp::from_manifest(path, manifest, self.shell.clone(), self.runner.clone())?;
        debug!(
            "load: {} exposes {} commands",
            path.display(),
            app.commands().len()
        );
        Ok(LoadOutcome::Loaded(Box::new(app)))
    }
}
