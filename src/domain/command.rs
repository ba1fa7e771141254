//! Command declarations: commands, typed parameters and the values clap produced

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::domain::error::DomainError;
use crate::domain::namespace::validate_token;

/// Parameter names clap reserves on every command.
const RESERVED_PARAMS: &[&str] = &["help"];
const RESERVED_SHORTS: &[char] = &['h'];

/// Value type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamKind {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Path,
}

impl ParamKind {
    /// Check that `raw` parses as a value of this kind.
    pub fn check(&self, raw: &str) -> Result<(), String> {
        match self {
            ParamKind::String | ParamKind::Path => Ok(()),
            ParamKind::Int => raw
                .parse::<i64>()
                .map(|_| ())
                .map_err(|e| format!("{raw:?} is not an integer: {e}")),
            ParamKind::Float => raw
                .parse::<f64>()
                .map(|_| ())
                .map_err(|e| format!("{raw:?} is not a number: {e}")),
            ParamKind::Bool => raw
                .parse::<bool>()
                .map(|_| ())
                .map_err(|e| format!("{raw:?} is not a boolean: {e}")),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::String => "string",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::Path => "path",
        };
        f.write_str(name)
    }
}

/// A typed parameter of a command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub help: Option<String>,
    pub required: bool,
    /// Default value in its textual form, parsed by clap like user input
    pub default: Option<String>,
    /// Positional argument instead of `--name` option
    pub positional: bool,
    /// Accept the parameter more than once
    pub multiple: bool,
    pub short: Option<char>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }
}

/// A named command exposed by a sub-application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandSpec {
    pub name: String,
    pub help: Option<String>,
    pub aliases: Vec<String>,
    pub hidden: bool,
    pub params: Vec<ParamSpec>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Names this command answers to: its name followed by its aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Validate the declaration so it can be mounted without clap rejecting it.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_token(&self.name).map_err(|e| self.invalid(e.to_string()))?;
        for alias in &self.aliases {
            validate_token(alias).map_err(|e| self.invalid(format!("alias: {e}")))?;
        }

        let mut names = HashSet::new();
        let mut shorts = HashSet::new();
        let mut optional_positional_seen = false;
        let positionals: Vec<&ParamSpec> = self.params.iter().filter(|p| p.positional).collect();

        for param in &self.params {
            let bad = |reason: String| DomainError::InvalidParam {
                command: self.name.clone(),
                param: param.name.clone(),
                reason,
            };

            validate_token(&param.name).map_err(|e| bad(e.to_string()))?;
            if RESERVED_PARAMS.contains(&param.name.as_str()) {
                return Err(bad("name is reserved".to_string()));
            }
            if !names.insert(param.name.as_str()) {
                return Err(bad("declared twice".to_string()));
            }
            if let Some(short) = param.short {
                if param.positional {
                    return Err(bad("positional parameters cannot have a short flag".to_string()));
                }
                if !short.is_ascii_alphanumeric() || RESERVED_SHORTS.contains(&short) {
                    return Err(bad(format!("short flag '{short}' is not allowed")));
                }
                if !shorts.insert(short) {
                    return Err(bad(format!("short flag '{short}' used twice")));
                }
            }
            if param.kind == ParamKind::Bool {
                if param.positional || param.required || param.multiple {
                    return Err(bad(
                        "bool parameters are flags: not positional, required or multiple"
                            .to_string(),
                    ));
                }
                if param.default.is_some() {
                    return Err(bad("bool flags cannot have a default".to_string()));
                }
            }
            if let Some(default) = &param.default {
                param.kind.check(default).map_err(|e| bad(format!("default: {e}")))?;
            }
        }

        for (idx, param) in positionals.iter().enumerate() {
            let bad = |reason: &str| DomainError::InvalidParam {
                command: self.name.clone(),
                param: param.name.clone(),
                reason: reason.to_string(),
            };
            if param.multiple && idx + 1 != positionals.len() {
                return Err(bad("only the last positional parameter may be multiple"));
            }
            if param.required && optional_positional_seen {
                return Err(bad("required positional follows an optional one"));
            }
            if !param.required {
                optional_positional_seen = true;
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> DomainError {
        DomainError::InvalidCommand {
            command: self.name.clone(),
            reason,
        }
    }
}

/// Validate a full command set: each command plus name/alias uniqueness.
pub fn validate_commands(commands: &[CommandSpec]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for command in commands {
        command.validate()?;
        for name in command.names() {
            if !seen.insert(name) {
                return Err(DomainError::InvalidCommand {
                    command: command.name.clone(),
                    reason: format!("name `{name}` is used twice"),
                });
            }
        }
    }
    Ok(())
}

/// A typed value produced by parsing one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Path(PathBuf),
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Flatten to the textual tokens passed on to a command body.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            ArgValue::List(values) => values.iter().flat_map(ArgValue::tokens).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => f.write_str(s),
            ArgValue::Int(i) => write!(f, "{i}"),
            ArgValue::Float(x) => write!(f, "{x}"),
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Path(p) => write!(f, "{}", p.display()),
            ArgValue::List(values) => {
                let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(" "))
            }
        }
    }
}

/// Parsed values of one command invocation, keyed by parameter name.
///
/// Optional parameters the user did not give (and that have no default)
/// are absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    values: BTreeMap<String, ArgValue>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
