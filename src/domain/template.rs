//! Run templates: shell snippets with parameter placeholders
//!
//! - `{name}` expands to the shell-quoted value(s) of a parameter
//! - `{--name}` expands to option form: `--name v` per value, `--name` for a set flag
//! - `{{` and `}}` are literal braces
//! - `${...}` and `{}` are left alone for the shell

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::command::{ArgValue, CommandSpec, Invocation};
use crate::domain::error::DomainError;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{[^}]*\}|\{\{|\}\}|\{(--)?([^{}\s]*)\}").expect("placeholder regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(String),
    Flag(String),
}

/// A parsed run template, checked against the command's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTemplate {
    command: String,
    segments: Vec<Segment>,
}

impl RunTemplate {
    /// Parse `source` and verify every placeholder names a parameter of `command`.
    pub fn parse(source: &str, command: &CommandSpec) -> Result<Self, DomainError> {
        let invalid = |reason: String| DomainError::InvalidTemplate {
            command: command.name.clone(),
            reason,
        };

        if source.trim().is_empty() {
            return Err(invalid("run must not be empty".to_string()));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            literal.push_str(&source[last..whole.start()]);
            last = whole.end();

            match whole.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                m if m.starts_with('$') => literal.push_str(m),
                _ => {
                    let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                    if name.is_empty() && caps.get(1).is_none() {
                        literal.push_str("{}");
                        continue;
                    }
                    if command.param(name).is_none() {
                        return Err(invalid(format!("unknown placeholder `{name}`")));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    if caps.get(1).is_some() {
                        segments.push(Segment::Flag(name.to_string()));
                    } else {
                        segments.push(Segment::Value(name.to_string()));
                    }
                }
            }
        }
        literal.push_str(&source[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            command: command.name.clone(),
            segments,
        })
    }

    /// Render the template with the values of one invocation.
    pub fn render(&self, invocation: &Invocation) -> Result<String, DomainError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value(name) => {
                    if let Some(value) = invocation.get(name) {
                        out.push_str(&self.quote_all(&value.tokens())?.join(" "));
                    }
                }
                Segment::Flag(name) => {
                    let parts = match invocation.get(name) {
                        Some(value) => self.option_form(name, value)?,
                        None => Vec::new(),
                    };
                    out.push_str(&parts.join(" "));
                }
            }
        }
        Ok(out)
    }

    fn option_form(&self, name: &str, value: &ArgValue) -> Result<Vec<String>, DomainError> {
        let flag = format!("--{name}");
        let parts = match value {
            ArgValue::Bool(true) => vec![flag],
            ArgValue::Bool(false) => Vec::new(),
            other => {
                let quoted = self.quote_all(&other.tokens())?;
                quoted
                    .into_iter()
                    .flat_map(|v| [flag.clone(), v])
                    .collect()
            }
        };
        Ok(parts)
    }

    fn quote_all(&self, tokens: &[String]) -> Result<Vec<String>, DomainError> {
        tokens
            .iter()
            .map(|t| {
                shlex::try_quote(t)
                    .map(|q| q.into_owned())
                    .map_err(|e| DomainError::CommandFailed {
                        command: self.command.clone(),
                        message: format!("cannot quote {t:?}: {e}"),
                    })
            })
            .collect()
    }
}
