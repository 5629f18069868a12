//! Shell command actions for configured command trees

use std::collections::HashMap;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use anstyle::{AnsiColor, Reset, Style};
use log::debug;
use serde_json::Value;
use thiserror::Error;

use cmdtree::Invocation;

const ARROW_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Cyan)));

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("`{command}` failed with exit code {code}")]
    Failed { command: String, code: i32 },
    #[error("`{0}` was terminated by a signal")]
    Killed(String),
    #[error("Unable to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Cancelled before running `{0}`")]
    Cancelled(String),
    #[error("Unable to write to output: {0}")]
    Output(#[from] io::Error),
}

/// Runs a command template through `sh -c`.
///
/// Before running, the template is expanded:
///
/// - `{args}`: the positional arguments, shell quoted
/// - `{field}`: the nearest option named `field`
/// - `{owner:field}`: the option `field` of the command named `owner`
///
/// Option values are shell quoted; options that are not found expand to
/// nothing. Any other braces are kept as they are.
#[derive(Debug, Clone)]
pub struct ShellAction {
    template: String,
    cwd: PathBuf,
    env: HashMap<String, String>,
}

impl ShellAction {
    pub fn new(template: impl Into<String>, cwd: PathBuf, env: HashMap<String, String>) -> Self {
        Self {
            template: template.into(),
            cwd,
            env,
        }
    }

    /// Expand the template for this invocation.
    #[must_use]
    pub fn render(&self, inv: &Invocation<'_>, args: &[String]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                rest = &rest[start..];
                break;
            };
            let key = &after[..end];
            match expand(inv, args, key) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(key);
                    out.push('}');
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    /// Print the start line to the command's output and run the command,
    /// inheriting stdin, stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Failed` for a non-zero exit status and
    /// `ExecError::Spawn` if the shell cannot be started.
    pub fn execute(&self, inv: &Invocation<'_>, args: &[String]) -> Result<(), ExecError> {
        let command = self.render(inv, args);
        if inv.context().is_cancelled() {
            return Err(ExecError::Cancelled(command));
        }
        inv.print(format_args!("{}\n", start_message(&command, color())))?;

        debug!(
            "Running `{command}` in {} for {}",
            self.cwd.display(),
            inv.path()
        );
        let status = ProcessCommand::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.cwd)
            .envs(&self.env)
            .status()
            .map_err(|source| ExecError::Spawn {
                command: command.clone(),
                source,
            })?;
        match (status.success(), status.code()) {
            (true, _) => Ok(()),
            (false, Some(code)) => Err(ExecError::Failed { command, code }),
            (false, None) => Err(ExecError::Killed(command)),
        }
    }
}

fn expand(inv: &Invocation<'_>, args: &[String], key: &str) -> Option<String> {
    if key == "args" {
        return Some(
            args.iter()
                .map(|arg| quote(arg))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    let (owner, field) = key.split_once(':').unwrap_or(("", key));
    if field.is_empty() || !field.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return None;
    }
    let value = match inv.lookup(owner, field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => quote(&s),
        Some(other) => quote(&other.to_string()),
    };
    Some(value)
}

/// Quote `word` for `sh` unless it is made of safe characters only.
#[must_use]
pub fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

fn color() -> bool {
    io::stderr().is_terminal()
}

fn start_message(command: &str, color: bool) -> String {
    if color {
        format!("{ARROW_COLOR}❱{Reset} {command}")
    } else {
        format!("❱ {command}")
    }
}
