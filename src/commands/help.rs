//! Help and usage rendering

use std::io::{self, Write};

use serde_json::Value;
use thiserror::Error;

use crate::commands::command::Command;
use crate::commands::invocation::Invocation;
use crate::options::{FlagInfo, display_value};

#[derive(Error, Debug)]
pub enum HelpError {
    #[error("{0} has no subcommands")]
    NoSubcommands(String),
    #[error("{command} has no subcommand {name}")]
    UnknownSubcommand { command: String, name: String },
    #[error("Unable to write help: {0}")]
    Io(#[from] io::Error),
}

/// The built-in `help` command.
///
/// Attach it to any command with children. It renders help for its parent,
/// or for the sub command named by its arguments.
#[must_use]
pub fn help_command() -> Command {
    Command::new("help")
        .help("display help")
        .parameters("[command ...]")
        .action(|inv, args| render(inv, args).map_err(Into::into))
}

/// Render help for the node named by `path`, starting at the invocation's
/// command, or at its parent when the command is a leaf.
///
/// # Errors
///
/// Fails if `path` names a command that does not exist, or if the output
/// cannot be written.
pub fn render(inv: &Invocation<'_>, path: &[String]) -> Result<(), HelpError> {
    let mut node = inv.command();
    if !node.has_children()
        && let Some(parent) = inv.parent()
    {
        node = parent.command();
    }

    let mut command = node.name().to_string();
    for name in path {
        if !node.has_children() {
            return Err(HelpError::NoSubcommands(command));
        }
        node = node
            .find_child(name)
            .ok_or_else(|| HelpError::UnknownSubcommand {
                command: command.clone(),
                name: name.clone(),
            })?;
        command.push(' ');
        command.push_str(name);
    }

    let mut out = Vec::new();
    write_help(&mut out, node)?;
    inv.output().write_str(&String::from_utf8_lossy(&out))?;
    Ok(())
}

fn write_help(w: &mut dyn Write, node: &Command) -> io::Result<()> {
    let flags = node.flag_infos();
    let hint = if node.has_children() {
        "subcommand [...]".to_string()
    } else {
        node.parameter_hint()
    };
    writeln!(w, "Usage: {}", usage_line(node.name(), &hint, &flags))?;
    let description = node.description_text();
    if !description.is_empty() {
        writeln!(w, "{}", indent("    ", description))?;
        if !flags.is_empty() {
            writeln!(w)?;
        }
    }
    write_flags(w, "    ", &flags, &|field| node.lookup(field))?;
    if !node.has_children() {
        return Ok(());
    }

    let mut children: Vec<_> = node.children().collect();
    children.sort_by(|a, b| a.name().cmp(b.name()));
    write!(w, "\nAvailable sub commands:")?;
    for child in children {
        let mut hint = child.parameter_hint();
        if hint.is_empty() && child.has_children() {
            hint = "subcommand [...]".to_string();
        }
        let line = usage_line(child.name(), &hint, &child.flag_infos());
        write!(w, "\n{}\n", indent("  ", &line))?;
        let summary = match child.description_text() {
            "" => child.help_text().trim(),
            description => description,
        };
        if !summary.is_empty() {
            writeln!(w, "{}", indent("    ", summary))?;
        }
    }
    Ok(())
}

/// `name [flag] [flag] params`
pub(crate) fn usage_line(name: &str, params: &str, flags: &[FlagInfo]) -> String {
    let mut line = name.to_string();
    for flag in flags {
        line.push_str(&format!(" [{}]", flag.spec()));
    }
    if !params.is_empty() {
        line.push(' ');
        line.push_str(params);
    }
    line
}

/// One line per flag: spec, help and the current value when it is set.
pub(crate) fn write_flags(
    w: &mut dyn Write,
    indent: &str,
    flags: &[FlagInfo],
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> io::Result<()> {
    let any_long = flags.iter().any(|flag| flag.long.is_some());
    let specs: Vec<String> = flags
        .iter()
        .map(|flag| {
            // short-only flags line up with the dashes of long ones
            if any_long && flag.long.is_none() {
                format!(" {}", flag.spec())
            } else {
                flag.spec()
            }
        })
        .collect();
    let width = specs.iter().map(|s| s.chars().count()).max().unwrap_or(0) + 4;

    for (flag, spec) in flags.iter().zip(&specs) {
        let mut line = format!("{indent}{spec:<width$}{}", flag.help);
        if let Some(value) = lookup(&flag.id).as_ref().and_then(display_value) {
            line.push_str(&format!(" [{value}]"));
        }
        writeln!(w, "{}", line.trim_end())?;
    }
    Ok(())
}

fn indent(prefix: &str, text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
