//! Option sets attached to commands
//!
//! The dispatcher never parses flags itself. Each command may carry an option
//! set implementing [`Options`], which parses tokens, exposes its values by
//! field name for scope lookups, and describes its flags for help output.
//!
//! Any `clap` derived struct that is also `serde` serializable gets an
//! implementation for free (see [`derive`]); [`dynamic::DynamicOptions`]
//! covers flags only known at runtime, such as those read from a config file.

use std::any::Any;
use std::io::Write;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, ColorChoice};
use serde_json::Value;
use thiserror::Error;

pub mod derive;
pub mod dynamic;

/// Id of the positional argument that collects everything after the flags.
const REST: &str = "__cmdtree_rest";

/// Errors produced while parsing an option set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("flag provided but not defined: {0}")]
    Undefined(String),
    #[error("{0}")]
    Invalid(String),
    #[error("unable to update options: {0}")]
    Update(String),
}

/// Description of a single flag, used to render usage and help.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagInfo {
    /// Field name; also the name used for scope lookups
    pub id: String,
    pub short: Option<char>,
    pub long: Option<String>,
    /// Placeholder for the flag's value, `None` for switches
    pub value_name: Option<String>,
    pub help: String,
}

impl FlagInfo {
    /// Render as `--name=NAME`, `-n=N`, or just `-v` for a switch.
    #[must_use]
    pub fn spec(&self) -> String {
        let flag = match (&self.long, self.short) {
            (Some(long), _) => format!("--{long}"),
            (None, Some(short)) => format!("-{short}"),
            (None, None) => self.id.clone(),
        };
        match &self.value_name {
            Some(value) => format!("{flag}={value}"),
            None => flag,
        }
    }

    fn from_arg(arg: &Arg) -> Self {
        let id = arg.get_id().as_str().to_string();
        let value_name = arg.get_action().takes_values().then(|| {
            arg.get_value_names()
                .and_then(|names| names.first())
                .map_or_else(|| id.to_uppercase(), ToString::to_string)
        });
        FlagInfo {
            short: arg.get_short(),
            long: arg.get_long().map(str::to_string),
            value_name,
            help: arg.get_help().map(ToString::to_string).unwrap_or_default(),
            id,
        }
    }
}

/// A command's option set.
pub trait Options: Send + Sync + 'static {
    /// Parse `args` into `self` and return the positional tokens left over.
    ///
    /// Parsing stops at the first positional token; everything from there on
    /// is returned untouched. Values not given keep what `self` already holds.
    /// Verbose diagnostics, such as clap's rendered error, go to
    /// `diagnostics`, never to the user directly.
    ///
    /// # Errors
    ///
    /// Returns `OptionsError` for unknown flags and invalid values.
    fn parse(
        &mut self,
        args: &[String],
        diagnostics: &mut dyn Write,
    ) -> Result<Vec<String>, OptionsError>;

    /// Current value of the field named `field`, if the set has one.
    fn lookup(&self, field: &str) -> Option<Value>;

    /// The flags this set accepts, in declaration order.
    fn flags(&self) -> Vec<FlagInfo>;

    fn clone_options(&self) -> Box<dyn Options>;

    fn as_any(&self) -> &dyn Any;
}

/// Prepare a flag parser: no binary name, no built-in help or version flag,
/// every flag optional, and a trailing positional that swallows the rest.
pub(crate) fn parser(base: clap::Command) -> clap::Command {
    let ids: Vec<String> = base
        .get_arguments()
        .map(|arg| arg.get_id().as_str().to_string())
        .collect();
    let mut cmd = base
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .color(ColorChoice::Never)
        .args_override_self(true);
    for id in ids {
        cmd = cmd.mut_arg(id, |arg| arg.required(false));
    }
    cmd.arg(
        Arg::new(REST)
            .action(ArgAction::Append)
            .num_args(1..)
            .trailing_var_arg(true),
    )
}

/// Flags declared on `cmd`, skipping positionals and the rest collector.
pub(crate) fn flag_infos(cmd: &clap::Command) -> Vec<FlagInfo> {
    cmd.get_arguments()
        .filter(|arg| !arg.is_positional() && arg.get_id() != REST)
        .map(FlagInfo::from_arg)
        .collect()
}

pub(crate) fn rest(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>(REST)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Convert a clap error into a one-line `OptionsError`, keeping clap's full
/// rendering in `diagnostics`.
pub(crate) fn options_error(err: &clap::Error, diagnostics: &mut dyn Write) -> OptionsError {
    let _ = write!(diagnostics, "{err}");
    if err.kind() == ErrorKind::UnknownArgument
        && let Some(ContextValue::String(flag)) = err.get(ContextKind::InvalidArg)
    {
        return OptionsError::Undefined(flag.clone());
    }
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    OptionsError::Invalid(line.trim_start_matches("error: ").to_string())
}

/// Render a looked-up value the way help shows defaults; zero values are hidden.
#[must_use]
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .filter_map(display_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}
