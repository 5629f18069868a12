use std::any::Any;
use std::collections::BTreeMap;
use std::io::Write;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction};
use serde_json::Value;

use super::{FlagInfo, Options, OptionsError, flag_infos, options_error, parser, rest};

/// A flag defined at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: String,
    pub short: Option<char>,
    pub help: String,
    /// Starting value; ignored for switches, which start off
    pub default: String,
    /// A switch takes no value and is `true` once given
    pub switch: bool,
}

impl FlagSpec {
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            help: String::new(),
            default: String::new(),
            switch: false,
        }
    }

    pub fn switch(name: impl Into<String>) -> Self {
        Self {
            switch: true,
            ..Self::value(name)
        }
    }

    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    fn initial(&self) -> Value {
        if self.switch {
            Value::Bool(false)
        } else {
            Value::String(self.default.clone())
        }
    }

    fn arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .help(self.help.clone());
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if self.switch {
            arg.action(ArgAction::SetTrue)
        } else {
            arg.action(ArgAction::Set)
                .value_name(self.name.to_uppercase().replace('-', "_"))
        }
    }
}

/// Option set whose flags are only known at runtime, e.g. from a config file.
///
/// Switches hold `Value::Bool`, every other flag holds `Value::String`.
#[derive(Debug, Clone, Default)]
pub struct DynamicOptions {
    specs: Vec<FlagSpec>,
    values: BTreeMap<String, Value>,
}

impl DynamicOptions {
    #[must_use]
    pub fn new(specs: Vec<FlagSpec>) -> Self {
        let values = specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.initial()))
            .collect();
        Self { specs, values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn command(&self) -> clap::Command {
        self.specs
            .iter()
            .fold(clap::Command::new("options"), |cmd, spec| cmd.arg(spec.arg()))
    }
}

impl Options for DynamicOptions {
    fn parse(
        &mut self,
        args: &[String],
        diagnostics: &mut dyn Write,
    ) -> Result<Vec<String>, OptionsError> {
        let matches = parser(self.command())
            .try_get_matches_from(args)
            .map_err(|err| options_error(&err, diagnostics))?;
        for spec in &self.specs {
            if matches.value_source(&spec.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            let value = if spec.switch {
                Value::Bool(matches.get_flag(&spec.name))
            } else {
                match matches.get_one::<String>(&spec.name) {
                    Some(value) => Value::String(value.clone()),
                    None => continue,
                }
            };
            self.values.insert(spec.name.clone(), value);
        }
        Ok(rest(&matches))
    }

    fn lookup(&self, field: &str) -> Option<Value> {
        self.values.get(field).cloned()
    }

    fn flags(&self) -> Vec<FlagInfo> {
        flag_infos(&self.command())
    }

    fn clone_options(&self) -> Box<dyn Options> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
