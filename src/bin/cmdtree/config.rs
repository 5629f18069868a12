//! Declarative command trees
//!
//! A tree can be described in `.cmdtree.yaml`, `.cmdtree.yml` or
//! `.cmdtree.json`. Leaves with `run:` execute a shell command, see
//! [`ShellAction`].

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cmdtree::options::dynamic::{DynamicOptions, FlagSpec};
use cmdtree::{Command, ErrorPolicy, MaxArgs, help_command};

use crate::shell::ShellAction;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file found in current directory or its parents: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Unable to find directory: {path:?} (command: {command})")]
    DirectoryNotFound {
        command: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to parse YAML config file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON config file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Duplicate command name in config: {0}")]
    DuplicateName(String),
    #[error("Invalid config: {0}")]
    Validation(String),
}

/// A flag of a configured command
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ConfigFlag {
    pub name: String,
    pub short: Option<char>,
    pub help: Option<String>,
    pub default: Option<String>,
    /// Takes no value; `true` once given
    pub switch: Option<bool>,
}

impl From<ConfigFlag> for FlagSpec {
    fn from(config: ConfigFlag) -> Self {
        FlagSpec {
            name: config.name,
            short: config.short,
            help: config.help.unwrap_or_default(),
            default: config.default.unwrap_or_default(),
            switch: config.switch.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPolicy {
    Exit,
    Continue,
}

impl From<ConfigPolicy> for ErrorPolicy {
    fn from(config: ConfigPolicy) -> Self {
        match config {
            ConfigPolicy::Exit => ErrorPolicy::ExitOnError,
            ConfigPolicy::Continue => ErrorPolicy::ContinueOnError,
        }
    }
}

/// Configuration for a single command and its sub commands
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ConfigCommand {
    pub name: String,
    pub help: Option<String>,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub min_args: Option<usize>,
    /// 0 means no limit
    pub max_args: Option<usize>,
    pub no_args: Option<bool>,
    /// Keep flag values between runs instead of starting from the defaults
    pub sticky: Option<bool>,
    pub flags: Option<Vec<ConfigFlag>>,
    /// Shell command template
    pub run: Option<String>,
    pub cwd: Option<PathBuf>,
    pub env: Option<HashMap<String, String>>,
    pub on_error: Option<ConfigPolicy>,
    pub commands: Option<Vec<ConfigCommand>>,
}

/// Working directory and environment handed down from a command to its
/// sub commands.
#[derive(Debug, Default, Clone)]
struct Inheritance {
    cwd: PathBuf,
    env: HashMap<String, String>,
    path: Vec<String>,
}

impl Inheritance {
    fn child(&self, config: &ConfigCommand) -> Result<Inheritance, ConfigError> {
        let mut path = self.path.clone();
        path.push(config.name.clone());
        let cwd = inherit_path(&self.cwd, config.cwd.clone().unwrap_or_default());
        let cwd = cwd
            .canonicalize()
            .map_err(|source| ConfigError::DirectoryNotFound {
                command: path.join(" "),
                path: cwd.clone(),
                source,
            })?;
        let mut env = self.env.clone();
        env.extend(config.env.clone().unwrap_or_default());
        Ok(Inheritance { cwd, env, path })
    }
}

/// Resolve `child` against `parent`; an empty child means the parent itself.
#[must_use]
pub fn inherit_path(parent: &Path, child: PathBuf) -> PathBuf {
    if child.as_os_str().is_empty() {
        parent.to_path_buf()
    } else if child.is_relative() {
        parent.join(child)
    } else {
        child
    }
}

impl ConfigCommand {
    fn into_command(
        self,
        parent: &Inheritance,
        with_help: bool,
    ) -> Result<Command, ConfigError> {
        let inherited = parent.child(&self)?;

        let mut cmd = Command::new(self.name.clone()).min_args(self.min_args.unwrap_or(0));
        if let Some(help) = self.help {
            cmd = cmd.help(help);
        }
        if let Some(description) = self.description {
            cmd = cmd.description(description);
        }
        if let Some(parameters) = self.parameters {
            cmd = cmd.parameters(parameters);
        }
        cmd = match (self.no_args, self.max_args) {
            (Some(true), _) => cmd.no_args(),
            (_, Some(max)) => cmd.max_args(MaxArgs::AtMost(max)),
            _ => cmd,
        };
        if let Some(flags) = self.flags {
            let options = DynamicOptions::new(flags.into_iter().map(FlagSpec::from).collect());
            cmd = if self.sticky.unwrap_or(false) {
                cmd.flags(options)
            } else {
                cmd.defaults(options)
            };
        }
        if let Some(policy) = self.on_error {
            cmd = cmd.on_error(policy.into());
        }
        if let Some(template) = self.run {
            let action = ShellAction::new(template, inherited.cwd.clone(), inherited.env.clone());
            cmd = cmd.action(move |inv, args| action.execute(inv, args).map_err(Into::into));
        }

        let children = self.commands.unwrap_or_default();
        let branch = !children.is_empty();
        for child in children {
            cmd = cmd.subcommand(child.into_command(&inherited, with_help)?);
        }
        if branch && with_help && cmd.find_child("help").is_none() {
            cmd = cmd.subcommand(help_command());
        }
        debug!("Configured command '{}'", inherited.path.join(" "));
        Ok(cmd)
    }
}

fn default_true() -> bool {
    true
}

/// Root configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Attach the built-in `help` command to every command with children
    #[serde(default = "default_true")]
    pub help_command: bool,
    #[serde(flatten)]
    pub root: ConfigCommand,
}

/// List of supported configuration file names
const FILENAMES: [&str; 3] = [".cmdtree.yaml", ".cmdtree.yml", ".cmdtree.json"];

impl Config {
    /// Loads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(file)
            .map_err(|_| ConfigError::ConfigNotFound(file.to_path_buf()))?;
        let config: Config = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        Ok(config)
    }

    /// Searches for a configuration file in the current directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownWorkingDirectory` if the cwd cannot be determined,
    /// or `ConfigError::ConfigNotFound` if no config file is found.
    pub fn find_config() -> Result<PathBuf, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
        Self::find_config_from(&cwd)
    }

    /// Like [`Config::find_config`], starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if no config file is found.
    pub fn find_config_from(start: &Path) -> Result<PathBuf, ConfigError> {
        let mut path = start.to_path_buf();
        debug!("Searching for config file in {}", start.display());
        loop {
            for file in &FILENAMES {
                let config_path = path.join(file);
                if config_path.exists() {
                    info!("Found config file: {}", config_path.display());
                    return Ok(config_path);
                }
            }
            if !path.pop() {
                return Err(ConfigError::ConfigNotFound(start.to_path_buf()));
            }
        }
    }

    /// Build the command tree. Relative `cwd` entries resolve against `base`,
    /// normally the directory holding the config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DirectoryNotFound` if a `cwd` does not exist.
    pub fn into_command(self, base: &Path) -> Result<Command, ConfigError> {
        let inheritance = Inheritance {
            cwd: base.to_path_buf(),
            ..Default::default()
        };
        self.root.into_command(&inheritance, self.help_command)
    }
}

/// Load a command tree from a config file (or auto-detect one), returning the
/// root command and the config file path.
///
/// # Errors
///
/// Returns `ConfigError` if the config file is not found, cannot be parsed,
/// contains invalid values, or references non-existent directories.
pub fn load_config(config_file: Option<&str>) -> Result<(Command, PathBuf), ConfigError> {
    let config_path = match config_file {
        Some(file) => {
            let config_path = PathBuf::from(file);
            if !config_path.exists() {
                return Err(ConfigError::ConfigNotFound(config_path));
            }
            config_path
        }
        None => Config::find_config()?,
    };
    let cwd = config_path
        .parent()
        .ok_or_else(|| ConfigError::ConfigNotFound(config_path.clone()))?
        .to_path_buf();
    let cwd = if cwd.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cwd
    };
    debug!(
        "Building command tree from config file: {} (cwd: {})",
        config_path.display(),
        cwd.display()
    );
    let parsed = Config::from_file(&config_path)?;
    validate_tree(&parsed.root)?;
    let root = parsed.into_command(&cwd)?;
    Ok((root, config_path))
}

/// Validate the config tree for empty or duplicate names and impossible
/// argument limits
fn validate_tree(root: &ConfigCommand) -> Result<(), ConfigError> {
    check_names(root, root.name.as_str())?;
    check_arg_limits(root, root.name.as_str())?;
    check_empty_commands(root);
    Ok(())
}

fn check_names(cmd: &ConfigCommand, path: &str) -> Result<(), ConfigError> {
    if cmd.name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "Command under '{path}' has an empty name"
        )));
    }
    if cmd.name.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "Command '{path}' has whitespace in its name"
        )));
    }
    let mut seen = HashSet::new();
    for child in cmd.commands.iter().flatten() {
        if !seen.insert(child.name.as_str()) {
            return Err(ConfigError::DuplicateName(format!("{path} {}", child.name)));
        }
        check_names(child, &format!("{path} {}", child.name))?;
    }
    Ok(())
}

fn check_arg_limits(cmd: &ConfigCommand, path: &str) -> Result<(), ConfigError> {
    let min = cmd.min_args.unwrap_or(0);
    if cmd.no_args.unwrap_or(false) && min > 0 {
        return Err(ConfigError::Validation(format!(
            "Command '{path}' sets no_args but requires {min} arguments"
        )));
    }
    if let Some(max) = cmd.max_args
        && max > 0
        && min > max
    {
        return Err(ConfigError::Validation(format!(
            "Command '{path}' requires {min} arguments but takes no more than {max}"
        )));
    }
    for child in cmd.commands.iter().flatten() {
        check_arg_limits(child, &format!("{path} {}", child.name))?;
    }
    Ok(())
}

fn check_empty_commands(cmd: &ConfigCommand) {
    for child in cmd.commands.iter().flatten() {
        if child.run.is_none() && child.commands.as_ref().is_none_or(Vec::is_empty) {
            warn!("Command '{}' has nothing to run and no sub commands", child.name);
        }
        check_empty_commands(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cmdtree.json");
        std::fs::write(
            &path,
            r#"{
                "name": "root",
                "commands": [{"name": "test", "run": "echo hello", "no_args": true}]
            }"#,
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.root.name, "root");
        assert!(config.help_command);
        let commands = config.root.commands.unwrap();
        assert_eq!(commands[0].run.as_deref(), Some("echo hello"));
        assert_eq!(commands[0].no_args, Some(true));
    }

    #[test]
    fn test_from_file_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cmdtree.yaml");
        std::fs::write(
            &path,
            "name: root\nhelp_command: false\non_error: continue\nflags:\n  - name: target\n    short: t\n    default: debug\ncommands:\n  - name: test\n    run: echo hello\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(!config.help_command);
        assert_eq!(config.root.on_error, Some(ConfigPolicy::Continue));
        let flags = config.root.flags.unwrap();
        assert_eq!(flags[0].short, Some('t'));
        assert_eq!(flags[0].default.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_error_keeps_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cmdtree.yml");
        std::fs::write(&path, "name: [unterminated\n").unwrap();
        match Config::from_file(&path) {
            Err(ConfigError::Yaml { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected ConfigError::Yaml, got: {other:?}"),
        }
    }

    #[test]
    fn test_find_config_searches_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".cmdtree.yml"), "name: root\n").unwrap();
        let found = Config::find_config_from(&nested).unwrap();
        assert_eq!(found, dir.path().join(".cmdtree.yml"));
    }

    #[test]
    fn test_into_command() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let config: Config = serde_yaml::from_str(
            "name: root\ncommands:\n  - name: build\n    cwd: sub\n    min_args: 1\n    max_args: 2\n    run: echo {args}\n  - name: group\n    commands:\n      - name: leaf\n        no_args: true\n",
        )
        .unwrap();
        let root = config.into_command(dir.path()).unwrap();
        assert_eq!(root.child_names(), vec!["build", "group", "help"]);

        let build = root.find_child("build").unwrap();
        assert!(build.has_action());
        assert_eq!(build.min_arg_count(), 1);
        assert_eq!(build.max_arg_count(), MaxArgs::AtMost(2));

        let group = root.find_child("group").unwrap();
        assert_eq!(group.child_names(), vec!["help", "leaf"]);
        let leaf = group.find_child("leaf").unwrap();
        assert_eq!(leaf.max_arg_count(), MaxArgs::NoArgs);
        assert!(!leaf.has_children());
    }

    #[test]
    fn test_missing_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let config: Config =
            serde_yaml::from_str("name: root\ncommands:\n  - name: x\n    cwd: nope\n").unwrap();
        match config.into_command(dir.path()) {
            Err(ConfigError::DirectoryNotFound { command, .. }) => assert_eq!(command, "root x"),
            other => panic!("Expected DirectoryNotFound, got: {other:?}"),
        }
    }

    fn make_cmd(name: &str) -> ConfigCommand {
        ConfigCommand {
            name: name.to_string(),
            run: Some("echo test".to_string()),
            ..Default::default()
        }
    }

    fn make_group(name: &str, commands: Vec<ConfigCommand>) -> ConfigCommand {
        ConfigCommand {
            name: name.to_string(),
            commands: Some(commands),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_name_detection() {
        let config = make_group(
            "root",
            vec![make_group("dup", vec![make_cmd("a"), make_cmd("a")])],
        );
        match validate_tree(&config) {
            Err(ConfigError::DuplicateName(name)) => assert_eq!(name, "root dup a"),
            other => panic!("Expected DuplicateName, got: {other:?}"),
        }
    }

    #[test]
    fn test_same_name_in_different_branches_passes() {
        let config = make_group(
            "root",
            vec![
                make_group("one", vec![make_cmd("build")]),
                make_group("two", vec![make_cmd("build")]),
            ],
        );
        assert!(validate_tree(&config).is_ok());
    }

    #[test]
    fn test_empty_name() {
        let config = make_group("root", vec![make_cmd(" ")]);
        match validate_tree(&config) {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("empty name"), "{msg}"),
            other => panic!("Expected Validation, got: {other:?}"),
        }
    }

    #[test]
    fn test_impossible_arg_limits() {
        let mut cmd = make_cmd("x");
        cmd.min_args = Some(3);
        cmd.max_args = Some(2);
        assert!(validate_tree(&make_group("root", vec![cmd.clone()])).is_err());

        cmd.max_args = Some(0);
        assert!(validate_tree(&make_group("root", vec![cmd.clone()])).is_ok());

        cmd.no_args = Some(true);
        assert!(validate_tree(&make_group("root", vec![cmd])).is_err());
    }
}
