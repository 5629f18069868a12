use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use serde_json::Value;

use crate::commands::error::ActionError;
use crate::commands::help;
use crate::commands::invocation::Invocation;
use crate::commands::policy::ErrorPolicy;
use crate::commands::scope::Binding;
use crate::options::{FlagInfo, Options};
use crate::output::Output;

/// Upper bound on a command's positional arguments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaxArgs {
    #[default]
    Unbounded,
    /// Any positional argument is an error
    NoArgs,
    /// At most this many; `AtMost(0)` is the same as `Unbounded`
    AtMost(usize),
}

/// Body of a command, called with the invocation frame and the positional
/// arguments left after option parsing.
pub type Action = Arc<dyn Fn(&Invocation<'_>, &[String]) -> Result<(), ActionError> + Send + Sync>;

/// A node in the command tree.
///
/// A command has an action, children, or both. When both are present the
/// first positional argument selects a child if there is one, otherwise the
/// action runs.
///
/// ```
/// use cmdtree::{Command, Context};
///
/// let tree = Command::new("main")
///     .subcommand(Command::new("hello").no_args().action(|inv, _| {
///         inv.print(format_args!("hello from {}\n", inv.path()))?;
///         Ok(())
///     }))
///     .subcommand(cmdtree::help_command());
///
/// let buffer = cmdtree::Buffer::new();
/// let ctx = Context::new().with_output(buffer.clone());
/// tree.run(&ctx, &["hello"], &[]).unwrap();
/// assert_eq!(buffer.contents(), "hello from main hello\n");
/// ```
pub struct Command {
    name: String,
    help: String,
    description: String,
    parameters: String,
    min_args: usize,
    max_args: MaxArgs,
    pub(crate) binding: Binding,
    pub(crate) action: Option<Action>,
    children: Vec<Arc<Command>>,
    pub(crate) output: Option<Output>,
    pub(crate) on_error: Option<ErrorPolicy>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            description: String::new(),
            parameters: String::new(),
            min_args: 0,
            max_args: MaxArgs::Unbounded,
            binding: Binding::None,
            action: None,
            children: Vec::new(),
            output: None,
            on_error: None,
        }
    }

    /// One line summary shown in the parent's sub command list
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Parameter hint placed at the end of the usage line
    #[must_use]
    pub fn parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    #[must_use]
    pub fn min_args(mut self, min: usize) -> Self {
        self.min_args = min;
        self
    }

    #[must_use]
    pub fn max_args(mut self, max: MaxArgs) -> Self {
        self.max_args = max;
        self
    }

    #[must_use]
    pub fn no_args(self) -> Self {
        self.max_args(MaxArgs::NoArgs)
    }

    /// Options cloned from `options` for every run; nothing carries over.
    #[must_use]
    pub fn defaults(mut self, options: impl Options) -> Self {
        self.binding = Binding::defaults(options);
        self
    }

    /// Options parsed in place; values given in one run stay for the next.
    #[must_use]
    pub fn flags(mut self, options: impl Options) -> Self {
        self.binding = Binding::persistent(options);
        self
    }

    #[must_use]
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[String]) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    #[must_use]
    pub fn subcommand(self, child: Command) -> Self {
        self.shared_subcommand(Arc::new(child))
    }

    /// Add a child that may also be attached to other parents.
    #[must_use]
    pub fn shared_subcommand(mut self, child: Arc<Command>) -> Self {
        self.children.push(child);
        self
    }

    /// Sink for usage, help and error messages of this command and the
    /// commands below it that do not set their own.
    #[must_use]
    pub fn output(mut self, output: impl Into<Output>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Policy for errors raised by this command or by a command below it
    /// that has no policy of its own. The policy receives the frame and the
    /// arguments of the command that failed, and runs once per error.
    #[must_use]
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = Some(policy);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn help_text(&self) -> &str {
        &self.help
    }

    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.trim()
    }

    #[must_use]
    pub fn min_arg_count(&self) -> usize {
        self.min_args
    }

    #[must_use]
    pub fn max_arg_count(&self) -> MaxArgs {
        self.max_args
    }

    /// The parameter hint: the explicit one if set, otherwise generated from
    /// the argument counts (`arg0 arg1 ...`).
    #[must_use]
    pub fn parameter_hint(&self) -> String {
        if !self.parameters.is_empty() {
            return self.parameters.clone();
        }
        let bounded = match self.max_args {
            MaxArgs::NoArgs => return String::new(),
            MaxArgs::Unbounded | MaxArgs::AtMost(0) => None,
            MaxArgs::AtMost(max) => Some(max),
        };
        let mut words: Vec<String> = (0..self.min_args).map(|i| format!("arg{i}")).collect();
        if bounded.is_none_or(|max| max < self.min_args) {
            words.push("...".to_string());
        }
        words.join(" ")
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    #[must_use]
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn children(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.children.iter()
    }

    /// Child with exactly this name; the first one wins on duplicates.
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&Arc<Command>> {
        self.children.iter().find(|child| child.name == name)
    }

    #[must_use]
    pub fn child_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.children.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    /// Flags of this command's option set, empty when it has none.
    #[must_use]
    pub fn flag_infos(&self) -> Vec<FlagInfo> {
        self.binding.flags()
    }

    /// Current value of an option of this command outside of a run.
    ///
    /// Reads the persistent store, or the snapshot from the last run for
    /// defaults, or the defaults themselves before the first run.
    #[must_use]
    pub fn lookup(&self, field: &str) -> Option<Value> {
        self.binding.with_current(|options| options.lookup(field))?
    }

    /// A copy of the current option struct, see [`Command::lookup`].
    #[must_use]
    pub fn options<T: Clone + 'static>(&self) -> Option<T> {
        self.binding
            .with_current(|options| options.as_any().downcast_ref::<T>().cloned())?
    }

    /// `Usage: <name> [flags] <hint>`, where the hint is `subcommand [...]`
    /// for commands with children.
    #[must_use]
    pub fn usage(&self) -> String {
        self.usage_for(&self.name)
    }

    pub(crate) fn usage_for(&self, path: &str) -> String {
        let hint = if self.has_children() && self.parameters.is_empty() {
            "subcommand [...]".to_string()
        } else {
            self.parameter_hint()
        };
        format!("Usage: {}", help::usage_line(path, &hint, &self.flag_infos()))
    }

    /// Write the compact usage block: usage line, flags and the names of
    /// the sub commands.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn write_usage(&self, w: &mut dyn Write) -> io::Result<()> {
        let flags = self.flag_infos();
        let lookup = |field: &str| self.lookup(field);
        if !self.has_children() {
            writeln!(w, "Usage: {}", help::usage_line(&self.name, "", &flags))?;
            return help::write_flags(w, "  ", &flags, &lookup);
        }
        writeln!(
            w,
            "Usage: {}",
            help::usage_line(&self.name, "subcommand ...", &flags)
        )?;
        help::write_flags(w, "  ", &flags, &lookup)?;
        writeln!(w, "Known sub commands:")?;
        writeln!(w)?;
        for child in &self.children {
            writeln!(w, "   {}  {}", child.name, child.help.trim())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("has_action", &self.has_action())
            .field("children", &self.child_names())
            .field("on_error", &self.on_error)
            .finish_non_exhaustive()
    }
}
