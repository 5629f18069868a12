//! Resolution of an argument vector against a command tree
//!
//! Every call to [`Command::run`] builds a chain of [`Invocation`] frames, one
//! per command on the path from the root to the command that handles the
//! arguments. A frame knows its parent frame, so commands never store a link
//! to their parent and a command may appear under several parents.

use std::any::Any;
use std::fmt;
use std::io;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::commands::command::{Command, MaxArgs};
use crate::commands::error::{Error, UsageCause, UsageError};
use crate::commands::help::{self, HelpError};
use crate::commands::policy::ErrorPolicy;
use crate::commands::scope::Scope;
use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    SubcommandsOnly,
}

impl Command {
    /// Parse `args` and run this command or the sub command they select.
    ///
    /// `args` does not include the program name. `extra` values are passed
    /// through to every action, see [`Invocation::extra`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] when the arguments do not fit the tree and
    /// [`Error::Execution`] when an action fails, unless an error policy on
    /// the path handles it.
    pub fn run<S: AsRef<str>>(
        &self,
        ctx: &Context,
        args: &[S],
        extra: &[&dyn Any],
    ) -> Result<(), Error> {
        let args = owned(args);
        self.invoke(ctx, None, &args, extra, Mode::Normal)
    }

    /// Like [`Command::run`], but always dispatches to a sub command and
    /// never calls this command's action.
    ///
    /// # Errors
    ///
    /// See [`Command::run`].
    pub fn run_subcommands<S: AsRef<str>>(
        &self,
        ctx: &Context,
        args: &[S],
        extra: &[&dyn Any],
    ) -> Result<(), Error> {
        let args = owned(args);
        self.invoke(ctx, None, &args, extra, Mode::SubcommandsOnly)
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a Context,
        parent: Option<&'a Invocation<'a>>,
        args: &[String],
        extra: &'a [&'a dyn Any],
        mode: Mode,
    ) -> Result<(), Error> {
        let (frame, parsed) = Invocation::open(self, ctx, parent, args, extra);
        match parsed.and_then(|rest| frame.resolve(&rest, mode)) {
            Ok(Step::Done) => Ok(()),
            // a child settles its own errors, they are final once they get here
            Ok(Step::Descend(child, rest)) => {
                child.invoke(ctx, Some(&frame), &rest, extra, Mode::Normal)
            }
            Err(err) => frame.settle(args, err),
        }
    }
}

/// What is left to do once a frame has resolved its own arguments.
enum Step<'a> {
    Done,
    Descend(&'a Command, Vec<String>),
}

fn owned<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter().map(|arg| arg.as_ref().to_string()).collect()
}

/// One command's frame in a running invocation chain.
///
/// Actions receive their frame and use it to read option values of their own
/// command or of any command above it, to reach the context, and to print to
/// the command's output.
pub struct Invocation<'a> {
    ctx: &'a Context,
    command: &'a Command,
    parent: Option<&'a Invocation<'a>>,
    scope: Scope<'a>,
    extra: &'a [&'a dyn Any],
}

impl<'a> Invocation<'a> {
    /// Parse the command's options and build its frame. The parse result is
    /// returned next to the frame so a failure can still be reported from it.
    fn open(
        command: &'a Command,
        ctx: &'a Context,
        parent: Option<&'a Invocation<'a>>,
        args: &[String],
        extra: &'a [&'a dyn Any],
    ) -> (Self, Result<Vec<String>, Error>) {
        let mut diagnostics = Vec::<u8>::new();
        let (scope, parsed) = match command.binding.parse(args, &mut diagnostics) {
            Ok((scope, rest)) => (scope, Ok(rest)),
            Err(err) => {
                debug!(
                    "{}: option parsing failed:\n{}",
                    command.name(),
                    String::from_utf8_lossy(&diagnostics).trim_end()
                );
                (Scope::Empty, Err(err))
            }
        };
        let frame = Self {
            ctx,
            command,
            parent,
            scope,
            extra,
        };
        let parsed = parsed.map_err(|err| frame.usage_error(err.into()));
        (frame, parsed)
    }

    fn resolve(&self, args: &[String], mode: Mode) -> Result<Step<'a>, Error> {
        let cmd = self.command;
        let max = cmd.max_arg_count();
        if max == MaxArgs::NoArgs && !args.is_empty() {
            return Err(self.usage_error(UsageCause::NoArguments));
        }
        if args.len() < cmd.min_arg_count() {
            return Err(self.usage_error(UsageCause::TooFew(cmd.min_arg_count())));
        }
        if let MaxArgs::AtMost(max) = max
            && max > 0
            && args.len() > max
        {
            return Err(self.usage_error(UsageCause::TooMany(max)));
        }

        // A branch without an action and without tokens is an error, not a
        // silent no-op.
        let dispatch = mode == Mode::SubcommandsOnly
            || (cmd.has_children() && (!args.is_empty() || !cmd.has_action()));
        if dispatch {
            return self.dispatch(args);
        }
        if let Some(action) = &cmd.action {
            debug!("{}: running action with {args:?}", self.path());
            action(self, args).map_err(Error::from_action)?;
        }
        Ok(Step::Done)
    }

    fn dispatch(&self, args: &[String]) -> Result<Step<'a>, Error> {
        let Some((name, rest)) = args.split_first() else {
            let names = self.command.child_names();
            return Err(self.usage_error(UsageCause::SubcommandRequired(names)));
        };
        let Some(child) = self.command.find_child(name) else {
            return Err(self.usage_error(UsageCause::UnknownCommand(name.clone())));
        };
        debug!("{}: dispatching to {name}", self.path());
        Ok(Step::Descend(&**child, rest.to_vec()))
    }

    /// Hand an error raised by this frame to the nearest error policy on the
    /// chain, if any.
    fn settle(&self, args: &[String], err: Error) -> Result<(), Error> {
        match self.policy() {
            Some(policy) => {
                debug!("{}: applying {policy:?} to: {err}", self.path());
                policy.handle(self, args, err)
            }
            None => Err(err),
        }
    }

    fn policy(&self) -> Option<&'a ErrorPolicy> {
        let mut frame = Some(self);
        while let Some(inv) = frame {
            if let Some(policy) = &inv.command.on_error {
                return Some(policy);
            }
            frame = inv.parent;
        }
        None
    }

    /// Report a usage error on this command's output, followed by help.
    fn usage_error(&self, cause: UsageCause) -> Error {
        let err = UsageError::new(self.path(), cause);
        if let Err(e) = self.print(format_args!("{err}\n")) {
            warn!("Unable to report usage error for {}: {e}", err.command);
        }
        if let Err(e) = help::render(self, &[]) {
            warn!("Unable to render help for {}: {e}", err.command);
        }
        Error::Usage(err)
    }

    #[must_use]
    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    #[must_use]
    pub fn command(&self) -> &'a Command {
        self.command
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'a Invocation<'a>> {
        self.parent
    }

    /// Names from the root of the chain down to this command, space separated.
    #[must_use]
    pub fn path(&self) -> String {
        let mut names = vec![self.command.name()];
        let mut frame = self.parent;
        while let Some(inv) = frame {
            names.push(inv.command.name());
            frame = inv.parent;
        }
        names.reverse();
        names.join(" ")
    }

    /// Value of the option `field`.
    ///
    /// With an empty `owner` the nearest frame whose options have the field
    /// answers. Otherwise only frames of commands named `owner` are asked,
    /// nearest first.
    #[must_use]
    pub fn lookup(&self, owner: &str, field: &str) -> Option<Value> {
        let mut frame = Some(self);
        while let Some(inv) = frame {
            if (owner.is_empty() || owner == inv.command.name())
                && let Some(value) = inv.scope.lookup(field)
            {
                return Some(value);
            }
            frame = inv.parent;
        }
        None
    }

    /// [`Invocation::lookup`] converted to `T`; `None` if the types do not fit.
    #[must_use]
    pub fn lookup_as<T: DeserializeOwned>(&self, owner: &str, field: &str) -> Option<T> {
        serde_json::from_value(self.lookup(owner, field)?).ok()
    }

    /// A copy of this command's parsed option struct.
    #[must_use]
    pub fn options<T: Clone + 'static>(&self) -> Option<T> {
        self.scope.options()
    }

    /// The first extra value of type `T` passed to `run`.
    #[must_use]
    pub fn extra<T: 'static>(&self) -> Option<&'a T> {
        self.extra.iter().find_map(|value| value.downcast_ref::<T>())
    }

    /// The nearest output set on a command in the chain, or the context's.
    #[must_use]
    pub fn output(&self) -> &'a Output {
        let mut frame = Some(self);
        while let Some(inv) = frame {
            if let Some(output) = &inv.command.output {
                return output;
            }
            frame = inv.parent;
        }
        self.ctx.output()
    }

    /// Print to [`Invocation::output`].
    ///
    /// # Errors
    ///
    /// Returns the output's write error.
    pub fn print(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.output().print(args)
    }

    /// Dispatch `args` to a sub command of this command, skipping its action.
    ///
    /// Options in `args` are parsed for this command first. Errors returned
    /// from here can be returned from the action unchanged and keep their kind.
    ///
    /// # Errors
    ///
    /// See [`Command::run`].
    pub fn run_subcommands(&self, args: &[String]) -> Result<(), Error> {
        let (frame, parsed) =
            Invocation::open(self.command, self.ctx, self.parent, args, self.extra);
        match parsed.and_then(|rest| frame.resolve(&rest, Mode::SubcommandsOnly))? {
            Step::Done => Ok(()),
            Step::Descend(child, rest) => {
                child.invoke(self.ctx, Some(&frame), &rest, self.extra, Mode::Normal)
            }
        }
    }

    /// Usage line of this command with its full path.
    #[must_use]
    pub fn usage(&self) -> String {
        self.command.usage_for(&self.path())
    }

    /// Render help for this command, see [`help::render`].
    ///
    /// # Errors
    ///
    /// Fails if the output cannot be written.
    pub fn help(&self) -> Result<(), HelpError> {
        help::render(self, &[])
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clap::Args;
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::commands::help::help_command;
    use crate::options::dynamic::{DynamicOptions, FlagSpec};
    use crate::output::Buffer;

    #[derive(Args, Serialize, Deserialize, Clone, Debug, Default)]
    struct MainFlags {
        /// add the name
        #[arg(long, value_name = "NAME")]
        name: String,
    }

    #[derive(Args, Serialize, Deserialize, Clone, Debug, Default)]
    struct FooFlags {
        #[arg(short, value_name = "VALUE")]
        n: i64,
        #[arg(long, value_name = "VALUE")]
        name: String,
    }

    #[derive(Args, Serialize, Deserialize, Clone, Debug, Default)]
    struct BarFlags {
        /// name of bar
        #[arg(long, value_name = "BAR_NAME")]
        name: String,
        /// set the value of v
        #[arg(long, value_name = "V")]
        value: i64,
    }

    #[derive(Args, Serialize, Deserialize, Clone, Debug, Default)]
    struct SubbarFlags {
        /// name of subbar
        #[arg(long, value_name = "BAR_NAME")]
        name: String,
    }

    fn show(value: Option<Value>) -> String {
        match value {
            Some(Value::String(s)) => s,
            Some(value) => value.to_string(),
            None => "<none>".to_string(),
        }
    }

    fn foo() -> Command {
        Command::new("foo")
            .help("execute the foo command")
            .description("description of foo")
            .min_args(1)
            .max_args(MaxArgs::AtMost(1))
            .defaults(FooFlags {
                n: 42,
                ..Default::default()
            })
            .action(|inv, args| {
                if args[0] == "fatal" {
                    return Err("fatal error".into());
                }
                let opts = inv.options::<FooFlags>().ok_or("no options")?;
                inv.print(format_args!("Foo: {:?}\nN: {}\n", args[0], opts.n))?;
                Ok(())
            })
    }

    fn subbar() -> Command {
        Command::new("subbar")
            .help("this is the subbar function")
            .defaults(SubbarFlags {
                name: "myname".to_string(),
            })
            .action(|inv, args| {
                assert_eq!(inv.lookup("", "unknown"), None);
                inv.print(format_args!(
                    "SubBar: {args:?}\nName: {}\nValue: {}\nBar Name: {}\nTop Name: {}\n",
                    show(inv.lookup("", "name")),
                    show(inv.lookup("", "value")),
                    show(inv.lookup("bar", "name")),
                    show(inv.lookup("main", "name")),
                ))?;
                Ok(())
            })
    }

    fn bar() -> Command {
        Command::new("bar")
            .help("execute bar and sub commands")
            .parameters("WORD ...")
            .flags(BarFlags {
                value: 17,
                ..Default::default()
            })
            .action(|inv, args| {
                let opts = inv.options::<BarFlags>().ok_or("no options")?;
                inv.print(format_args!(
                    "Bar: {args:?}\nName: {}\nValue: {}\n",
                    opts.name, opts.value
                ))?;
                if args.is_empty() {
                    return Ok(());
                }
                Ok(inv.run_subcommands(args)?)
            })
            .subcommand(subbar())
    }

    fn tree() -> Command {
        Command::new("main")
            .help("\nThe main program provides an example of\nusing the commands.\n")
            .description("\nThis is the description of the main command.\nIt has multiple lines.\n")
            .flags(MainFlags::default())
            .subcommand(bar())
            .subcommand(foo())
            .subcommand(help_command())
    }

    fn context() -> (Context, Buffer) {
        let buffer = Buffer::new();
        (Context::new().with_output(buffer.clone()), buffer)
    }

    fn recording_context() -> (Context, Buffer, Arc<Mutex<Vec<i32>>>) {
        let (ctx, buffer) = context();
        let exits = Arc::new(Mutex::new(Vec::new()));
        let recorded = exits.clone();
        let ctx = ctx.with_exit(move |code| recorded.lock().push(code));
        (ctx, buffer, exits)
    }

    #[test]
    fn test_main_flags_are_sticky() {
        let main = tree();
        let (ctx, _) = context();
        for (args, want) in [
            (vec!["bar"], ""),
            (vec!["--name", "foo", "bar"], "foo"),
            (vec!["bar"], "foo"),
        ] {
            main.run(&ctx, &args, &[]).unwrap();
            assert_eq!(show(main.lookup("name")), want, "after {args:?}");
            assert_eq!(main.options::<MainFlags>().unwrap().name, want);
        }
    }

    #[test]
    fn test_defaults_are_fresh_each_run() {
        let main = tree();
        let (ctx, buffer) = context();
        main.run(&ctx, &["foo", "-n", "7", "x"], &[]).unwrap();
        main.run(&ctx, &["foo", "y"], &[]).unwrap();
        assert_eq!(buffer.contents(), "Foo: \"x\"\nN: 7\nFoo: \"y\"\nN: 42\n");

        let foo = main.find_child("foo").unwrap();
        assert_eq!(foo.lookup("n"), Some(Value::from(42)));
    }

    #[test]
    fn test_ancestor_lookup() {
        let main = tree();
        let (ctx, buffer) = context();
        main.run(&ctx, &["--name", "foo", "bar", "subbar"], &[])
            .unwrap();
        assert_eq!(
            buffer.contents(),
            "SubBar: []\nName: myname\nValue: 17\nBar Name: \nTop Name: foo\n"
        );
    }

    #[test]
    fn test_exit_on_error() {
        let main = tree().on_error(ErrorPolicy::ExitOnError);
        let (ctx, buffer, exits) = recording_context();
        assert!(main.run(&ctx, &["bob"], &[]).is_ok());
        assert_eq!(*exits.lock(), vec![1]);

        let output = buffer.contents();
        assert!(
            output.starts_with("main: bob: unknown command\nUsage: main [--name=NAME] subcommand [...]\n"),
            "{output}"
        );
        assert_eq!(output.matches("unknown command").count(), 1);
    }

    #[test]
    fn test_continue_on_error() {
        let main = tree().on_error(ErrorPolicy::ContinueOnError);
        let (ctx, buffer, exits) = recording_context();
        assert!(main.run(&ctx, &["bob"], &[]).is_ok());
        assert!(buffer.take().starts_with("main: bob: unknown command\n"));

        main.run(&ctx, &["foo", "fatal"], &[]).unwrap();
        assert_eq!(buffer.contents(), "fatal error\n");
        assert!(exits.lock().is_empty());
    }

    #[test]
    fn test_execution_errors_are_not_printed() {
        let main = tree();
        let (ctx, buffer) = context();
        match main.run(&ctx, &["foo", "fatal"], &[]) {
            Err(Error::Execution(err)) => assert_eq!(err.to_string(), "fatal error"),
            other => panic!("Expected Execution, got: {other:?}"),
        }
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_sub_command_required() {
        let main = tree();
        let (ctx, buffer) = context();
        let err = main.run(&ctx, &[] as &[&str], &[]).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "main: sub command required {bar, foo, help}");
        assert!(buffer
            .contents()
            .starts_with("main: sub command required {bar, foo, help}\nUsage: main"));
    }

    #[test]
    fn test_flag_error_renders_help_for_failing_command() {
        let main = Command::new("main")
            .flags(MainFlags::default())
            .subcommand(bar().on_error(ErrorPolicy::custom(|_, _, err| Err(err))));
        let (ctx, buffer) = context();
        let err = main.run(&ctx, &["bar", "-f", "subbar"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "main bar: flag provided but not defined: -f");
        insta::assert_snapshot!(buffer.contents(), @r"
        main bar: flag provided but not defined: -f
        Usage: bar [--name=BAR_NAME] [--value=V] subcommand [...]
            --name=BAR_NAME    name of bar
            --value=V          set the value of v [17]

        Available sub commands:
          subbar [--name=BAR_NAME] ...
            this is the subbar function
        ");
    }

    #[test]
    fn test_help_command() {
        let main = tree();
        let (ctx, buffer) = context();
        main.run(&ctx, &["--name", "foo", "help"], &[]).unwrap();
        insta::assert_snapshot!(buffer.contents(), @r"
        Usage: main [--name=NAME] subcommand [...]
            This is the description of the main command.
            It has multiple lines.

            --name=NAME    add the name [foo]

        Available sub commands:
          bar [--name=BAR_NAME] [--value=V] WORD ...
            execute bar and sub commands

          foo [-n=VALUE] [--name=VALUE] arg0
            description of foo

          help [command ...]
            display help
        ");
    }

    #[test]
    fn test_help_for_sub_command() {
        let main = tree();
        let (ctx, buffer) = context();
        main.run(&ctx, &["help", "foo"], &[]).unwrap();
        insta::assert_snapshot!(buffer.contents(), @r"
        Usage: foo [-n=VALUE] [--name=VALUE] arg0
            description of foo

             -n=VALUE        [42]
            --name=VALUE
        ");
    }

    #[test]
    fn test_help_errors() {
        let main = tree();
        let (ctx, _) = context();
        let err = main.run(&ctx, &["help", "foo", "bad"], &[]).unwrap_err();
        assert!(!err.is_usage());
        assert_eq!(err.to_string(), "main foo has no subcommands");

        let err = main.run(&ctx, &["help", "bad"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "main has no subcommand bad");
    }

    #[test]
    fn test_argument_counts() {
        let (ctx, _) = context();
        let cmd = Command::new("test").no_args();
        let err = cmd.run(&ctx, &["arg"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "test: takes no arguments");

        let cmd = Command::new("test").min_args(1).max_args(MaxArgs::AtMost(2));
        let err = cmd.run(&ctx, &[] as &[&str], &[]).unwrap_err();
        assert_eq!(err.to_string(), "test: requires at least 1 arguments");
        let err = cmd.run(&ctx, &["1", "2", "3"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "test: takes no more than 2 arguments");
        assert!(cmd.run(&ctx, &["1", "2"], &[]).is_ok());

        let unbounded = Command::new("test").max_args(MaxArgs::AtMost(0));
        assert!(unbounded.run(&ctx, &["1", "2", "3"], &[]).is_ok());
    }

    #[test]
    fn test_parse_error_goes_to_command_output() {
        let own = Buffer::new();
        let cmd = Command::new("foo")
            .flags(DynamicOptions::new(vec![FlagSpec::value("flag")]))
            .output(own.clone());
        let (ctx, shared) = context();
        assert!(cmd.run(&ctx, &[] as &[&str], &[]).is_ok());

        let err = cmd.run(&ctx, &["-x"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "foo: flag provided but not defined: -x");
        assert!(own.contents().contains("flag provided but not defined"));
        assert!(shared.contents().is_empty());
    }

    #[test]
    fn test_policy_on_distant_ancestor() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let root = Command::new("root")
            .on_error(ErrorPolicy::custom(move |inv, args, err| {
                record.lock().push((inv.path(), args.to_vec()));
                assert!(err.is_usage());
                Ok(())
            }))
            .subcommand(Command::new("a").subcommand(
                Command::new("b").subcommand(Command::new("c").min_args(1).action(|_, _| Ok(()))),
            ));
        let (ctx, buffer) = context();
        assert!(root.run(&ctx, &["a", "b", "c"], &[]).is_ok());
        assert_eq!(*seen.lock(), vec![("root a b c".to_string(), vec![])]);
        assert!(buffer
            .contents()
            .starts_with("root a b c: requires at least 1 arguments\n"));
    }

    #[test]
    fn test_policy_sees_failing_frame_and_args() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let root = Command::new("root")
            .on_error(ErrorPolicy::custom(move |inv, args, err| {
                record.lock().push((inv.path(), args.to_vec(), err.to_string()));
                Ok(())
            }))
            .subcommand(Command::new("mid").subcommand(
                Command::new("leaf").action(|_, _| Err("boom".into())),
            ));
        let (ctx, _) = context();
        root.run(&ctx, &["mid", "leaf", "x"], &[]).unwrap();
        assert_eq!(
            *seen.lock(),
            vec![("root mid leaf".to_string(), vec!["x".to_string()], "boom".to_string())]
        );
    }

    #[test]
    fn test_policy_prints_to_failing_command_output() {
        let own = Buffer::new();
        let root = Command::new("root")
            .on_error(ErrorPolicy::ContinueOnError)
            .subcommand(
                Command::new("leaf")
                    .output(own.clone())
                    .action(|_, _| Err("boom".into())),
            );
        let (ctx, shared) = context();
        root.run(&ctx, &["leaf"], &[]).unwrap();
        assert_eq!(own.contents(), "boom\n");
        assert!(shared.contents().is_empty());
    }

    #[test]
    fn test_only_nearest_policy_fires() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let policy = |name: &'static str| {
            let order = order.clone();
            ErrorPolicy::custom(move |inv, _, err| {
                order.lock().push((name, inv.path()));
                Err(err)
            })
        };
        let root = Command::new("root").on_error(policy("root")).subcommand(
            Command::new("a")
                .on_error(policy("a"))
                .subcommand(Command::new("leaf").action(|_, _| Err("boom".into()))),
        );
        let (ctx, _) = context();
        let err = root.run(&ctx, &["a", "leaf"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(*order.lock(), vec![("a", "root a leaf".to_string())]);

        let err = root.run(&ctx, &["nope"], &[]).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(order.lock().last(), Some(&("root", "root".to_string())));
        assert_eq!(order.lock().len(), 2);
    }

    #[test]
    fn test_min_above_max_rejects_everything() {
        let (ctx, _) = context();
        let cmd = Command::new("odd").min_args(3).max_args(MaxArgs::AtMost(2));
        let err = cmd.run(&ctx, &["1", "2"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "odd: requires at least 3 arguments");
        let err = cmd.run(&ctx, &["1", "2", "3"], &[]).unwrap_err();
        assert_eq!(err.to_string(), "odd: takes no more than 2 arguments");
        assert!(cmd.run(&ctx, &[] as &[&str], &[]).is_err());
    }

    #[test]
    fn test_branch_without_action_or_tokens_is_an_error() {
        let (ctx, _) = context();
        let cmd = Command::new("group").subcommand(Command::new("child"));
        let err = cmd.run(&ctx, &[] as &[&str], &[]).unwrap_err();
        assert_eq!(
            err.usage().and_then(|usage| usage.cause.clone()),
            Some(UsageCause::SubcommandRequired(vec!["child".to_string()]))
        );
    }

    #[test]
    fn test_run_subcommands() {
        let main = tree();
        let (ctx, buffer) = context();
        main.run_subcommands(&ctx, &["help"], &[]).unwrap();
        assert!(buffer
            .take()
            .starts_with("Usage: main [--name=NAME] subcommand [...]"));

        let calls = Arc::new(Mutex::new(0));
        let counted = calls.clone();
        let parent = Command::new("parent")
            .action(move |_, _| {
                *counted.lock() += 1;
                Ok(())
            })
            .subcommand(Command::new("child"));
        let err = parent
            .run_subcommands(&ctx, &[] as &[&str], &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "parent: sub command required {child}");
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_action_forwarding_run_subcommands() {
        let parent = Command::new("p")
            .flags(DynamicOptions::new(vec![
                FlagSpec::value("mode").default_value("fast"),
            ]))
            .action(|inv, args| {
                let target = args.first().cloned().unwrap_or_else(|| "c".to_string());
                Ok(inv.run_subcommands(&[target])?)
            })
            .subcommand(Command::new("c").action(|inv, _| {
                inv.print(format_args!("{} {}\n", inv.path(), show(inv.lookup("p", "mode"))))?;
                Ok(())
            }));
        let (ctx, buffer) = context();
        parent.run(&ctx, &[] as &[&str], &[]).unwrap();
        assert_eq!(buffer.take(), "p c fast\n");

        parent.run(&ctx, &["--mode", "slow"], &[]).unwrap();
        assert_eq!(buffer.take(), "p c slow\n");

        let inner = Command::new("outer")
            .subcommand(Command::new("p").action(|inv, _| Ok(inv.run_subcommands(&["nope".to_string()])?)));
        let err = inner.run(&ctx, &["p"], &[]).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "outer p: nope: unknown command");
    }

    #[test]
    fn test_extra_values() {
        let cmd = Command::new("x").action(|inv, _| {
            assert_eq!(inv.extra::<u32>(), Some(&7));
            assert_eq!(inv.extra::<&str>(), Some(&"db"));
            assert!(inv.extra::<String>().is_none());
            Ok(())
        });
        let (ctx, _) = context();
        cmd.run(&ctx, &[] as &[&str], &[&7u32, &"db"]).unwrap();
    }

    #[test]
    fn test_shared_child_paths() {
        let shared = Arc::new(Command::new("shared").action(|inv, _| {
            inv.print(format_args!("{}\n", inv.usage()))?;
            Ok(())
        }));
        let root = Command::new("root")
            .subcommand(Command::new("one").shared_subcommand(shared.clone()))
            .subcommand(Command::new("two").shared_subcommand(shared));
        let (ctx, buffer) = context();
        root.run(&ctx, &["one", "shared"], &[]).unwrap();
        root.run(&ctx, &["two", "shared", "x"], &[]).unwrap();
        assert_eq!(
            buffer.contents(),
            "Usage: root one shared ...\nUsage: root two shared ...\n"
        );
    }
}
