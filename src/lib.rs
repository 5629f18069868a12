//! A command-tree dispatcher
//!
//! Programs register a tree of named [`Command`]s, each with its own option
//! set, help text and argument count limits, and route an argument vector to
//! the command it names. Options are parsed at every level on the way down
//! and stay visible to the commands below through the [`Invocation`] chain.
//!
//! [`split_command`] breaks a flat argument list into several invocations on
//! a delimiter.

pub mod commands;
pub mod context;
pub mod options;
pub mod output;
pub mod split;

pub use commands::command::{Action, Command, MaxArgs};
pub use commands::error::{ActionError, Error, UsageCause, UsageError};
pub use commands::help::help_command;
pub use commands::invocation::Invocation;
pub use commands::policy::ErrorPolicy;
pub use context::Context;
pub use options::{FlagInfo, Options, OptionsError};
pub use output::{Buffer, Output};
pub use split::{Delim, split_command};
