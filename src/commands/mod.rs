//! The command tree and its resolution engine
//!
//! A tree of [`Command`](command::Command) nodes is built once and then run
//! against argument vectors. Running a node parses its options, checks the
//! number of positional arguments, and either calls the node's action or
//! hands the remaining arguments to the child named by the first one.
//!
//! Errors detected while resolving are [`UsageError`](error::UsageError)s;
//! they are printed with help where they are found. Errors returned by
//! actions are execution errors and are left to the caller or to an
//! [`ErrorPolicy`](policy::ErrorPolicy) on the path.

pub mod command;
pub mod error;
pub mod help;
pub mod invocation;
pub mod policy;
pub(crate) mod scope;
