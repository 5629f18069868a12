use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::options::OptionsError;

/// Boxed error returned by command actions
pub type ActionError = Box<dyn StdError + Send + Sync>;

/// Why a command line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageCause {
    #[error("takes no arguments")]
    NoArguments,
    #[error("requires at least {0} arguments")]
    TooFew(usize),
    #[error("takes no more than {0} arguments")]
    TooMany(usize),
    #[error("{0}: unknown command")]
    UnknownCommand(String),
    #[error("sub command required {{{}}}", .0.join(", "))]
    SubcommandRequired(Vec<String>),
    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// The command line did not match what a command accepts.
///
/// `command` is the space-joined path of the command that rejected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub command: String,
    pub cause: Option<UsageCause>,
}

impl UsageError {
    pub fn new(command: impl Into<String>, cause: impl Into<Option<UsageCause>>) -> Self {
        Self {
            command: command.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.command),
            None => write!(f, "{}: incorrect usage", self.command),
        }
    }
}

impl StdError for UsageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Errors leaving [`Command::run`](super::command::Command::run)
#[derive(Error, Debug)]
pub enum Error {
    /// Detected by the dispatcher; already reported to the command's output
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// Returned by an action
    #[error("{0}")]
    Execution(ActionError),
}

impl Error {
    /// Classify an error returned by an action.
    ///
    /// Engine errors forwarded by the action (for instance the result of
    /// `run_subcommands`) keep their kind; anything else is an execution error.
    #[must_use]
    pub fn from_action(err: ActionError) -> Self {
        let err = match err.downcast::<Error>() {
            Ok(err) => return *err,
            Err(err) => err,
        };
        match err.downcast::<UsageError>() {
            Ok(usage) => Error::Usage(*usage),
            Err(err) => Error::Execution(err),
        }
    }

    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    #[must_use]
    pub fn usage(&self) -> Option<&UsageError> {
        match self {
            Error::Usage(usage) => Some(usage),
            Error::Execution(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_display() {
        let mut err = UsageError::new("UE", UsageCause::UnknownCommand("xyzzy".to_string()));
        assert_eq!(err.to_string(), "UE: xyzzy: unknown command");
        err.cause = None;
        assert_eq!(err.to_string(), "UE: incorrect usage");
    }

    #[test]
    fn test_cause_messages() {
        let causes = [
            (UsageCause::NoArguments, "takes no arguments"),
            (UsageCause::TooFew(1), "requires at least 1 arguments"),
            (UsageCause::TooMany(2), "takes no more than 2 arguments"),
            (
                UsageCause::SubcommandRequired(vec!["bar".into(), "foo".into(), "help".into()]),
                "sub command required {bar, foo, help}",
            ),
            (
                UsageCause::Options(OptionsError::Undefined("-f".into())),
                "flag provided but not defined: -f",
            ),
        ];
        for (cause, want) in causes {
            assert_eq!(cause.to_string(), want);
        }
    }

    #[test]
    fn test_from_action_keeps_engine_errors() {
        let forwarded: ActionError = Box::new(Error::Usage(UsageError::new("a b", None)));
        assert!(Error::from_action(forwarded).is_usage());

        let usage: ActionError = Box::new(UsageError::new("a", UsageCause::NoArguments));
        match Error::from_action(usage) {
            Error::Usage(err) => assert_eq!(err.to_string(), "a: takes no arguments"),
            other => panic!("Expected Usage, got: {other:?}"),
        }

        let failed = Error::from_action("fatal error".into());
        assert!(!failed.is_usage());
        assert_eq!(failed.to_string(), "fatal error");
    }
}
