use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::commands::error::Error;
use crate::commands::invocation::Invocation;

/// Custom error handler: receives the failing command's frame, its
/// arguments and the error, and decides what its `run` returns.
pub type Handler =
    Arc<dyn Fn(&Invocation<'_>, &[String], Error) -> Result<(), Error> + Send + Sync>;

/// What a command does with an error raised at or below it.
///
/// The nearest policy on the chain from the failing command up is applied,
/// and only that one; what it returns is what `run` returns.
///
/// Usage errors are already on the output when a policy sees them, so the
/// built-in policies only print execution errors.
#[derive(Clone)]
pub enum ErrorPolicy {
    /// Print the error and exit with status 1 through the context
    ExitOnError,
    /// Print the error and report success
    ContinueOnError,
    Custom(Handler),
}

impl ErrorPolicy {
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[String], Error) -> Result<(), Error> + Send + Sync + 'static,
    {
        ErrorPolicy::Custom(Arc::new(handler))
    }

    pub(crate) fn handle(
        &self,
        inv: &Invocation<'_>,
        args: &[String],
        err: Error,
    ) -> Result<(), Error> {
        match self {
            ErrorPolicy::ExitOnError => {
                report(inv, &err);
                inv.context().exit(1);
                Ok(())
            }
            ErrorPolicy::ContinueOnError => {
                report(inv, &err);
                Ok(())
            }
            ErrorPolicy::Custom(handler) => handler(inv, args, err),
        }
    }
}

fn report(inv: &Invocation<'_>, err: &Error) {
    if err.is_usage() {
        return;
    }
    if let Err(e) = inv.print(format_args!("{err}\n")) {
        warn!("Unable to report error for {}: {e}", inv.path());
    }
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::ExitOnError => write!(f, "ExitOnError"),
            ErrorPolicy::ContinueOnError => write!(f, "ContinueOnError"),
            ErrorPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
