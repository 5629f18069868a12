use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::output::Output;

type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

fn exit_process(code: i32) {
    std::process::exit(code)
}

/// Process-level collaborators shared by every command in a run.
///
/// It supplies the output sink used when no command in the invocation chain
/// sets one. [`ErrorPolicy::ExitOnError`] terminates through its exit hook.
/// Long-running actions poll [`Context::is_cancelled`]; clones share the flag.
///
/// [`ErrorPolicy::ExitOnError`]: crate::commands::policy::ErrorPolicy::ExitOnError
#[derive(Clone)]
pub struct Context {
    output: Output,
    exit: ExitHook,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A context writing to stderr and exiting the process on request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: Output::stderr(),
            exit: Arc::new(exit_process),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Into<Output>) -> Self {
        self.output = output.into();
        self
    }

    /// Replace the process exit, e.g. to observe exits in tests.
    #[must_use]
    pub fn with_exit(mut self, exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit = Arc::new(exit);
        self
    }

    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn exit(&self, code: i32) {
        (self.exit)(code);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("output", &self.output)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
