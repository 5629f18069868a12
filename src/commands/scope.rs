use std::io::Write;

use parking_lot::Mutex;
use serde_json::Value;

use crate::options::{FlagInfo, Options, OptionsError};

/// How a command holds its option set.
#[derive(Default)]
pub(crate) enum Binding {
    #[default]
    None,
    /// A prototype cloned fresh for every parse
    Defaults {
        prototype: Box<dyn Options>,
        last: Mutex<Option<Box<dyn Options>>>,
    },
    /// Parsed in place, so values stick between runs
    Persistent(Mutex<Box<dyn Options>>),
}

impl Binding {
    pub(crate) fn defaults(options: impl Options) -> Self {
        Binding::Defaults {
            prototype: Box::new(options),
            last: Mutex::new(None),
        }
    }

    pub(crate) fn persistent(options: impl Options) -> Self {
        Binding::Persistent(Mutex::new(Box::new(options)))
    }

    /// Parse `args` into this binding, returning the invocation's snapshot
    /// and the positional tokens left over.
    pub(crate) fn parse(
        &self,
        args: &[String],
        diagnostics: &mut dyn Write,
    ) -> Result<(Scope<'_>, Vec<String>), OptionsError> {
        match self {
            Binding::None => Ok((Scope::Empty, args.to_vec())),
            Binding::Defaults { prototype, last } => {
                let mut options = prototype.clone_options();
                let rest = options.parse(args, diagnostics)?;
                *last.lock() = Some(options.clone_options());
                Ok((Scope::Ephemeral(options), rest))
            }
            Binding::Persistent(store) => {
                let rest = store.lock().parse(args, diagnostics)?;
                Ok((Scope::Persistent(store), rest))
            }
        }
    }

    /// Run `f` on the current value: the persistent store, the last parsed
    /// snapshot, or the prototype if nothing was parsed yet.
    pub(crate) fn with_current<R>(&self, f: impl FnOnce(&dyn Options) -> R) -> Option<R> {
        match self {
            Binding::None => None,
            Binding::Defaults { prototype, last } => match last.lock().as_deref() {
                Some(options) => Some(f(options)),
                None => Some(f(prototype.as_ref())),
            },
            Binding::Persistent(store) => Some(f(store.lock().as_ref())),
        }
    }

    pub(crate) fn flags(&self) -> Vec<FlagInfo> {
        self.with_current(|options| options.flags())
            .unwrap_or_default()
    }
}

/// Option values seen by one invocation frame.
pub(crate) enum Scope<'a> {
    Empty,
    Ephemeral(Box<dyn Options>),
    Persistent(&'a Mutex<Box<dyn Options>>),
}

impl Scope<'_> {
    pub(crate) fn lookup(&self, field: &str) -> Option<Value> {
        self.with(|options| options.lookup(field)).flatten()
    }

    pub(crate) fn options<T: Clone + 'static>(&self) -> Option<T> {
        self.with(|options| options.as_any().downcast_ref::<T>().cloned())
            .flatten()
    }

    fn with<R>(&self, f: impl FnOnce(&dyn Options) -> R) -> Option<R> {
        match self {
            Scope::Empty => None,
            Scope::Ephemeral(options) => Some(f(options.as_ref())),
            Scope::Persistent(store) => Some(f(store.lock().as_ref())),
        }
    }
}
