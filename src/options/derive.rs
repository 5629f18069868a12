//! [`Options`] for `clap` derived structs
//!
//! ```
//! use clap::Args;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Args, Serialize, Deserialize, Clone, Default)]
//! struct MainFlags {
//!     /// Name to greet
//!     #[arg(long, value_name = "NAME")]
//!     name: String,
//!     #[arg(short, long)]
//!     verbose: bool,
//! }
//!
//! let cmd = cmdtree::Command::new("main").flags(MainFlags::default());
//! assert_eq!(cmd.lookup("verbose"), Some(serde_json::Value::Bool(false)));
//! ```
//!
//! Scope lookups use the serde field names, so a struct should keep its clap
//! ids and serde names in step (the derive defaults already do).

use std::any::Any;
use std::collections::HashSet;
use std::io::Write;

use clap::parser::ValueSource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{FlagInfo, Options, OptionsError, flag_infos, options_error, parser, rest};

fn augmented<T: clap::Args>() -> clap::Command {
    T::augment_args(clap::Command::new("options"))
}

impl<T> Options for T
where
    T: clap::Args + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn parse(
        &mut self,
        args: &[String],
        diagnostics: &mut dyn Write,
    ) -> Result<Vec<String>, OptionsError> {
        let cmd = parser(augmented::<T>());
        let ids: HashSet<String> = cmd
            .get_arguments()
            .map(|arg| arg.get_id().as_str().to_string())
            .collect();
        let matches = cmd
            .try_get_matches_from(args)
            .map_err(|err| options_error(&err, diagnostics))?;

        let before = serde_json::to_value(&*self).map_err(|e| OptionsError::Update(e.to_string()))?;
        self.update_from_arg_matches(&matches)
            .map_err(|err| options_error(&err, diagnostics))?;

        // clap resets every field it knows about; only values given on this
        // command line may replace what the struct held before.
        let mut after =
            serde_json::to_value(&*self).map_err(|e| OptionsError::Update(e.to_string()))?;
        if let (Value::Object(before), Value::Object(after)) = (before, &mut after) {
            for (field, value) in before {
                let given = ids.contains(&field)
                    && matches.value_source(&field) == Some(ValueSource::CommandLine);
                if !given {
                    after.insert(field, value);
                }
            }
        }
        *self = serde_json::from_value(after).map_err(|e| OptionsError::Update(e.to_string()))?;

        Ok(rest(&matches))
    }

    fn lookup(&self, field: &str) -> Option<Value> {
        serde_json::to_value(self).ok()?.get(field).cloned()
    }

    fn flags(&self) -> Vec<FlagInfo> {
        flag_infos(&augmented::<T>())
    }

    fn clone_options(&self) -> Box<dyn Options> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
