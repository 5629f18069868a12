use std::fs::File;
use std::io::{self, Write};
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

struct CmdtreeLogger {
    sink: Mutex<Box<dyn Write + Send>>,
    filter: LevelFilter,
    start: Instant,
}

impl Log for CmdtreeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        let _ = writeln!(
            self.sink.lock(),
            "[{elapsed:.3}s] [{}] {} - {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = self.sink.lock().flush();
    }
}

/// Level from a `RUST_LOG` style value; only a plain level name is understood.
fn filter_from(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

/// Initialize the global logger, writing to `log_file` or else to stderr.
///
/// The level comes from `RUST_LOG`, defaulting to `info` for a log file and
/// `warn` for stderr.
///
/// # Errors
///
/// Returns an error if a logger was already installed.
pub fn init(log_file: Option<File>) -> Result<(), SetLoggerError> {
    let default = if log_file.is_some() {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    let filter = filter_from(std::env::var("RUST_LOG").ok().as_deref(), default);
    let sink: Box<dyn Write + Send> = match log_file {
        Some(file) => Box::new(file),
        None => Box::new(io::stderr()),
    };

    let logger = CmdtreeLogger {
        sink: Mutex::new(sink),
        filter,
        start: Instant::now(),
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}
