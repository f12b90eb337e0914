// Logging setup. Output goes to stderr so stdout stays clean for table output,
// or to a file when PDFTABLE_LOG_FILE is set.
use std::fs::OpenOptions;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `pdftable=debug`.
pub const LOG_ENV: &str = "PDFTABLE_LOG";
/// Append log lines to this path instead of stderr.
pub const LOG_FILE_ENV: &str = "PDFTABLE_LOG_FILE";

const DEFAULT_FILTER: &str = "warn";

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber. Safe to call more than once; only the first
/// call has any effect, and a subscriber installed by someone else is left in
/// place.
pub fn init() {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        let log_file = std::env::var(LOG_FILE_ENV).ok().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

        // Err means a global subscriber already exists
        let _ = match log_file {
            Some(file) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init(),
            None => builder.with_writer(std::io::stderr).try_init(),
        };
    });
}
