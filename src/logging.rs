//! Logger setup
//!
//! `RUST_LOG` always wins; otherwise the level is `info`, or `debug` when
//! debug logging was requested on the command line or in the config file.

use env_logger::{Builder, Env};

fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install the global logger. Later calls are ignored.
pub fn init(debug: bool) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter(debug)));
    builder.format_timestamp_millis();
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
