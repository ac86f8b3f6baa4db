use log::LevelFilter;
use std::env;

/// Environment variable that switches the default level to `Debug`.
pub const DEBUG_ENV_VAR: &str = "CRYPTICS_DEBUG";

/// Initialize logging for the CLI.
///
/// Level is `Debug` when `debug_enabled`, `Info` otherwise; `RUST_LOG` overrides
/// either if set. Safe to call more than once (later calls are no-ops).
pub fn init_logger(debug_enabled: bool) {
    let level = if debug_enabled { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    // Let RUST_LOG override our defaults if explicitly set
    if let Ok(spec) = env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    if builder.try_init().is_ok() {
        log::debug!("logger initialized at {level:?} level");
    }
}

/// True when [`DEBUG_ENV_VAR`] is set.
#[must_use]
pub fn debug_requested() -> bool {
    env::var_os(DEBUG_ENV_VAR).is_some()
}
