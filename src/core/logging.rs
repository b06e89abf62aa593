//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// grassfield::core::logging::init();
/// log::info!("Field tool started");
/// ```
pub fn init() {
    // try_init so repeated calls (tests, doctests) don't panic
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).format_timestamp_millis().try_init();
}
