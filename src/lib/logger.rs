/// Initialize the logger.
///
/// Logs go to stderr so they never mix with the table on stdout. The level
/// defaults to `warn` and can be changed through `RUST_LOG`.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .format_timestamp_secs()
        .init();
}
