use tracing_subscriber::EnvFilter;

/// Variable holding the log filter, checked before `RUST_LOG`.
pub const ENV_LOG: &str = "D1_LOG";

const DEFAULT_FILTER: &str = "info";

/// Installs a `fmt` subscriber filtered by `D1_LOG`, then `RUST_LOG`,
/// defaulting to `info`.
///
/// Safe to call more than once; only the first call installs a subscriber,
/// and an existing global subscriber set by the application is kept.
pub fn init_tracing() {
    let filter = std::env::var(ENV_LOG)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
