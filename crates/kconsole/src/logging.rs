use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "KCONSOLE_LOG";
const DEFAULT_LEVEL: &str = "warn";

/// Pick the filter: an explicit `--log-level` wins over `KCONSOLE_LOG`.
pub fn filter(level: Option<&str>) -> EnvFilter {
    let requested = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_env(LOG_ENV).ok(),
    };
    requested.unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}

/// Install the global subscriber. Logs go to stderr so they never mix with
/// data written to stdout.
pub fn init(level: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
