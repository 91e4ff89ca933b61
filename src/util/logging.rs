use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing/logging based on `RUST_LOG`, defaulting to `info`.
///
/// Set `LOG_FORMAT=json` for one JSON object per event.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
