use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT_LOGGING: Once = Once::new();

/// Install the global subscriber for the binary. Safe to call more than once.
///
/// Filter comes from `RUST_LOG`, then `SQLVIZ_LOG`, then `info`. Output goes
/// to stderr so stdout stays free for JSON results.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(std::env::var("SQLVIZ_LOG").unwrap_or_else(|_| "info".into())))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        // Another subscriber may already be installed (e.g. by a host process)
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init();
    });
}
