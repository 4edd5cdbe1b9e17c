//! Log setup for the `realm` binary.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! The filter comes from `REALM_LOG` (same syntax as `RUST_LOG`) and
//! defaults to `warn`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "REALM_LOG";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
