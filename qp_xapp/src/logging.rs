//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "qp_xapp=info,qp_forecast=info";

/// Initialize the tracing subscriber.
///
/// Reads the `QP_LOG` environment variable, e.g. `QP_LOG=qp_xapp=debug`.
/// Falls back to `qp_xapp=info,qp_forecast=info` when unset or invalid.
/// Output goes to stderr so stdout stays free for outbound payloads.
/// Calling this more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("QP_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .init();
    });
}
