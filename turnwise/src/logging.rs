//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber.
///
/// Level comes from `RUST_LOG` and defaults to `info`. Output goes to
/// stderr so stdout carries only channel frames. Later calls are no-ops.
pub fn init_tracing(json: bool) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter);
        let _ = if json {
            builder.json().with_current_span(false).try_init()
        } else {
            builder.with_target(false).try_init()
        };
    });
}
