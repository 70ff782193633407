//! Structured logging with `tracing`.
//!
//! The filter honours `RUST_LOG` when set; otherwise the configured level
//! applies. Output goes to stderr, either compact human-readable lines or
//! newline-delimited JSON.

use tracing_subscriber::EnvFilter;

/// Build the env filter, preferring `RUST_LOG` over `level`.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global tracing subscriber.
///
/// Call once at application startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Minimum log level when `RUST_LOG` is unset (e.g. `"info"`).
/// * `json` - Emit JSON lines instead of compact text.
pub fn init_subscriber(level: &str, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails only when a global subscriber is already set
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}
