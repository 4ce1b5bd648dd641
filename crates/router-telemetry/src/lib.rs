//! Structured logging for the router
//!
//! Every attempt in the routing fallback loop logs provider/model/latency/
//! classified error at `info`/`warn`; breaker transitions log at `warn`.
//! Request/response bodies are never logged.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber.
///
/// `log_filter` is an `EnvFilter` directive string (e.g. `"info"` or
/// `"router_routing=debug,info"`); an invalid directive falls back to
/// `"info"`. `json` selects the JSON formatter (for log aggregators) over
/// the human-readable one (for local development).
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(log_filter: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    }

    Ok(())
}
