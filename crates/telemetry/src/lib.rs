//! Tracing subscriber bootstrap.

use tracing_subscriber::{fmt, EnvFilter};
use vidly_kernel::settings::{LogFormat, TelemetrySettings};

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Build the filter from `RUST_LOG`, falling back to the configured directive.
fn filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(settings.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    })
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let builder = fmt().with_env_filter(filter(settings)).with_target(true);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if installed.is_err() {
        tracing::debug!(target: "vidly-telemetry", "subscriber already installed");
        return Ok(());
    }

    tracing::info!(
        target: "vidly-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}
