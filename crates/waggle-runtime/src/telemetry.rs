//! Log and span output for waggle processes.
//!
//! [`init_tracing`] installs the global subscriber once at startup. Engine
//! ticks log at `debug`; the default `info` filter keeps decisions,
//! preemptions, arrivals and failures.
//!
//! Environment:
//!
//! - `RUST_LOG` – filter directives, `info` when unset.
//! - `WAGGLE_LOG_FORMAT` – `json` for newline-delimited JSON, anything else
//!   for the compact console format.
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` – collector base URL; spans are exported
//!   over OTLP/HTTP only when this is set and non-empty.
//!
//! ```rust,no_run
//! let _guard = waggle_runtime::init_tracing("waggle");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const TRACER_NAME: &str = "waggle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Install the global subscriber.
///
/// Hold the returned guard in `main`; dropping it flushes exported spans.
/// Calling this twice in one process panics inside `tracing-subscriber`.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_env_value(std::env::var("WAGGLE_LOG_FORMAT").ok().as_deref());
    let provider = otlp_endpoint(std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok())
        .and_then(|endpoint| build_provider(service_name, endpoint));

    let spans = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(TRACER_NAME)));
    let json = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());
    let compact = (format == LogFormat::Compact).then(|| tracing_subscriber::fmt::layer().compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(spans)
        .with(json)
        .with(compact)
        .init();

    TracerProviderGuard(provider)
}

/// Flushes and shuts down the span exporter when dropped.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// Whether spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        let Some(provider) = self.0.take() else {
            return;
        };
        if let Err(e) = provider.shutdown() {
            eprintln!("[waggle] span exporter shutdown failed: {e}");
        }
    }
}

fn otlp_endpoint(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn build_provider(service_name: &str, endpoint: String) -> Option<SdkTracerProvider> {
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("[waggle] OTLP exporter unavailable, logging to console only: {e}");
            return None;
        }
    };

    // The CLI starts tracing before its tokio runtime exists; the simple
    // exporter spawns no tasks.
    Some(
        SdkTracerProvider::builder()
            .with_resource(Resource::builder().with_service_name(service_name.to_string()).build())
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_compact() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
    }

    #[test]
    fn blank_endpoint_disables_export() {
        assert_eq!(otlp_endpoint(None), None);
        assert_eq!(otlp_endpoint(Some("   ".into())), None);
        assert_eq!(
            otlp_endpoint(Some(" http://localhost:4318 ".into())).as_deref(),
            Some("http://localhost:4318")
        );
    }

    #[test]
    fn empty_guard_drops_quietly() {
        let guard = TracerProviderGuard(None);
        assert!(!guard.is_exporting());
        drop(guard);
    }
}
