use crate::error::AppError;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info,sqlx=warn,warp=info";

/// Keeps the span exporter alive, flushes it on drop.
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            for res in provider.force_flush() {
                if let Err(e) = res {
                    eprintln!("Failed flushing spans: {}", e);
                }
            }
        }
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default filter. With `otel_stdout` all spans are
/// additionally exported to stdout through OpenTelemetry.
pub fn init_tracing(otel_stdout: bool) -> Result<TracingGuard, AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let provider = otel_stdout.then(|| {
        TracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build()
    });
    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("elevator")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(otel_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(TracingGuard { provider })
}
