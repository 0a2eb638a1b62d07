//! Cascading voice agent worker entry point
//!
//! Loads settings, initializes tracing and metrics, and starts a worker job
//! that joins a room and keeps one agent session alive until the process is
//! terminated.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use cascade_config::{load_settings, Settings};
use cascade_worker::{start_session, JobContext, RoomOptions, WorkerJob};

fn main() -> anyhow::Result<()> {
    let env = std::env::var("CASCADE_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!("Warning: failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&settings);

    tracing::info!(
        environment = ?settings.environment,
        config = env.as_deref().unwrap_or("default"),
        "Starting cascade agent worker v{}",
        env!("CARGO_PKG_VERSION")
    );

    let room_settings = settings.room.clone();
    let entry_settings = settings.clone();

    let job = WorkerJob::new(
        move |ctx| async move {
            if entry_settings.observability.metrics_enabled {
                init_metrics(&entry_settings);
            }
            start_session(ctx, entry_settings).await
        },
        move || JobContext::new(RoomOptions::from_settings(&room_settings)),
    );

    job.start()
}

/// Initialize tracing from settings, honoring `RUST_LOG` when set
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cascade={}", settings.observability.log_level).into());

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}

/// Install the Prometheus exporter. Failures are logged, never fatal.
fn init_metrics(settings: &Settings) {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.observability.metrics_port));
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(port = settings.observability.metrics_port, "metrics exporter listening")
        },
        Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
    }
}
