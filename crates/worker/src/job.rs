//! Worker job lifecycle
//!
//! Runs a session entrypoint under a managed lifecycle: builds the runtime,
//! installs the signal handlers that fire the job context's termination
//! signal, and reports the entrypoint's outcome.

use std::future::Future;
use std::sync::Arc;

use crate::JobContext;

/// A worker job: an entrypoint future tied to a job context factory.
pub struct WorkerJob<E, C> {
    entrypoint: E,
    jobctx: C,
}

impl<E, C, F> WorkerJob<E, C>
where
    E: FnOnce(Arc<JobContext>) -> F,
    C: FnOnce() -> JobContext,
    F: Future<Output = anyhow::Result<()>>,
{
    pub fn new(entrypoint: E, jobctx: C) -> Self {
        Self { entrypoint, jobctx }
    }

    /// Run the job to completion.
    ///
    /// Blocks the calling thread. Ctrl-C or SIGTERM fires the context's
    /// termination signal; the entrypoint is expected to release its
    /// resources and return once the signal lands.
    pub fn start(self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            let ctx = Arc::new((self.jobctx)());

            let signal_ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                shutdown_signal().await;
                signal_ctx.terminate();
            });

            let result = (self.entrypoint)(ctx).await;
            match &result {
                Ok(()) => tracing::info!("worker job complete"),
                Err(e) => tracing::error!(error = %e, "worker job failed"),
            }
            result
        })
    }
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
