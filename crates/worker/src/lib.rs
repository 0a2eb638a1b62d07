//! Worker job and room context for the cascading voice agent
//!
//! The worker owns the outermost lifecycle: it builds the session from
//! settings, joins the room through the job context, hands control to the
//! pipeline, and releases everything when the termination signal fires.

mod context;
mod job;

pub use context::{ContextState, JobContext, RoomOptions};
pub use job::WorkerJob;

use std::sync::Arc;

use cascade_agent::{Agent, AgentSession, AutomotiveAssistant, ConversationFlow};
use cascade_config::Settings;
use cascade_pipeline::CascadingPipeline;

use thiserror::Error;

/// Worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("context is not connected")]
    NotConnected,

    #[error("context is already connected")]
    AlreadyConnected,

    #[error("room endpoints already taken")]
    RoomTaken,

    #[error("context has been shut down")]
    Shutdown,
}

/// Session entrypoint run by the worker job.
///
/// Builds the agent, conversation flow, and pipeline from settings, then
/// drives the session against the job context.
pub async fn start_session(ctx: Arc<JobContext>, settings: Settings) -> anyhow::Result<()> {
    let agent: Arc<dyn Agent> = Arc::new(AutomotiveAssistant::new());
    let flow = Arc::new(ConversationFlow::new(agent.as_ref()));
    let pipeline = Arc::new(CascadingPipeline::from_settings(&settings)?);

    let summary = pipeline.stage_summary();
    tracing::info!(
        stt = %summary.stt_model,
        llm = %summary.llm_model,
        tts = %summary.tts_model,
        vad_threshold = summary.vad_threshold,
        turn_threshold = summary.turn_threshold,
        "pipeline assembled"
    );

    let session = AgentSession::new(agent, pipeline, flow);
    run_until_terminated(&ctx, &session).await
}

/// Drive one session against the context with scoped acquisition/release.
///
/// Connect, start, and wait for the termination signal; whatever happens on
/// that path, close the session and then shut the context down, in that
/// order, exactly once each. The first error (if any) is reported after the
/// releases have run.
pub async fn run_until_terminated(
    ctx: &JobContext,
    session: &AgentSession,
) -> anyhow::Result<()> {
    let result = async {
        ctx.connect().await?;
        let room = ctx.room()?;
        session.start(room).await?;
        // Keep the session running until externally terminated
        ctx.terminated().await;
        Ok::<(), anyhow::Error>(())
    }
    .await;

    session.close().await;
    ctx.shutdown().await;

    result
}
