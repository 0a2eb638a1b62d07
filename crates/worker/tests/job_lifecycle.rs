//! Worker lifecycle integration tests
//!
//! Verifies the scoped acquisition/release contract: the session is closed
//! and the context shut down on every exit path, in that order, exactly
//! once.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;

use cascade_agent::{Agent, AgentError, AgentSession, ConversationFlow, SessionHandle};
use cascade_core::{
    AudioFrame, Channels, LanguageModel, Message, Result as CoreResult, SampleRate, SpeechToText,
    TextToSpeech, TranscriptResult, TurnDecision, TurnDetector, TurnState, VadEvent, VadState,
    VoiceActivityDetector,
};
use cascade_pipeline::CascadingPipeline;
use cascade_worker::{run_until_terminated, ContextState, JobContext, RoomOptions};

struct SilentStt;

#[async_trait]
impl SpeechToText for SilentStt {
    async fn transcribe(&self, _audio: &AudioFrame) -> CoreResult<TranscriptResult> {
        Ok(TranscriptResult::final_text("", 0.0))
    }

    fn transcribe_stream<'a>(
        &'a self,
        _audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = CoreResult<TranscriptResult>> + Send + 'a>> {
        Box::pin(futures::stream::empty())
    }

    fn model_name(&self) -> &str {
        "silent-stt"
    }
}

struct SilentLlm;

#[async_trait]
impl LanguageModel for SilentLlm {
    async fn generate(&self, _messages: &[Message]) -> CoreResult<String> {
        Ok(String::new())
    }

    fn generate_stream<'a>(
        &'a self,
        _messages: &'a [Message],
    ) -> Pin<Box<dyn Stream<Item = CoreResult<String>> + Send + 'a>> {
        Box::pin(futures::stream::empty())
    }

    fn model_name(&self) -> &str {
        "silent-llm"
    }
}

struct SilentTts;

#[async_trait]
impl TextToSpeech for SilentTts {
    async fn synthesize(&self, _text: &str) -> CoreResult<AudioFrame> {
        Ok(AudioFrame::new(
            vec![0.0; 320],
            SampleRate::Hz16000,
            Channels::Mono,
            0,
        ))
    }

    fn synthesize_stream<'a>(
        &'a self,
        _text_stream: Pin<Box<dyn Stream<Item = String> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = CoreResult<AudioFrame>> + Send + 'a>> {
        Box::pin(futures::stream::empty())
    }

    fn model_name(&self) -> &str {
        "silent-tts"
    }
}

struct IdleVad;

impl VoiceActivityDetector for IdleVad {
    fn process_frame(&self, _audio: &AudioFrame) -> VadEvent {
        VadEvent::Silence
    }

    fn speech_probability(&self, _audio: &AudioFrame) -> f32 {
        0.0
    }

    fn reset(&self) {}

    fn state(&self) -> VadState {
        VadState::Idle
    }

    fn threshold(&self) -> f32 {
        0.35
    }

    fn detector_info(&self) -> &str {
        "idle-vad"
    }
}

struct IdleTurn;

impl TurnDetector for IdleTurn {
    fn process(&self, _vad: VadEvent, _transcript: Option<&str>) -> CoreResult<TurnDecision> {
        Ok(TurnDecision {
            state: TurnState::Idle,
            is_turn_complete: false,
            confidence: 0.0,
            silence: Duration::ZERO,
        })
    }

    fn mark_agent_speaking(&self) {}
    fn mark_agent_done(&self) {}
    fn reset(&self) {}

    fn threshold(&self) -> f32 {
        0.8
    }

    fn detector_info(&self) -> &str {
        "idle-turn"
    }
}

/// Agent that counts its hooks and records whether the context was already
/// shut down when the exit hook ran.
struct ProbeAgent {
    ctx: Arc<JobContext>,
    enters: AtomicUsize,
    exits: AtomicUsize,
    ctx_down_at_exit: AtomicBool,
}

impl ProbeAgent {
    fn new(ctx: Arc<JobContext>) -> Self {
        Self {
            ctx,
            enters: AtomicUsize::new(0),
            exits: AtomicUsize::new(0),
            ctx_down_at_exit: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Agent for ProbeAgent {
    fn instructions(&self) -> &str {
        "probe"
    }

    async fn on_enter(&self, _session: &SessionHandle) -> Result<(), AgentError> {
        self.enters.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_exit(&self, _session: &SessionHandle) -> Result<(), AgentError> {
        self.exits.fetch_add(1, Ordering::SeqCst);
        self.ctx_down_at_exit
            .store(self.ctx.is_shutdown(), Ordering::SeqCst);
        Ok(())
    }
}

fn stub_pipeline() -> Arc<CascadingPipeline> {
    Arc::new(
        CascadingPipeline::builder()
            .stt(Arc::new(SilentStt))
            .llm(Arc::new(SilentLlm))
            .tts(Arc::new(SilentTts))
            .vad(Arc::new(IdleVad))
            .turn_detector(Arc::new(IdleTurn))
            .build()
            .expect("all five stages supplied"),
    )
}

fn options() -> RoomOptions {
    RoomOptions {
        room_id: None,
        name: "test room".to_string(),
        playground: false,
    }
}

fn probe_session(ctx: &Arc<JobContext>) -> (AgentSession, Arc<ProbeAgent>) {
    let agent = Arc::new(ProbeAgent::new(Arc::clone(ctx)));
    let flow = Arc::new(ConversationFlow::new(agent.as_ref()));
    let session = AgentSession::new(agent.clone(), stub_pipeline(), flow);
    (session, agent)
}

#[tokio::test]
async fn termination_signal_releases_session_then_context() {
    let ctx = Arc::new(JobContext::new(options()));
    let (session, agent) = probe_session(&ctx);

    let terminator = Arc::clone(&ctx);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        terminator.terminate();
    });

    run_until_terminated(&ctx, &session).await.unwrap();

    assert!(session.is_closed());
    assert_eq!(ctx.state(), ContextState::Shutdown);

    // Hooks fired exactly once each
    assert_eq!(agent.enters.load(Ordering::SeqCst), 1);
    assert_eq!(agent.exits.load(Ordering::SeqCst), 1);

    // The session closed before the context shut down
    assert!(!agent.ctx_down_at_exit.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failed_start_still_releases_both() {
    let ctx = Arc::new(JobContext::new(options()));
    let (session, agent) = probe_session(&ctx);

    // Force session.start to fail inside the acquisition block
    session.close().await;
    assert_eq!(agent.exits.load(Ordering::SeqCst), 1);

    let result = run_until_terminated(&ctx, &session).await;
    assert!(result.is_err());

    // Both releases still ran
    assert!(session.is_closed());
    assert_eq!(ctx.state(), ContextState::Shutdown);

    // The exit hook did not fire a second time
    assert_eq!(agent.exits.load(Ordering::SeqCst), 1);
    // The enter hook never ran
    assert_eq!(agent.enters.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_release_is_safe() {
    let ctx = Arc::new(JobContext::new(options()));
    let (session, agent) = probe_session(&ctx);

    let terminator = Arc::clone(&ctx);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        terminator.terminate();
    });

    run_until_terminated(&ctx, &session).await.unwrap();

    // Releasing again is a no-op on both sides
    session.close().await;
    ctx.shutdown().await;

    assert_eq!(agent.exits.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.state(), ContextState::Shutdown);
}
