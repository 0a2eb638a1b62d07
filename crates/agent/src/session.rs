//! Agent session driver
//!
//! Sequences the cascading pipeline for one conversation:
//!
//! ```text
//! room audio -> VAD -> STT -> turn detector -> LLM -> TTS -> room audio
//! ```
//!
//! The session owns no transport. It receives room audio through a channel
//! pair supplied at start and publishes synthesized speech back through the
//! same pair. Closing is idempotent and runs the agent's exit hook exactly
//! once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};

use cascade_core::{AudioFrame, VadEvent};
use cascade_pipeline::CascadingPipeline;

use crate::agent::Agent;
use crate::conversation::ConversationFlow;
use crate::AgentError;

/// Interim transcript cadence while the user is speaking, in speech frames.
/// At 20ms frames this is roughly once per second.
const PARTIAL_EVERY_FRAMES: usize = 50;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started
    Idle,
    /// Listening for user speech
    Listening,
    /// Running STT/LLM for a completed turn
    Processing,
    /// Publishing synthesized speech
    Speaking,
    /// Closed
    Ended,
}

/// Session events, broadcast to subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started {
        session_id: String,
    },
    StateChanged {
        old: SessionState,
        new: SessionState,
    },
    PartialTranscript {
        text: String,
    },
    FinalTranscript {
        text: String,
    },
    Speaking {
        text: String,
    },
    BargedIn,
    Error {
        message: String,
    },
    Ended {
        reason: String,
    },
}

/// Audio endpoints connecting a session to a room.
///
/// `incoming` carries participant audio toward the session; `outgoing`
/// carries synthesized agent speech toward the room.
pub struct RoomIo {
    pub incoming: mpsc::Receiver<AudioFrame>,
    pub outgoing: mpsc::Sender<AudioFrame>,
}

struct SessionInner {
    id: String,
    agent: Arc<dyn Agent>,
    pipeline: Arc<CascadingPipeline>,
    flow: Arc<ConversationFlow>,
    state: RwLock<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    shutdown_tx: broadcast::Sender<()>,
    outgoing: RwLock<Option<mpsc::Sender<AudioFrame>>>,
    started: AtomicBool,
    closed: AtomicBool,
    enter_fired: AtomicBool,
    exit_fired: AtomicBool,
    barge_in: AtomicBool,
    out_sequence: AtomicU64,
}

impl SessionInner {
    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn set_state(&self, new: SessionState) {
        let old = {
            let mut state = self.state.write();
            let old = *state;
            *state = new;
            old
        };
        if old != new {
            self.emit(SessionEvent::StateChanged { old, new });
        }
    }

    fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Synthesize `text` and publish it to the room in 20ms frames.
    ///
    /// Records the assistant turn on completion. A barge-in flag raised
    /// while publishing cancels the remainder of the utterance.
    async fn say(&self, text: &str) -> Result<(), AgentError> {
        let outgoing = self
            .outgoing
            .read()
            .clone()
            .ok_or_else(|| AgentError::Session("no room attached".to_string()))?;

        self.set_state(SessionState::Speaking);
        self.pipeline.turn_detector().mark_agent_speaking();
        self.barge_in.store(false, Ordering::SeqCst);
        self.emit(SessionEvent::Speaking {
            text: text.to_string(),
        });

        let frame = self.pipeline.tts().synthesize(text).await?;
        let stride = frame.sample_rate.frame_size_20ms();
        let mut barged_in = false;

        for chunk in frame.samples.chunks(stride) {
            if self.barge_in.load(Ordering::SeqCst) {
                barged_in = true;
                self.emit(SessionEvent::BargedIn);
                break;
            }
            let sequence = self.out_sequence.fetch_add(1, Ordering::Relaxed);
            let out = AudioFrame::new(chunk.to_vec(), frame.sample_rate, frame.channels, sequence);
            outgoing.send(out).await.map_err(|_| {
                AgentError::Core(cascade_core::Error::Transport(
                    "room audio sink closed".to_string(),
                ))
            })?;
        }

        self.flow.add_assistant_turn(text);
        metrics::counter!("agent_utterances_total").increment(1);
        if barged_in {
            metrics::counter!("agent_barge_ins_total").increment(1);
        }

        self.pipeline.turn_detector().mark_agent_done();
        if !self.closed.load(Ordering::SeqCst) {
            self.set_state(SessionState::Listening);
        }
        Ok(())
    }

    /// Run one completed user turn through the language model and speak the
    /// reply.
    async fn respond(self: &Arc<Self>, text: &str) -> Result<(), AgentError> {
        let started_at = Instant::now();
        self.set_state(SessionState::Processing);

        self.flow.add_user_turn(text);
        let messages = self.flow.messages();
        let reply = self.pipeline.llm().generate(&messages).await?;

        metrics::counter!("session_turns_total").increment(1);
        metrics::histogram!("session_llm_seconds").record(started_at.elapsed().as_secs_f64());

        self.say(&reply).await
    }

    /// Per-frame processing while the session is live
    async fn handle_frame(
        self: &Arc<Self>,
        frame: AudioFrame,
        utterance: &mut Vec<AudioFrame>,
        pending: &mut Option<String>,
    ) -> Result<(), AgentError> {
        match self.state() {
            SessionState::Speaking => {
                // User speech over agent playback cancels the utterance
                let vad = self.pipeline.vad();
                if vad.speech_probability(&frame) >= vad.threshold() {
                    self.barge_in.store(true, Ordering::SeqCst);
                }
                Ok(())
            },
            SessionState::Listening => {
                let event = self.pipeline.vad().process_frame(&frame);

                if event.is_speech() {
                    utterance.push(frame);

                    if utterance.len() % PARTIAL_EVERY_FRAMES == 0 {
                        if let Some(joined) = AudioFrame::concat(utterance) {
                            let partial = self.pipeline.stt().transcribe(&joined).await?;
                            if !partial.is_empty() {
                                self.emit(SessionEvent::PartialTranscript {
                                    text: partial.text.clone(),
                                });
                                *pending = Some(partial.text);
                            }
                        }
                    }
                }

                if matches!(event, VadEvent::SpeechEnd) {
                    if let Some(joined) = AudioFrame::concat(utterance) {
                        let result = self.pipeline.stt().transcribe(&joined).await?;
                        if !result.is_empty() {
                            *pending = Some(result.text);
                        }
                    }
                }

                let decision = self
                    .pipeline
                    .turn_detector()
                    .process(event, pending.as_deref())?;

                if decision.is_turn_complete {
                    utterance.clear();
                    self.pipeline.vad().reset();
                    self.pipeline.turn_detector().reset();

                    if let Some(text) = pending.take() {
                        self.emit(SessionEvent::FinalTranscript { text: text.clone() });

                        // Respond on a separate task so the loop keeps
                        // watching room audio for barge-in.
                        let inner = Arc::clone(self);
                        tokio::spawn(async move {
                            if let Err(e) = inner.respond(&text).await {
                                tracing::warn!(error = %e, "turn response failed");
                                inner.emit(SessionEvent::Error {
                                    message: e.to_string(),
                                });
                                inner.set_state(SessionState::Listening);
                            }
                        });
                    }
                }
                Ok(())
            },
            _ => Ok(()),
        }
    }

    async fn audio_loop(
        inner: Arc<Self>,
        mut incoming: mpsc::Receiver<AudioFrame>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut utterance: Vec<AudioFrame> = Vec::new();
        let mut pending: Option<String> = None;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::debug!(session_id = %inner.id, "audio loop shutting down");
                    break;
                }
                frame = incoming.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = inner.handle_frame(frame, &mut utterance, &mut pending).await {
                            tracing::warn!(error = %e, "frame processing failed");
                            inner.emit(SessionEvent::Error {
                                message: e.to_string(),
                            });
                        }
                    },
                    None => {
                        inner.emit(SessionEvent::Ended {
                            reason: "room audio closed".to_string(),
                        });
                        break;
                    }
                }
            }
        }
    }
}

/// Handle exposed to agent lifecycle hooks
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    /// Speak one utterance into the room
    pub async fn say(&self, text: &str) -> Result<(), AgentError> {
        self.inner.say(text).await
    }

    pub fn session_id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }
}

/// A voice conversation session.
///
/// Construction wires the agent, pipeline, and conversation flow; `start`
/// attaches the room audio and hands control to the pipeline; `close`
/// releases everything. Both `start` and `close` follow the contract the
/// worker entrypoint relies on: start at most once, close idempotent, exit
/// hook on every path.
pub struct AgentSession {
    inner: Arc<SessionInner>,
}

impl AgentSession {
    pub fn new(
        agent: Arc<dyn Agent>,
        pipeline: Arc<CascadingPipeline>,
        flow: Arc<ConversationFlow>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            inner: Arc::new(SessionInner {
                id: uuid::Uuid::new_v4().to_string(),
                agent,
                pipeline,
                flow,
                state: RwLock::new(SessionState::Idle),
                event_tx,
                shutdown_tx,
                outgoing: RwLock::new(None),
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                enter_fired: AtomicBool::new(false),
                exit_fired: AtomicBool::new(false),
                barge_in: AtomicBool::new(false),
                out_sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Start the session on the given room audio endpoints.
    ///
    /// Spawns the audio loop, then runs the agent's enter hook exactly once.
    /// Fails when called twice or after `close`.
    pub async fn start(&self, room: RoomIo) -> Result<(), AgentError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(AgentError::Closed);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(AgentError::AlreadyStarted);
        }

        *self.inner.outgoing.write() = Some(room.outgoing);
        self.inner.set_state(SessionState::Listening);
        self.inner.emit(SessionEvent::Started {
            session_id: self.inner.id.clone(),
        });
        tracing::info!(
            session_id = %self.inner.id,
            agent = %self.inner.agent.name(),
            "session started"
        );

        let inner = Arc::clone(&self.inner);
        let shutdown_rx = self.inner.shutdown_tx.subscribe();
        tokio::spawn(SessionInner::audio_loop(inner, room.incoming, shutdown_rx));

        if !self.inner.enter_fired.swap(true, Ordering::SeqCst) {
            let agent = Arc::clone(&self.inner.agent);
            agent.on_enter(&self.handle()).await?;
        }

        Ok(())
    }

    /// Close the session.
    ///
    /// Idempotent. The first call runs the agent's exit hook exactly once
    /// (hook failures are logged, never propagated), stops the audio loop,
    /// and detaches the room sink.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if !self.inner.exit_fired.swap(true, Ordering::SeqCst) {
            let agent = Arc::clone(&self.inner.agent);
            if let Err(e) = agent.on_exit(&self.handle()).await {
                tracing::warn!(error = %e, "exit hook failed");
            }
        }

        let _ = self.inner.shutdown_tx.send(());
        *self.inner.outgoing.write() = None;
        self.inner.set_state(SessionState::Ended);
        self.inner.emit(SessionEvent::Ended {
            reason: "session closed".to_string(),
        });
        tracing::info!(session_id = %self.inner.id, "session closed");
    }

    /// Handle for lifecycle hooks and external speakers
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn session_id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Conversation flow backing this session
    pub fn flow(&self) -> &Arc<ConversationFlow> {
        &self.inner.flow
    }
}
