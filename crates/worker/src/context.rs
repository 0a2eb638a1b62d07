//! Job context and room connection
//!
//! The job context owns the room join for one worker job: `connect`
//! establishes the room audio channels, `terminated` suspends until the
//! external termination signal fires, and `shutdown` releases the
//! connection. The room media protocol itself stays behind this seam; the
//! context only deals in audio frames.

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};

use cascade_agent::RoomIo;
use cascade_core::AudioFrame;

use crate::WorkerError;

/// Capacity of the room audio channels, in frames
const AUDIO_CHANNEL_CAPACITY: usize = 256;

/// Room join options
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Pre-created room to join; a fresh room id is generated when absent
    pub room_id: Option<String>,
    /// Display name shown to room participants
    pub name: String,
    /// Log a playground URL after joining
    pub playground: bool,
}

impl RoomOptions {
    pub fn from_settings(room: &cascade_config::RoomSettings) -> Self {
        Self {
            room_id: room.room_id.clone(),
            name: room.name.clone(),
            playground: room.playground,
        }
    }
}

/// Context lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Connected,
    Shutdown,
}

struct RoomConnection {
    /// Session-facing endpoints, handed out once via `room()`
    session_io: Option<RoomIo>,
    /// Room-facing sender for participant audio
    audio_in_tx: mpsc::Sender<AudioFrame>,
    /// Drains agent speech toward the room
    drain_handle: tokio::task::JoinHandle<()>,
}

/// Context for one worker job: a room join plus the termination signal.
pub struct JobContext {
    options: RoomOptions,
    room_id: String,
    state: RwLock<ContextState>,
    conn: RwLock<Option<RoomConnection>>,
    terminate_tx: watch::Sender<bool>,
}

impl JobContext {
    pub fn new(options: RoomOptions) -> Self {
        let room_id = options
            .room_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let (terminate_tx, _) = watch::channel(false);

        Self {
            options,
            room_id,
            state: RwLock::new(ContextState::Created),
            conn: RwLock::new(None),
            terminate_tx,
        }
    }

    /// Join (or create) the room.
    ///
    /// Establishes the audio channels and starts draining agent speech
    /// toward the room.
    pub async fn connect(&self) -> Result<(), WorkerError> {
        {
            let state = self.state.read();
            match *state {
                ContextState::Connected => return Err(WorkerError::AlreadyConnected),
                ContextState::Shutdown => return Err(WorkerError::Shutdown),
                ContextState::Created => {},
            }
        }

        let (in_tx, in_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<AudioFrame>(AUDIO_CHANNEL_CAPACITY);

        let room_id = self.room_id.clone();
        let drain_handle = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                metrics::counter!("room_audio_frames_published_total").increment(1);
                tracing::trace!(
                    room_id = %room_id,
                    sequence = frame.sequence,
                    samples = frame.len(),
                    "published agent audio to room"
                );
            }
        });

        *self.conn.write() = Some(RoomConnection {
            session_io: Some(RoomIo {
                incoming: in_rx,
                outgoing: out_tx,
            }),
            audio_in_tx: in_tx,
            drain_handle,
        });
        *self.state.write() = ContextState::Connected;

        tracing::info!(
            room_id = %self.room_id,
            name = %self.options.name,
            "connected to room"
        );
        if self.options.playground {
            tracing::info!(
                url = %format!("https://playground.cascade.dev/room/{}", self.room_id),
                "playground ready"
            );
        }

        Ok(())
    }

    /// Session-facing audio endpoints. Available exactly once per connect.
    pub fn room(&self) -> Result<RoomIo, WorkerError> {
        let mut conn = self.conn.write();
        let conn = conn.as_mut().ok_or(WorkerError::NotConnected)?;
        conn.session_io.take().ok_or(WorkerError::RoomTaken)
    }

    /// Sender for participant audio arriving from the room.
    ///
    /// The media layer feeds this; tests use it to inject speech.
    pub fn participant_audio(&self) -> Result<mpsc::Sender<AudioFrame>, WorkerError> {
        let conn = self.conn.read();
        conn.as_ref()
            .map(|c| c.audio_in_tx.clone())
            .ok_or(WorkerError::NotConnected)
    }

    /// Suspend until the termination signal fires.
    ///
    /// No timeout and no polling; an external actor fires the signal via
    /// `terminate` (typically the worker's signal handler).
    pub async fn terminated(&self) {
        let mut rx = self.terminate_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Fire the termination signal.
    ///
    /// `send_replace` updates the value even when nobody is waiting yet, so
    /// a signal that lands before `terminated` is first polled still counts.
    pub fn terminate(&self) {
        self.terminate_tx.send_replace(true);
    }

    /// Release the room connection. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if *state == ContextState::Shutdown {
                return;
            }
            *state = ContextState::Shutdown;
        }

        if let Some(conn) = self.conn.write().take() {
            // Dropping the senders closes the session's incoming stream;
            // the drain task ends when the session side drops its sender.
            drop(conn.audio_in_tx);
            conn.drain_handle.abort();
        }

        tracing::info!(room_id = %self.room_id, "room connection shut down");
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_shutdown(&self) -> bool {
        self.state() == ContextState::Shutdown
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn options(&self) -> &RoomOptions {
        &self.options
    }
}
