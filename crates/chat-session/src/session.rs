//! ChatSession - one conversation and its turn lifecycle
//!
//! All mutation goes through a single lock around [`SessionState`]; the status
//! field inside it is the gate that admits at most one turn at a time. The
//! network side of a turn runs on a spawned task that re-enters the lock for
//! every frame, so `cancel` and frame application are totally ordered.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use chat_core::{
    Message, SessionStatus, StreamError, SubmitError, Transcript, TurnEvent, WireMessage,
};
use chat_llm::CompletionProvider;

use crate::config::SessionConfig;
use crate::events::SessionEvent;
use crate::stream::{consume_frames, TurnOutcome};

struct ActiveTurn {
    cancel_token: CancellationToken,
    /// Set once the first fragment has created the assistant message.
    assistant_id: Option<String>,
}

#[derive(Default)]
struct SessionState {
    transcript: Transcript,
    status: SessionStatus,
    error: Option<StreamError>,
    turn: Option<ActiveTurn>,
}

struct Shared {
    id: String,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    status_tx: watch::Sender<SessionStatus>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&self, state: &mut SessionState, status: SessionStatus) {
        if state.status == status {
            return;
        }
        log::debug!("[{}] Status {:?} -> {:?}", self.id, state.status, status);
        state.status = status;
        self.status_tx.send_replace(status);
        self.emit(SessionEvent::StatusChanged { status });
    }

    /// Apply one fragment of the turn owning `token`. False if that turn is over.
    fn apply_fragment(&self, token: &CancellationToken, fragment: &str) -> bool {
        let mut state = self.write();
        if token.is_cancelled() {
            return false;
        }

        if let Some(next) = state.status.next(TurnEvent::FrameReceived) {
            self.set_status(&mut state, next);
        }

        let assistant_id = state
            .turn
            .as_ref()
            .and_then(|turn| turn.assistant_id.clone());

        match assistant_id {
            Some(message_id) => {
                state.transcript.append_text(&message_id, fragment);
                self.emit(SessionEvent::FragmentAppended {
                    message_id,
                    fragment: fragment.to_string(),
                });
            }
            None => {
                let message = Message::assistant(fragment);
                if let Some(turn) = state.turn.as_mut() {
                    turn.assistant_id = Some(message.id.clone());
                }
                state.transcript.push(message.clone());
                self.emit(SessionEvent::MessageAppended { message });
            }
        }

        true
    }

    /// Record how the turn owning `token` ended, unless it was cancelled first.
    fn complete_turn(&self, token: &CancellationToken, outcome: TurnOutcome) {
        let mut state = self.write();
        if token.is_cancelled() {
            return;
        }
        state.turn = None;

        match outcome {
            TurnOutcome::Finished => {
                log::info!("[{}] Turn completed", self.id);
                if let Some(next) = state.status.next(TurnEvent::Finished) {
                    self.set_status(&mut state, next);
                }
            }
            TurnOutcome::Failed(error) => {
                log::warn!("[{}] Turn failed: {}", self.id, error);
                if let Some(next) = state.status.next(TurnEvent::Failed) {
                    state.error = Some(error.clone());
                    self.emit(SessionEvent::Failed { error });
                    self.set_status(&mut state, next);
                }
            }
            TurnOutcome::Cancelled => {}
        }
    }

    fn cancel_active_turn(&self, state: &mut SessionState) -> bool {
        match state.turn.take() {
            Some(turn) => {
                turn.cancel_token.cancel();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    shared: Arc<Shared>,
    provider: Arc<dyn CompletionProvider>,
    config: SessionConfig,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut state = self.shared.write();
        if self.shared.cancel_active_turn(&mut state) {
            log::debug!("[{}] Session dropped, in-flight turn cancelled", self.shared.id);
        }
    }
}

/// A single conversation with a completion endpoint.
///
/// Cloning yields another handle to the same session. The in-flight turn, if
/// any, is cancelled when the last handle is dropped.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_config(provider, SessionConfig::default())
    }

    pub fn with_config(provider: Arc<dyn CompletionProvider>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let (status_tx, _) = watch::channel(SessionStatus::Idle);

        let shared = Arc::new(Shared {
            id: Uuid::new_v4().to_string(),
            state: RwLock::new(SessionState::default()),
            events,
            status_tx,
        });

        Self {
            inner: Arc::new(Inner {
                shared,
                provider,
                config,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.shared.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Append a user message and start a turn for it.
    ///
    /// Returns as soon as the turn is started; its progress is observed through
    /// [`status`](Self::status), [`transcript`](Self::transcript) and
    /// [`subscribe`](Self::subscribe). Submitting from `Error` clears the error.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, text: impl Into<String>) -> Result<(), SubmitError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SubmitError::InvalidInput);
        }

        let shared = &self.inner.shared;
        let (messages, cancel_token) = {
            let mut state = shared.write();
            let next = state
                .status
                .next(TurnEvent::Submitted)
                .ok_or(SubmitError::Busy)?;

            if let Some(previous) = state.error.take() {
                log::debug!("[{}] Clearing previous error: {}", shared.id, previous);
            }

            let message = Message::user(text);
            state.transcript.push(message.clone());
            shared.emit(SessionEvent::MessageAppended { message });

            let cancel_token = CancellationToken::new();
            state.turn = Some(ActiveTurn {
                cancel_token: cancel_token.clone(),
                assistant_id: None,
            });
            shared.set_status(&mut state, next);

            (state.transcript.to_wire(), cancel_token)
        };

        log::info!(
            "[{}] Submitting turn with {} messages",
            shared.id,
            messages.len()
        );

        tokio::spawn(run_turn(
            shared.clone(),
            self.inner.provider.clone(),
            messages,
            self.inner.config.model.clone(),
            cancel_token,
        ));

        Ok(())
    }

    /// Abort the in-flight turn, keeping whatever text it already produced.
    /// No-op when nothing is in flight.
    pub fn cancel(&self) {
        let shared = &self.inner.shared;
        let mut state = shared.write();
        let Some(next) = state.status.next(TurnEvent::Cancelled) else {
            log::debug!("[{}] Cancel ignored in {:?}", shared.id, state.status);
            return;
        };

        shared.cancel_active_turn(&mut state);
        log::info!("[{}] Turn cancelled", shared.id);
        shared.set_status(&mut state, next);
    }

    /// Leave the `Error` status. No-op in any other status.
    pub fn clear_error(&self) {
        let shared = &self.inner.shared;
        let mut state = shared.write();
        if let Some(next) = state.status.next(TurnEvent::ErrorCleared) {
            state.error = None;
            shared.set_status(&mut state, next);
        }
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Transcript {
        self.inner.shared.read().transcript.clone()
    }

    /// Current copy of one message, without cloning the whole transcript.
    pub fn message(&self, id: &str) -> Option<Message> {
        self.inner.shared.read().transcript.get(id).cloned()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.shared.read().status
    }

    /// The stored error; present only while status is `Error`.
    pub fn error(&self) -> Option<StreamError> {
        self.inner.shared.read().error.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.shared.events.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.shared.status_tx.subscribe()
    }

    /// Wait until no turn is in flight and return the status at that point.
    pub async fn wait_until_settled(&self) -> SessionStatus {
        let mut status_rx = self.watch_status();
        loop {
            let status = *status_rx.borrow_and_update();
            if !status.is_in_flight() {
                return status;
            }
            if status_rx.changed().await.is_err() {
                return self.status();
            }
        }
    }
}

async fn run_turn(
    shared: Arc<Shared>,
    provider: Arc<dyn CompletionProvider>,
    messages: Vec<WireMessage>,
    model: Option<String>,
    cancel_token: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            log::debug!("[{}] Turn cancelled before the stream opened", shared.id);
            return;
        }
        opened = provider.stream(&messages, model.as_deref()) => opened,
    };

    let outcome = match opened {
        Ok(stream) => {
            consume_frames(stream, &cancel_token, &shared.id, |fragment| {
                shared.apply_fragment(&cancel_token, fragment)
            })
            .await
        }
        Err(error) => TurnOutcome::Failed(error.into()),
    };

    shared.complete_turn(&cancel_token, outcome);
}
