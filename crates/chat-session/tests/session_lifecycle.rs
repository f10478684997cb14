use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chat_llm::{CompletionProvider, Frame, FrameStream, LLMError, OpenAIProvider};
use chat_core::WireMessage;
use chat_session::{
    ChatSession, Role, SessionConfig, SessionEvent, SessionStatus, StreamError, SubmitError,
};

type FrameSender = mpsc::UnboundedSender<chat_llm::Result<Frame>>;

enum Script {
    Frames(Vec<chat_llm::Result<Frame>>),
    Live(mpsc::UnboundedReceiver<chat_llm::Result<Frame>>),
    OpenFailure(String),
}

/// Plays back one script per turn and records what each turn was sent.
#[derive(Default)]
struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<(Vec<WireMessage>, Option<String>)>>,
}

impl ScriptedProvider {
    fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    fn push_frames(&self, frames: Vec<chat_llm::Result<Frame>>) {
        self.push(Script::Frames(frames));
    }

    fn push_live(&self) -> FrameSender {
        let (tx, rx) = mpsc::unbounded();
        self.push(Script::Live(rx));
        tx
    }

    fn requests(&self) -> Vec<(Vec<WireMessage>, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn stream(
        &self,
        messages: &[WireMessage],
        model: Option<&str>,
    ) -> chat_llm::Result<FrameStream> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), model.map(str::to_string)));

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script queued for this turn");

        match script {
            Script::Frames(frames) => Ok(Box::pin(futures::stream::iter(frames))),
            Script::Live(rx) => Ok(Box::pin(rx)),
            Script::OpenFailure(message) => Err(LLMError::Api(message)),
        }
    }
}

fn delta(text: &str) -> chat_llm::Result<Frame> {
    Ok(Frame::Delta(text.to_string()))
}

fn setup() -> (Arc<ScriptedProvider>, ChatSession) {
    let provider = Arc::new(ScriptedProvider::default());
    let session = ChatSession::new(provider.clone());
    (provider, session)
}

async fn settle(session: &ChatSession) -> SessionStatus {
    tokio::time::timeout(Duration::from_secs(5), session.wait_until_settled())
        .await
        .expect("turn did not settle")
}

async fn wait_for_status(session: &ChatSession, wanted: SessionStatus) {
    let mut rx = session.watch_status();
    tokio::time::timeout(Duration::from_secs(5), async {
        while *rx.borrow_and_update() != wanted {
            rx.changed().await.expect("session dropped");
        }
    })
    .await
    .expect("status never reached");
}

async fn wait_for_text(session: &ChatSession, wanted: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let transcript = session.transcript();
            if transcript.last().map(|m| m.text()) == Some(wanted.to_string()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("assistant text never arrived");
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn texts(session: &ChatSession) -> Vec<(Role, String)> {
    session
        .transcript()
        .iter()
        .map(|m| (m.role, m.text()))
        .collect()
}

#[tokio::test]
async fn successful_turn_builds_assistant_message_from_fragments() {
    let (provider, session) = setup();
    provider.push_frames(vec![delta("He"), delta("llo"), Ok(Frame::Finish)]);

    session.submit("hi").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Idle);

    assert_eq!(
        texts(&session),
        vec![
            (Role::User, "hi".to_string()),
            (Role::Assistant, "Hello".to_string()),
        ]
    );
    assert!(session.error().is_none());
}

#[tokio::test]
async fn user_text_is_stored_verbatim() {
    let (provider, session) = setup();
    provider.push_frames(vec![Ok(Frame::Finish)]);

    session.submit("  spaced out \n").unwrap();
    settle(&session).await;

    assert_eq!(
        texts(&session),
        vec![(Role::User, "  spaced out \n".to_string())]
    );
}

#[tokio::test]
async fn finish_without_fragments_adds_no_assistant_message() {
    let (provider, session) = setup();
    provider.push_frames(vec![Ok(Frame::Finish)]);

    session.submit("hi").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Idle);
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn error_frame_keeps_partial_text_and_records_remote_error() {
    let (provider, session) = setup();
    provider.push_frames(vec![delta("par"), Ok(Frame::Error("overloaded".to_string()))]);

    session.submit("x").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Error);

    assert_eq!(
        session.error(),
        Some(StreamError::Remote("overloaded".to_string()))
    );
    assert_eq!(
        texts(&session),
        vec![
            (Role::User, "x".to_string()),
            (Role::Assistant, "par".to_string()),
        ]
    );
}

#[tokio::test]
async fn open_failure_goes_straight_to_error() {
    let (provider, session) = setup();
    provider.push(Script::OpenFailure("HTTP 401: unauthorized".to_string()));

    session.submit("hi").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Error);

    assert_eq!(
        session.error(),
        Some(StreamError::Remote("HTTP 401: unauthorized".to_string()))
    );
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn stream_closing_without_terminal_frame_is_a_transport_error() {
    let (provider, session) = setup();
    provider.push_frames(vec![delta("half")]);

    session.submit("hi").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Error);

    assert!(matches!(session.error(), Some(StreamError::Transport(_))));
    assert_eq!(session.transcript().last().unwrap().text(), "half");
}

#[tokio::test]
async fn invalid_input_leaves_session_untouched() {
    let (provider, session) = setup();
    let mut events = session.subscribe();

    assert_eq!(session.submit(""), Err(SubmitError::InvalidInput));
    assert_eq!(session.submit("   "), Err(SubmitError::InvalidInput));

    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.transcript().is_empty());
    assert!(drain(&mut events).is_empty());
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn submit_is_rejected_while_a_turn_is_in_flight() {
    let (provider, session) = setup();
    let tx = provider.push_live();

    session.submit("first").unwrap();
    assert_eq!(session.submit("second"), Err(SubmitError::Busy));

    tx.unbounded_send(delta("a")).unwrap();
    wait_for_status(&session, SessionStatus::Streaming).await;
    assert_eq!(session.submit("third"), Err(SubmitError::Busy));

    tx.unbounded_send(Ok(Frame::Finish)).unwrap();
    settle(&session).await;

    assert_eq!(
        texts(&session),
        vec![
            (Role::User, "first".to_string()),
            (Role::Assistant, "a".to_string()),
        ]
    );
}

#[tokio::test]
async fn cancel_keeps_partial_text_and_ignores_later_frames() {
    let (provider, session) = setup();
    let tx = provider.push_live();

    session.submit("tell me a story").unwrap();
    tx.unbounded_send(delta("Once")).unwrap();
    wait_for_text(&session, "Once").await;

    session.cancel();
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.error().is_none());

    // Frames still in the pipe after cancel must not land.
    let _ = tx.unbounded_send(delta(" upon"));
    let _ = tx.unbounded_send(Ok(Frame::Finish));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(
        texts(&session),
        vec![
            (Role::User, "tell me a story".to_string()),
            (Role::Assistant, "Once".to_string()),
        ]
    );

    provider.push_frames(vec![delta("ok"), Ok(Frame::Finish)]);
    session.submit("again").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Idle);
    assert_eq!(session.transcript().len(), 4);
    assert_eq!(session.transcript().last().unwrap().text(), "ok");
}

#[tokio::test]
async fn cancel_before_first_fragment_adds_no_assistant_message() {
    let (provider, session) = setup();
    let tx = provider.push_live();

    session.submit("hi").unwrap();
    assert_eq!(session.status(), SessionStatus::Submitting);
    session.cancel();

    let _ = tx.unbounded_send(delta("late"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(texts(&session), vec![(Role::User, "hi".to_string())]);
}

#[tokio::test]
async fn cancel_when_idle_or_in_error_is_a_noop() {
    let (provider, session) = setup();
    session.cancel();
    assert_eq!(session.status(), SessionStatus::Idle);

    provider.push_frames(vec![Ok(Frame::Error("boom".to_string()))]);
    session.submit("hi").unwrap();
    settle(&session).await;

    session.cancel();
    assert_eq!(session.status(), SessionStatus::Error);
    assert!(session.error().is_some());
}

#[tokio::test]
async fn clear_error_returns_to_idle_and_is_noop_otherwise() {
    let (provider, session) = setup();
    let mut events = session.subscribe();

    session.clear_error();
    assert!(drain(&mut events).is_empty());

    provider.push_frames(vec![Ok(Frame::Error("boom".to_string()))]);
    session.submit("hi").unwrap();
    settle(&session).await;
    assert_eq!(session.status(), SessionStatus::Error);

    session.clear_error();
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.error().is_none());
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn submit_from_error_clears_the_error() {
    let (provider, session) = setup();
    provider.push_frames(vec![Ok(Frame::Error("boom".to_string()))]);
    session.submit("hi").unwrap();
    settle(&session).await;

    let tx = provider.push_live();
    session.submit("retry").unwrap();
    assert_eq!(session.status(), SessionStatus::Submitting);
    assert!(session.error().is_none());

    tx.unbounded_send(Ok(Frame::Finish)).unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Idle);
}

#[tokio::test]
async fn provider_receives_full_history_without_ids() {
    let provider = Arc::new(ScriptedProvider::default());
    let session = ChatSession::with_config(
        provider.clone(),
        SessionConfig {
            model: Some("gpt-4o".to_string()),
            ..SessionConfig::default()
        },
    );

    provider.push_frames(vec![delta("Hello"), Ok(Frame::Finish)]);
    session.submit("hi").unwrap();
    settle(&session).await;

    provider.push_frames(vec![Ok(Frame::Finish)]);
    session.submit("how are you").unwrap();
    settle(&session).await;

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);

    let (second, model) = &requests[1];
    assert_eq!(model.as_deref(), Some("gpt-4o"));

    let payload = serde_json::to_value(second).unwrap();
    assert_eq!(
        payload,
        json!([
            { "role": "user", "parts": [{ "type": "text", "text": "hi" }] },
            { "role": "assistant", "parts": [{ "type": "text", "text": "Hello" }] },
            { "role": "user", "parts": [{ "type": "text", "text": "how are you" }] },
        ])
    );
}

#[tokio::test]
async fn observers_see_events_in_mutation_order() {
    let (provider, session) = setup();
    let mut events = session.subscribe();
    provider.push_frames(vec![delta("He"), delta("llo"), Ok(Frame::Finish)]);

    session.submit("hi").unwrap();
    settle(&session).await;

    let events = drain(&mut events);
    let assistant_id = session.transcript().last().unwrap().id.clone();

    let summary: Vec<String> = events
        .iter()
        .map(|event| match event {
            SessionEvent::MessageAppended { message } => {
                format!("append {:?} {}", message.role, message.text())
            }
            SessionEvent::FragmentAppended {
                message_id,
                fragment,
            } => {
                assert_eq!(message_id, &assistant_id);
                format!("fragment {}", fragment)
            }
            SessionEvent::StatusChanged { status } => format!("status {:?}", status),
            SessionEvent::Failed { error } => format!("failed {}", error),
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            "append User hi",
            "status Submitting",
            "status Streaming",
            "append Assistant He",
            "fragment llo",
            "status Idle",
        ]
    );
}

#[tokio::test]
async fn message_lookup_returns_the_latest_text() {
    let (provider, session) = setup();
    let tx = provider.push_live();

    session.submit("hi").unwrap();
    tx.unbounded_send(delta("He")).unwrap();
    wait_for_text(&session, "He").await;

    let id = session.transcript().last().unwrap().id.clone();
    assert_eq!(session.message(&id).unwrap().text(), "He");

    tx.unbounded_send(delta("llo")).unwrap();
    tx.unbounded_send(Ok(Frame::Finish)).unwrap();
    settle(&session).await;

    assert_eq!(session.message(&id).unwrap().text(), "Hello");
    assert!(session.message("missing").is_none());
}

#[tokio::test]
async fn failure_event_precedes_error_status() {
    let (provider, session) = setup();
    let mut events = session.subscribe();
    provider.push_frames(vec![Ok(Frame::Error("boom".to_string()))]);

    session.submit("hi").unwrap();
    settle(&session).await;

    let events = drain(&mut events);
    let tail: Vec<_> = events.iter().rev().take(2).collect();
    assert!(matches!(
        tail[0],
        SessionEvent::StatusChanged {
            status: SessionStatus::Error
        }
    ));
    assert!(matches!(
        tail[1],
        SessionEvent::Failed {
            error: StreamError::Remote(_)
        }
    ));
}

#[tokio::test]
async fn openai_backed_session_streams_a_reply() {
    if std::env::var_os("CODEX_SANDBOX_NETWORK_DISABLED").is_some() {
        return;
    }

    let mock_server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::new("sk-test")
        .with_base_url(format!("{}/v1", mock_server.uri()));
    let session = ChatSession::new(Arc::new(provider));

    session.submit("hi").unwrap();
    assert_eq!(settle(&session).await, SessionStatus::Idle);
    assert_eq!(session.transcript().last().unwrap().text(), "Hello");
}

#[tokio::test]
async fn dropping_the_session_stops_the_turn() {
    let (provider, session) = setup();
    let tx = provider.push_live();

    session.submit("hi").unwrap();
    tx.unbounded_send(delta("a")).unwrap();
    wait_for_text(&session, "a").await;

    drop(session);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !tx.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("turn kept running after the session was dropped");

    assert!(provider.scripts.lock().unwrap().is_empty());
}
