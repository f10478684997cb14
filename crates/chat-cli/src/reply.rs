//! Streaming an assistant reply to the terminal.
//!
//! Session events only tell the printer *that* the reply grew. The text itself
//! is always read back from the transcript, so a lagged event receiver never
//! leaves gaps on screen.

use std::future::Future;
use std::io::{self, Write};

use colored::Colorize;
use tokio::sync::broadcast::{error::RecvError, Receiver};

use chat_session::{ChatSession, Role, SessionEvent, SessionStatus};

/// Prints the assistant message of one turn exactly once, in order.
pub struct ReplyPrinter<W> {
    out: W,
    message_id: Option<String>,
    printed: usize,
}

impl<W: Write> ReplyPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            message_id: None,
            printed: 0,
        }
    }

    /// Apply one event. Returns the settled status once the turn is over.
    pub fn on_event(
        &mut self,
        session: &ChatSession,
        event: &SessionEvent,
    ) -> io::Result<Option<SessionStatus>> {
        match event {
            SessionEvent::MessageAppended { message } if message.role == Role::Assistant => {
                self.message_id = Some(message.id.clone());
                self.catch_up(session)?;
            }
            SessionEvent::FragmentAppended { message_id, .. } => {
                if self.message_id.is_none() {
                    self.message_id = Some(message_id.clone());
                }
                self.catch_up(session)?;
            }
            SessionEvent::StatusChanged { status } if !status.is_in_flight() => {
                self.catch_up(session)?;
                return Ok(Some(*status));
            }
            _ => {}
        }
        Ok(None)
    }

    /// Print whatever part of the reply is in the transcript but not yet on screen.
    pub fn catch_up(&mut self, session: &ChatSession) -> io::Result<()> {
        if self.message_id.is_none() {
            // The append event may have been skipped. Submit added the user's
            // message, so an assistant message at the end belongs to this turn.
            self.message_id = session
                .transcript()
                .last()
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.id.clone());
        }

        let Some(text) = self
            .message_id
            .as_deref()
            .and_then(|id| session.message(id))
            .map(|m| m.text())
        else {
            return Ok(());
        };
        if let Some(missing) = text.get(self.printed..).filter(|s| !s.is_empty()) {
            self.out.write_all(missing.as_bytes())?;
            self.out.flush()?;
            self.printed = text.len();
        }
        Ok(())
    }

    pub fn write_marker(&mut self, marker: &str) -> io::Result<()> {
        write!(self.out, "{}", marker.yellow())?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Follow `events` until the turn settles, printing the reply as it grows.
///
/// Each time `interrupt` resolves the turn is cancelled; the loop still waits
/// for the session to report the settled status.
pub async fn follow_reply<W, I, F>(
    session: &ChatSession,
    events: &mut Receiver<SessionEvent>,
    printer: &mut ReplyPrinter<W>,
    mut interrupt: I,
) -> io::Result<SessionStatus>
where
    W: Write,
    I: FnMut() -> F,
    F: Future,
{
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(status) = printer.on_event(session, &event)? {
                        return Ok(status);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("[{}] Reply output lagged by {} events", session.id(), skipped);
                    printer.catch_up(session)?;
                }
                Err(RecvError::Closed) => {
                    printer.catch_up(session)?;
                    return Ok(session.status());
                }
            },
            _ = interrupt() => {
                session.cancel();
                printer.write_marker(" [stopped]")?;
            }
        }
    }
}
