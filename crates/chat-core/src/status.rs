//! Session status - the turn lifecycle state machine
//!
//! `idle --submit--> submitting --first frame--> streaming --finish--> idle`,
//! with `error` reachable from either in-flight state and left via
//! `clear_error` or a fresh submit.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No turn in flight; ready for input.
    #[default]
    Idle,
    /// Request issued, no frame received yet.
    Submitting,
    /// At least one frame of the current turn has arrived.
    Streaming,
    /// The last turn failed; the error is stored on the session.
    Error,
}

/// Things that happen to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    Submitted,
    FrameReceived,
    Finished,
    Failed,
    Cancelled,
    ErrorCleared,
}

impl SessionStatus {
    /// Next status for `event`, or `None` when the transition is not allowed.
    pub fn next(self, event: TurnEvent) -> Option<SessionStatus> {
        use SessionStatus::*;
        use TurnEvent::*;

        match (self, event) {
            (Idle | Error, Submitted) => Some(Submitting),

            (Submitting | Streaming, FrameReceived) => Some(Streaming),
            (Submitting | Streaming, Finished) => Some(Idle),
            (Submitting | Streaming, Failed) => Some(Error),
            (Submitting | Streaming, Cancelled) => Some(Idle),

            (Error, ErrorCleared) => Some(Idle),

            _ => None,
        }
    }

    /// A turn is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting | Self::Streaming)
    }

    pub fn accepts_submit(&self) -> bool {
        self.next(TurnEvent::Submitted).is_some()
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Idle => "Ready for input",
            Self::Submitting => "Sending message",
            Self::Streaming => "Receiving response",
            Self::Error => "Failed",
        }
    }
}
