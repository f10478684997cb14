pub mod handler;

pub use handler::{consume_frames, TurnOutcome};
