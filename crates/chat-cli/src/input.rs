//! Prompt input that can be interrupted.
//!
//! Once the process listens for Ctrl-C, the default SIGINT exit is gone for
//! good, so the prompt has to race the signal itself. Lines are read on a
//! plain thread because a blocked stdin read cannot be cancelled.

use std::future::Future;
use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;

#[derive(Debug, PartialEq, Eq)]
pub enum PromptInput {
    /// One line, line terminator stripped.
    Line(String),
    Eof,
    Interrupted,
}

pub struct InputLines {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl InputLines {
    pub fn stdin() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(mut reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        thread::spawn(move || loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.blocking_send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Wait for the next line, or for `interrupt` to resolve first.
    pub async fn next_input<F: Future>(&mut self, interrupt: F) -> io::Result<PromptInput> {
        tokio::select! {
            biased;
            _ = interrupt => Ok(PromptInput::Interrupted),
            line = self.rx.recv() => match line {
                Some(Ok(line)) => Ok(PromptInput::Line(
                    line.trim_end_matches(['\r', '\n']).to_string(),
                )),
                Some(Err(e)) => Err(e),
                None => Ok(PromptInput::Eof),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{pending, ready};
    use std::io::Cursor;

    #[tokio::test]
    async fn lines_arrive_in_order_then_eof() {
        let mut input = InputLines::from_reader(Cursor::new("hello\r\n/quit\n"));

        assert_eq!(
            input.next_input(pending::<()>()).await.unwrap(),
            PromptInput::Line("hello".to_string())
        );
        assert_eq!(
            input.next_input(pending::<()>()).await.unwrap(),
            PromptInput::Line("/quit".to_string())
        );
        assert_eq!(input.next_input(pending::<()>()).await.unwrap(), PromptInput::Eof);
    }

    #[tokio::test]
    async fn interrupt_wins_and_keeps_the_pending_line() {
        let mut input = InputLines::from_reader(Cursor::new("kept\n"));

        assert_eq!(
            input.next_input(ready(())).await.unwrap(),
            PromptInput::Interrupted
        );
        assert_eq!(
            input.next_input(pending::<()>()).await.unwrap(),
            PromptInput::Line("kept".to_string())
        );
    }
}
