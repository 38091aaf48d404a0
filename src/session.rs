//! Session loop: the bounded request/response cycle over one connection.
//!
//! A session performs a fixed number of iterations, each one a blocking
//! line read, a parse, a response, and a pause. The loop is generic over
//! `BufRead`/`Write` so it can be driven from tests without a socket;
//! socket setup and teardown live in `server`.

use crate::protocol::{self, ParseError, Response};
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Initial capacity for the line buffer.
const LINE_CAPACITY: usize = 1024;

/// Lifecycle of the single session a server run handles.
///
/// The only legal path is
/// `Idle -> Listening -> Connected -> Iterating -> Closed`, with a
/// direct jump to `Closed` when a fatal error cuts the loop short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket exists yet.
    Idle,
    /// Listener bound, waiting for the one client.
    Listening,
    /// Client accepted, prompt not yet sent.
    Connected,
    /// Request/response cycles in progress.
    Iterating,
    /// All resources released.
    Closed,
}

/// Fatal session failures.
///
/// Unknown operators are answered inside the loop and never surface
/// here; what does surface ends the session.
#[derive(Debug)]
pub enum SessionError {
    /// The transport failed, or the client disconnected mid-session.
    Io(io::Error),
    /// A known operator arrived with a malformed operand list.
    Command(ParseError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "Session I/O error: {}", e),
            SessionError::Command(e) => write!(f, "Malformed command: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Io(e)
    }
}

/// A single client session: iteration budget, pause interval, state.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    budget: u64,
    pause: Duration,
}

impl Session {
    /// Create a session in the initial idle state.
    pub fn new(budget: u64, pause: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            budget,
            pause,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Transition to listening state.
    pub fn listening(&mut self) {
        self.state = SessionState::Listening;
    }

    /// Transition to connected state.
    pub fn connected(&mut self) {
        self.state = SessionState::Connected;
    }

    /// Mark every resource as released.
    pub fn closed(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Run the bounded request/response loop.
    ///
    /// Sends the prompt, then performs exactly `budget` iterations
    /// unless a fatal error cuts the session short. Successful results
    /// and rejections both consume an iteration; only successful
    /// results are followed by the pause. The caller owns resource
    /// teardown on every outcome.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<(), SessionError> {
        self.state = SessionState::Iterating;

        writer.write_all(Response::prompt())?;
        writer.flush()?;

        let mut line = String::with_capacity(LINE_CAPACITY);

        for iteration in 0..self.budget {
            line.clear();

            let n = reader.read_line(&mut line)?;
            if n == 0 {
                return Err(SessionError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "client closed the connection mid-session",
                )));
            }

            let trimmed = line.trim_end_matches(['\r', '\n']);

            match protocol::parse(trimmed) {
                Ok(command) => {
                    let result = command.eval();
                    trace!(iteration, ?command, result, "Computed result");

                    writer.write_all(&Response::result(result))?;
                    writer.flush()?;

                    debug!(iteration, "Sent result to client, pausing");
                    thread::sleep(self.pause);
                }
                Err(ParseError::UnknownOperation(op)) => {
                    debug!(iteration, op = %op, "Rejecting unknown operation");

                    // Consumes the iteration but skips the pause.
                    writer.write_all(Response::rejection())?;
                    writer.flush()?;
                }
                Err(e) => return Err(SessionError::Command(e)),
            }
        }

        debug!(iterations = self.budget, "Iteration budget exhausted");
        Ok(())
    }
}
