//! Interactive session handling for radio link units.
//!
//! This module owns one remote-shell connection per unit and drives the
//! login handshake and command/response exchange as a timeout-bounded
//! state machine over the shell byte stream.
//!
//! # Main Components
//!
//! - [`TerminalSession`] - One live SSH shell session with state tracking
//! - [`CliDialect`] - Literal prompt/banner wording for a device family
//! - [`ScriptedSession`] - Transcript-driven stand-in for tests
//! - [`CommandExchange`] - The seam the dispatcher and grammar run against

use crate::error::EngineError;

mod dialect;
mod scripted;
mod terminal;

pub use dialect::CliDialect;
pub use scripted::{ScriptedExchange, ScriptedSession};
pub use terminal::TerminalSession;

/// Connection lifecycle of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No connection; the initial state and the state after `disconnect`.
    Disconnected,
    /// Transport and handshake in progress.
    Connecting,
    /// Handshake completed; the command prompt has been seen.
    Connected,
    /// Connect failed; the session is unusable.
    Failed(FailureKind),
}

/// Why a connect attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// No expected banner appeared within the connect timeout.
    Timeout,
    /// The host reported itself unreachable.
    NoRoute,
    /// Authentication was rejected or the password prompt never appeared.
    AuthFailed,
    /// Any other transport-level failure.
    Unknown(String),
}

impl FailureKind {
    /// Classify an engine error into a connect failure kind.
    pub fn from_error(err: &EngineError) -> Self {
        match err {
            EngineError::ConnectTimeout(_) => FailureKind::Timeout,
            EngineError::HostUnreachable => FailureKind::NoRoute,
            EngineError::AuthenticationFailure(_) => FailureKind::AuthFailed,
            other => FailureKind::Unknown(other.to_string()),
        }
    }
}

/// Command/response surface shared by live and scripted sessions.
///
/// One implementor is exclusively owned by one device task; nothing here
/// is safe for concurrent use.
#[allow(async_fn_in_trait)]
pub trait CommandExchange {
    /// Host identity of the unit behind this exchange.
    fn host(&self) -> &str;

    /// Write one command line and block until the command prompt
    /// reappears, returning the text captured in between.
    async fn send_command(&mut self, command: &str) -> Result<String, EngineError>;

    /// Write one command line and return immediately.
    ///
    /// Used for commands that intentionally drop the remote shell, such
    /// as firmware transfers and resets.
    async fn send_command_no_wait(&mut self, command: &str) -> Result<(), EngineError>;
}
