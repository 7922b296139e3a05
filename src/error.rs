//! Error types for session handling and fleet dispatch.
//!
//! This module defines all errors that can occur while connecting to a
//! radio link unit, exchanging commands with it, and parsing its output.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors that can occur during session handling and fleet dispatch.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The connect handshake did not reach the command prompt in time.
    ///
    /// Covers both the initial expect window after opening the shell and
    /// the secondary window after answering a host-key prompt.
    #[error("connect timeout: {0}")]
    ConnectTimeout(String),

    /// The target host reported itself unreachable during connect.
    ///
    /// Matched against the dialect's unreachable-host marker; no retry is
    /// attempted for this outcome.
    #[error("no route to host")]
    HostUnreachable,

    /// Authentication against the unit failed.
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    /// Command execution timed out.
    ///
    /// The prompt did not reappear within the configured timeout. The
    /// error carries the partial output received before the timeout.
    #[error("exec command timeout: {0}")]
    ExecTimeout(String),

    /// The shell stream ended while waiting for a prompt.
    #[error("channel disconnect on wait prompt")]
    ChannelDisconnect,

    /// The session is not connected.
    ///
    /// Returned when a command exchange is attempted on a session that
    /// never connected or has already been disconnected.
    #[error("session not connected")]
    SessionClosed,

    /// Any other transport-level failure during a session exchange.
    #[error("unexpected session error: {0}")]
    UnexpectedSession(String),

    /// The requested operation keyword is not supported.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A roster record is missing required identity fields.
    #[error("invalid device descriptor: {0}")]
    InvalidDevice(String),

    /// A screen definition carries an invalid extraction pattern.
    #[error("invalid screen definition: {0}")]
    InvalidScreen(String),

    /// A scripted session was asked for an exchange its transcript does
    /// not contain.
    #[error("scripted exchange mismatch: {0}")]
    ReplayMismatch(String),

    /// Failed to send data through the shell channel.
    #[error("failed to send data: {0}")]
    SendData(#[from] SendError<String>),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    Russh(#[from] russh::Error),
}

impl EngineError {
    /// Short failure label used in report rows.
    pub fn kind_label(&self) -> &'static str {
        match self {
            EngineError::ConnectTimeout(_) => "connect_timeout",
            EngineError::HostUnreachable => "no_route",
            EngineError::AuthenticationFailure(_) => "auth_failed",
            EngineError::ExecTimeout(_) => "exec_timeout",
            EngineError::ChannelDisconnect => "channel_disconnect",
            EngineError::SessionClosed => "session_closed",
            EngineError::UnexpectedSession(_) => "session_error",
            EngineError::UnsupportedOperation(_) => "unsupported_operation",
            EngineError::InvalidDevice(_) => "invalid_device",
            EngineError::InvalidScreen(_) => "invalid_screen",
            EngineError::ReplayMismatch(_) => "replay_mismatch",
            EngineError::SendData(_) | EngineError::Ssh2(_) | EngineError::Russh(_) => {
                "transport_error"
            }
        }
    }
}
