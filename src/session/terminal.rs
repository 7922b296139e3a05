//! Live SSH shell session against one radio link unit.
//!
//! The connect path opens the transport, requests a PTY and shell, then
//! bridges the channel to a pair of mpsc string channels via a pump task.
//! Everything above the pump is a pattern-matching state machine over the
//! shell byte stream: the login handshake and every command exchange wait
//! for dialect-defined markers, each wait bounded by its own timeout.

use std::time::Duration;

use async_ssh2_tokio::Config;
use async_ssh2_tokio::client::{AuthMethod, Client};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use russh::ChannelMsg;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::config::ConnectionSecurityOptions;
use crate::error::EngineError;

use super::dialect::CliDialect;
use super::{CommandExchange, FailureKind, SessionState};

/// NUL padding some firmware versions emit through the PTY.
static NUL_NOISE: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\x00+") {
    Ok(re) => re,
    Err(err) => panic!("invalid NUL_NOISE regex: {err}"),
});

/// One interactive remote-shell connection to one unit.
///
/// A session is exclusively owned by one device task; it is not safe for
/// concurrent use by more than one caller.
pub struct TerminalSession {
    host: String,
    dialect: CliDialect,
    prompt: Regex,
    command_timeout: Duration,
    state: SessionState,
    client: Option<Client>,
    sender: Option<Sender<String>>,
    recv: Option<Receiver<String>>,
}

impl TerminalSession {
    /// Create a disconnected session bound to one host.
    pub fn new(
        host: impl Into<String>,
        dialect: CliDialect,
        command_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let prompt = dialect.prompt_regex()?;
        Ok(Self {
            host: host.into(),
            dialect,
            prompt,
            command_timeout,
            state: SessionState::Disconnected,
            client: None,
            sender: None,
            recv: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the session currently holds a live, logged-in shell.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
            && self.client.as_ref().map(|c| !c.is_closed()).unwrap_or(true)
    }

    /// Connect and log into the unit.
    ///
    /// Runs the transport setup and then the dialect-driven login
    /// handshake. On failure the session transitions to `Failed` with the
    /// classified kind and the error is returned.
    pub async fn connect(
        &mut self,
        user: &str,
        password: &str,
        port: u16,
        connect_timeout: Duration,
        security: &ConnectionSecurityOptions,
    ) -> Result<(), EngineError> {
        if self.state == SessionState::Connected {
            self.disconnect().await?;
        }
        self.state = SessionState::Connecting;

        match self
            .connect_inner(user, password, port, connect_timeout, security)
            .await
        {
            Ok(()) => {
                self.state = SessionState::Connected;
                debug!("[{}] connected successfully", self.host);
                Ok(())
            }
            Err(err) => {
                debug!("[{}] connect failed: {}", self.host, err);
                self.state = SessionState::Failed(FailureKind::from_error(&err));
                Err(err)
            }
        }
    }

    async fn connect_inner(
        &mut self,
        user: &str,
        password: &str,
        port: u16,
        connect_timeout: Duration,
        security: &ConnectionSecurityOptions,
    ) -> Result<(), EngineError> {
        let device_addr = format!("{user}@{}:{port}", self.host);

        let config = Config {
            preferred: security.preferred(),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let client = tokio::time::timeout(
            connect_timeout,
            Client::connect_with_config(
                (self.host.clone(), port),
                user,
                AuthMethod::with_password(password),
                security.server_check.clone(),
                config,
            ),
        )
        .await
        .map_err(|_| EngineError::ConnectTimeout(format!("connecting to {device_addr}")))?
        .map_err(classify_transport_error)?;
        debug!("{} TCP connection successful", device_addr);

        let mut channel = client.get_channel().await?;
        channel
            .request_pty(false, "xterm", 800, 600, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} Shell request successful", device_addr);

        let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
        let (sender_to_user, mut receiver_from_shell) = mpsc::channel::<String>(256);

        let io_task_device_addr = device_addr.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(data) = receiver_from_user.recv() => {
                        if let Err(e) = channel.data(data.as_bytes()).await {
                            debug!("{} Failed to send data to shell: {:?}", io_task_device_addr, e);
                            break;
                        }
                    },
                    Some(msg) = channel.wait() => {
                        match msg {
                            ChannelMsg::Data { ref data } => {
                                if let Ok(s) = std::str::from_utf8(data)
                                    && sender_to_user.send(s.to_string()).await.is_err() {
                                        debug!("{} Shell output receiver dropped. Closing task.", io_task_device_addr);
                                        break;
                                    }
                            }
                            ChannelMsg::ExitStatus { exit_status } => {
                                debug!("{} Shell exited with status code: {}", io_task_device_addr, exit_status);
                                let _ = channel.eof().await;
                                break;
                            }
                            ChannelMsg::Eof => {
                                debug!("{} Shell sent EOF.", io_task_device_addr);
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            debug!("{} shell I/O task ended.", io_task_device_addr);
        });

        login_handshake(
            &sender_to_shell,
            &mut receiver_from_shell,
            &self.dialect,
            &self.prompt,
            user,
            &self.host,
            password,
            connect_timeout,
        )
        .await?;

        self.client = Some(client);
        self.sender = Some(sender_to_shell);
        self.recv = Some(receiver_from_shell);
        Ok(())
    }

    /// Close the shell.
    ///
    /// Sends the dialect's exit command and waits for the stream to end.
    /// Calling this on a session that is not connected is a no-op.
    pub async fn disconnect(&mut self) -> Result<(), EngineError> {
        if self.state != SessionState::Connected {
            return Ok(());
        }

        if let Some(sender) = self.sender.as_ref()
            && let Err(err) = sender
                .send(format!("{}\n", self.dialect.exit_command))
                .await
        {
            debug!("[{}] failed to send exit command: {:?}", self.host, err);
        }

        if let Some(recv) = self.recv.as_mut() {
            let drained = tokio::time::timeout(Duration::from_secs(5), async {
                while recv.recv().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                debug!("[{}] stream did not end after exit", self.host);
            }
        }

        self.sender = None;
        self.recv = None;
        self.client = None;
        self.state = SessionState::Disconnected;
        Ok(())
    }

    /// Build a connected session directly over channel halves.
    ///
    /// Test hook: lets exchange logic run against an in-process fake
    /// device instead of a live shell.
    #[cfg(test)]
    pub(crate) fn connected_with_channels(
        host: &str,
        dialect: CliDialect,
        command_timeout: Duration,
        sender: Sender<String>,
        recv: Receiver<String>,
    ) -> Self {
        let prompt = dialect.prompt_regex().expect("test dialect compiles");
        Self {
            host: host.to_string(),
            dialect,
            prompt,
            command_timeout,
            state: SessionState::Connected,
            client: None,
            sender: Some(sender),
            recv: Some(recv),
        }
    }
}

impl CommandExchange for TerminalSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn send_command(&mut self, command: &str) -> Result<String, EngineError> {
        if self.state != SessionState::Connected {
            return Err(EngineError::SessionClosed);
        }
        debug!("[{}] {}", self.host, command);

        let sender = self.sender.as_ref().ok_or(EngineError::SessionClosed)?;
        let recv = self.recv.as_mut().ok_or(EngineError::SessionClosed)?;
        let prompt = &self.prompt;

        // Drop residual data from earlier exchanges before sending.
        while recv.try_recv().is_ok() {}

        sender.send(format!("{command}\n")).await?;

        let mut captured = String::new();
        let outcome = tokio::time::timeout(self.command_timeout, async {
            loop {
                match recv.recv().await {
                    Some(chunk) => {
                        trace!("{chunk:?}");
                        captured.push_str(&chunk);
                        // The prompt arrives without a trailing newline, so
                        // it is always the unterminated tail of the buffer.
                        let tail = captured.rsplit('\n').next().unwrap_or("");
                        if prompt.is_match(tail) {
                            return Ok(());
                        }
                    }
                    None => return Err(EngineError::ChannelDisconnect),
                }
            }
        })
        .await;

        match outcome {
            Err(_) => Err(EngineError::ExecTimeout(captured)),
            Ok(Err(err)) => Err(err),
            Ok(Ok(())) => {
                let all = NUL_NOISE.replace_all(&captured, "").into_owned();
                let mut content = all.as_str();

                // Remove the echoed command from the beginning of the output.
                if !command.is_empty() && content.starts_with(command) {
                    content = content
                        .strip_prefix(command)
                        .unwrap_or(content)
                        .trim_start_matches(['\n', '\r']);
                }

                // Remove the trailing prompt, keeping the final newline so
                // line-anchored field patterns still see a terminated line.
                let content = match content.rfind('\n') {
                    Some(pos) => &content[..=pos],
                    None => "",
                };

                Ok(content.to_string())
            }
        }
    }

    async fn send_command_no_wait(&mut self, command: &str) -> Result<(), EngineError> {
        if self.state != SessionState::Connected {
            return Err(EngineError::SessionClosed);
        }
        debug!("[{}] {} (no wait)", self.host, command);
        let sender = self.sender.as_ref().ok_or(EngineError::SessionClosed)?;
        sender.send(format!("{command}\n")).await?;
        Ok(())
    }
}

/// Outcomes the login expect loop can resolve a chunk of stream to.
#[derive(Debug, PartialEq, Eq)]
enum LoginEvent {
    HostKey,
    Password,
    Prompt,
    NoRoute,
}

/// Drive the dialect-defined login exchange to the first command prompt.
#[allow(clippy::too_many_arguments)]
async fn login_handshake(
    sender: &Sender<String>,
    recv: &mut Receiver<String>,
    dialect: &CliDialect,
    prompt: &Regex,
    user: &str,
    host: &str,
    password: &str,
    bound: Duration,
) -> Result<(), EngineError> {
    let password_prompt = dialect.password_prompt_for(user, host);
    let mut buffer = String::new();

    let mut event = expect_login_event(recv, &mut buffer, dialect, prompt, &password_prompt, bound)
        .await?;

    if event == LoginEvent::HostKey {
        // First contact with this unit: confirm the key, then the
        // password prompt must follow within a second bound.
        sender
            .send(format!("{}\n", dialect.host_key_answer))
            .await?;
        buffer.clear();
        event = match expect_login_event(recv, &mut buffer, dialect, prompt, &password_prompt, bound)
            .await
        {
            Ok(event) => event,
            Err(EngineError::ConnectTimeout(_)) => {
                return Err(EngineError::AuthenticationFailure(
                    "password prompt never appeared after host-key confirmation".to_string(),
                ));
            }
            Err(other) => return Err(other),
        };
    }

    match event {
        LoginEvent::Prompt => return Ok(()),
        LoginEvent::NoRoute => return Err(EngineError::HostUnreachable),
        LoginEvent::HostKey => {
            return Err(EngineError::AuthenticationFailure(
                "host-key prompt repeated during login".to_string(),
            ));
        }
        LoginEvent::Password => {
            sender.send(format!("{password}\n")).await?;
        }
    }

    buffer.clear();
    match expect_login_event(recv, &mut buffer, dialect, prompt, &password_prompt, bound).await {
        Ok(LoginEvent::Prompt) => Ok(()),
        Ok(LoginEvent::NoRoute) => Err(EngineError::HostUnreachable),
        Ok(_) => Err(EngineError::AuthenticationFailure(
            "unexpected banner after password".to_string(),
        )),
        Err(EngineError::ConnectTimeout(partial)) => Err(EngineError::AuthenticationFailure(
            format!("command prompt not seen after password: {partial}"),
        )),
        Err(other) => Err(other),
    }
}

/// Accumulate stream chunks until one login marker matches.
async fn expect_login_event(
    recv: &mut Receiver<String>,
    buffer: &mut String,
    dialect: &CliDialect,
    prompt: &Regex,
    password_prompt: &str,
    bound: Duration,
) -> Result<LoginEvent, EngineError> {
    let wait = tokio::time::timeout(bound, async {
        loop {
            if let Some(event) = match_login_event(buffer, dialect, prompt, password_prompt) {
                return Ok(event);
            }
            match recv.recv().await {
                Some(chunk) => {
                    trace!("{chunk:?}");
                    buffer.push_str(&chunk);
                }
                None => return Err(EngineError::ChannelDisconnect),
            }
        }
    })
    .await;

    match wait {
        Ok(inner) => inner,
        Err(_) => Err(EngineError::ConnectTimeout(
            buffer.lines().last().unwrap_or("").to_string(),
        )),
    }
}

fn match_login_event(
    buffer: &str,
    dialect: &CliDialect,
    prompt: &Regex,
    password_prompt: &str,
) -> Option<LoginEvent> {
    if buffer.contains(&dialect.unreachable_marker) {
        return Some(LoginEvent::NoRoute);
    }
    if buffer.contains(&dialect.host_key_prompt) {
        return Some(LoginEvent::HostKey);
    }
    if buffer.contains(password_prompt) {
        return Some(LoginEvent::Password);
    }
    let tail = buffer.rsplit('\n').next().unwrap_or(buffer);
    if prompt.is_match(tail) {
        return Some(LoginEvent::Prompt);
    }
    None
}

fn classify_transport_error(err: async_ssh2_tokio::Error) -> EngineError {
    let text = err.to_string();
    let lower = text.to_ascii_lowercase();
    if lower.contains("unreachable") || lower.contains("no route") {
        EngineError::HostUnreachable
    } else if lower.contains("auth") || lower.contains("password") {
        EngineError::AuthenticationFailure(text)
    } else {
        EngineError::Ssh2(err)
    }
}
