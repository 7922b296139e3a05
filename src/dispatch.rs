//! Per-device operation dispatch.
//!
//! Maps a roster command keyword to a concrete sequence of session
//! interactions and folds the outcome into one [`OperationResult`].
//! Every branch traps every session error: nothing raised while talking
//! to one unit may reach the orchestrator or affect sibling tasks.

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grammar::CommandSpec;
use crate::session::CommandExchange;

/// Operations a roster record can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Run the scan battery and collect every field.
    Scan,
    /// Transfer a firmware image to the standby bank.
    UploadFirmware,
    /// Promote the candidate image and arm the rollback watchdog.
    RunFirmware,
    /// Confirm the candidate image, canceling the pending rollback.
    AcceptFirmware,
    /// Transfer a script file to the unit.
    UploadScript,
    /// Execute a previously uploaded script.
    RunScript,
    /// Pass a raw command line through verbatim.
    RunRawCommand,
}

impl OperationKind {
    /// Resolve the keyword prefix of a roster command string.
    pub fn parse(command: &str) -> Option<OperationKind> {
        let command = command.trim_start();
        if command.starts_with("upload_sw") {
            Some(OperationKind::UploadFirmware)
        } else if command.starts_with("run_sw") {
            Some(OperationKind::RunFirmware)
        } else if command.starts_with("accept") {
            Some(OperationKind::AcceptFirmware)
        } else if command.starts_with("scan") {
            Some(OperationKind::Scan)
        } else if command.starts_with("upload_script") {
            Some(OperationKind::UploadScript)
        } else if command.starts_with("run_script") {
            Some(OperationKind::RunScript)
        } else if command.starts_with("run_command") {
            Some(OperationKind::RunRawCommand)
        } else {
            None
        }
    }

    /// Label used in the report's operation column.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Scan => "scan",
            OperationKind::UploadFirmware => "copy",
            OperationKind::RunFirmware => "run_sw",
            OperationKind::AcceptFirmware => "accept",
            OperationKind::UploadScript => "upload_script",
            OperationKind::RunScript => "run_script",
            OperationKind::RunRawCommand => "run_command",
        }
    }

    /// Inverse of [`label`](Self::label), for report consumers.
    pub fn from_label(label: &str) -> Option<OperationKind> {
        match label {
            "scan" => Some(OperationKind::Scan),
            "copy" => Some(OperationKind::UploadFirmware),
            "run_sw" => Some(OperationKind::RunFirmware),
            "accept" => Some(OperationKind::AcceptFirmware),
            "upload_script" => Some(OperationKind::UploadScript),
            "run_script" => Some(OperationKind::RunScript),
            "run_command" => Some(OperationKind::RunRawCommand),
            _ => None,
        }
    }
}

/// Terminal artifact of one device task.
///
/// Always produced, never silently dropped: every requested device ends
/// up as exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OperationResult {
    /// Host identity of the unit.
    pub host: String,
    /// Operation label (see [`OperationKind::label`]).
    pub operation: String,
    /// Whether the operation ran to completion.
    pub success: bool,
    /// Failure reason for unsuccessful rows.
    pub error: Option<String>,
    /// Battery field values, in declaration order; empty for non-scan
    /// operations.
    pub fields: Vec<String>,
}

impl OperationResult {
    /// Successful result without field values.
    pub fn ok(host: impl Into<String>, operation: &str) -> Self {
        Self {
            host: host.into(),
            operation: operation.to_string(),
            success: true,
            error: None,
            fields: Vec::new(),
        }
    }

    /// Successful scan result carrying field values.
    pub fn ok_with_fields(host: impl Into<String>, operation: &str, fields: Vec<String>) -> Self {
        Self {
            fields,
            ..Self::ok(host, operation)
        }
    }

    /// Failed result with a human-readable reason.
    pub fn failed(host: impl Into<String>, operation: &str, reason: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            operation: operation.to_string(),
            success: false,
            error: Some(reason.into()),
            fields: Vec::new(),
        }
    }
}

/// Execute one roster command against a connected session.
///
/// This function never returns an error: all session failures are folded
/// into a failed [`OperationResult`].
pub async fn dispatch<E: CommandExchange>(
    session: &mut E,
    command: &str,
    battery: &[CommandSpec],
    config: &EngineConfig,
) -> OperationResult {
    let host = session.host().to_string();

    let Some(kind) = OperationKind::parse(command) else {
        debug!("[{host}] unsupported operation '{command}'");
        return OperationResult::failed(host, command.trim(), "unsupported operation");
    };

    let outcome = match kind {
        OperationKind::Scan => scan(session, battery).await,
        OperationKind::UploadFirmware => rewrite_no_wait(session, command, "upload_sw", "copy").await,
        OperationKind::RunFirmware => run_firmware(session, config).await,
        OperationKind::AcceptFirmware => accept_firmware(session).await,
        OperationKind::UploadScript => {
            rewrite_no_wait(session, command, "upload_script", "copy").await
        }
        OperationKind::RunScript => rewrite_no_wait(session, command, "run_script", "run").await,
        OperationKind::RunRawCommand => raw_command(session, command).await,
    };

    match outcome {
        Ok(fields) => OperationResult::ok_with_fields(host, kind.label(), fields),
        Err(err) => {
            debug!("[{host}] {} failed: {err}", kind.label());
            OperationResult::failed(host, kind.label(), err.to_string())
        }
    }
}

/// Run the battery in declaration order, concatenating every field.
async fn scan<E: CommandExchange>(
    session: &mut E,
    battery: &[CommandSpec],
) -> Result<Vec<String>, EngineError> {
    let mut fields = Vec::new();
    for spec in battery {
        fields.extend(spec.run(session).await?);
    }
    Ok(fields)
}

/// Rewrite the roster keyword into the device command and fire without
/// waiting; transfers and script runs drop the shell by design.
async fn rewrite_no_wait<E: CommandExchange>(
    session: &mut E,
    command: &str,
    tag: &str,
    replacement: &str,
) -> Result<Vec<String>, EngineError> {
    let device_command = command.trim().replacen(tag, replacement, 1);
    session.send_command_no_wait(&device_command).await?;
    Ok(Vec::new())
}

/// Promote the candidate image with the rollback watchdog armed.
///
/// The configuration is persisted first so the unit reboots into a known
/// state, then the candidate is scheduled with an accept window and the
/// device-side rollback timer. If `accept sw` does not arrive in time the
/// unit autonomously reverts to the previously running bank.
async fn run_firmware<E: CommandExchange>(
    session: &mut E,
    config: &EngineConfig,
) -> Result<Vec<String>, EngineError> {
    session
        .send_command("copy running-configuration startup-configuration")
        .await?;
    session
        .send_command(&format!("run sw next-rst {}", config.accept_timeout_secs))
        .await?;
    session
        .send_command(&format!(
            "set rollback timeout {}",
            config.rollback_timeout_secs
        ))
        .await?;
    Ok(Vec::new())
}

/// Confirm the candidate image, canceling the pending rollback.
async fn accept_firmware<E: CommandExchange>(session: &mut E) -> Result<Vec<String>, EngineError> {
    session.send_command("accept sw").await?;
    Ok(Vec::new())
}

/// Strip the keyword and pass the rest through verbatim.
async fn raw_command<E: CommandExchange>(
    session: &mut E,
    command: &str,
) -> Result<Vec<String>, EngineError> {
    let device_command = command
        .trim()
        .strip_prefix("run_command")
        .unwrap_or(command)
        .trim_start();
    session.send_command_no_wait(device_command).await?;
    Ok(Vec::new())
}

/// Per-device firmware rollout progression.
///
/// Absence of operator action is a designed-for outcome: a candidate that
/// is never accepted ends in `RolledBack`, not in a bricked unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RolloutState {
    /// No rollout in progress.
    #[default]
    Idle,
    /// Image transfer issued; the unit is writing the standby bank.
    Uploading,
    /// Transfer finished; a candidate image sits in the standby bank.
    Uploaded,
    /// Candidate promoted, rollback timer armed.
    Running,
    /// Candidate confirmed; the rollback timer is canceled.
    Accepted,
    /// The watchdog fired and the unit reverted to the prior bank.
    RolledBack,
}

impl RolloutState {
    /// State after a successful operation of the given kind.
    ///
    /// Non-firmware operations leave the state untouched. Re-running the
    /// promote step re-arms the same timer; a second timer is never
    /// stacked.
    pub fn advance(self, kind: OperationKind) -> RolloutState {
        match kind {
            OperationKind::UploadFirmware => RolloutState::Uploading,
            OperationKind::RunFirmware => RolloutState::Running,
            OperationKind::AcceptFirmware => match self {
                RolloutState::Running => RolloutState::Accepted,
                other => other,
            },
            _ => self,
        }
    }

    /// State once the transfer is observed complete, typically via a
    /// later bank query showing the candidate in the standby slot.
    pub fn on_transfer_complete(self) -> RolloutState {
        match self {
            RolloutState::Uploading => RolloutState::Uploaded,
            other => other,
        }
    }

    /// State after the device-side rollback timer elapses unanswered.
    pub fn on_rollback_elapsed(self) -> RolloutState {
        match self {
            RolloutState::Running => RolloutState::RolledBack,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens;
    use crate::session::{ScriptedExchange, ScriptedSession};

    fn no_wait(command: &str) -> ScriptedExchange {
        ScriptedExchange {
            command: command.to_string(),
            reply: String::new(),
            wait: false,
        }
    }

    fn waited(command: &str, reply: &str) -> ScriptedExchange {
        ScriptedExchange {
            command: command.to_string(),
            reply: reply.to_string(),
            wait: true,
        }
    }

    #[test]
    fn keyword_parsing_distinguishes_run_variants() {
        assert_eq!(
            OperationKind::parse("run_sw tftp://10.0.0.1/image.bin"),
            Some(OperationKind::RunFirmware)
        );
        assert_eq!(
            OperationKind::parse("run_script boot.txt"),
            Some(OperationKind::RunScript)
        );
        assert_eq!(
            OperationKind::parse("run_command set system name X"),
            Some(OperationKind::RunRawCommand)
        );
        assert_eq!(OperationKind::parse("scan"), Some(OperationKind::Scan));
        assert_eq!(OperationKind::parse("reboot please"), None);
    }

    #[tokio::test]
    async fn unknown_keyword_yields_failed_result_without_touching_session() {
        let mut session = ScriptedSession::from_pairs("10.0.0.7", vec![]);
        let config = EngineConfig::default();

        let result = dispatch(&mut session, "format_disk", &[], &config).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unsupported operation"));
        assert!(session.is_drained());
    }

    #[tokio::test]
    async fn upload_firmware_rewrites_tag_and_does_not_wait() {
        let mut session = ScriptedSession::new(
            "10.0.0.7",
            vec![no_wait("copy sw tftp://10.0.0.1/eh_7.4.1.bin")],
        );
        let config = EngineConfig::default();

        let result = dispatch(
            &mut session,
            "upload_sw sw tftp://10.0.0.1/eh_7.4.1.bin",
            &[],
            &config,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.operation, "copy");
        assert!(session.is_drained());
    }

    #[tokio::test]
    async fn run_firmware_persists_config_and_arms_rollback_timer() {
        let config = EngineConfig {
            accept_timeout_secs: 300,
            rollback_timeout_secs: 450,
            ..EngineConfig::default()
        };
        let mut session = ScriptedSession::new(
            "10.0.0.7",
            vec![
                waited("copy running-configuration startup-configuration", "\r\n"),
                waited("run sw next-rst 300", "reset scheduled\r\n"),
                waited("set rollback timeout 450", "rollback armed\r\n"),
            ],
        );

        let result = dispatch(&mut session, "run_sw", &[], &config).await;

        assert!(result.success);
        assert_eq!(result.operation, "run_sw");
        assert!(session.is_drained());
    }

    #[tokio::test]
    async fn accept_firmware_confirms_candidate() {
        let mut session =
            ScriptedSession::from_pairs("10.0.0.7", vec![("accept sw", "sw accepted\r\n")]);
        let config = EngineConfig::default();

        let result = dispatch(&mut session, "accept", &[], &config).await;

        assert!(result.success);
        assert_eq!(result.operation, "accept");
    }

    #[tokio::test]
    async fn raw_command_strips_keyword_and_passes_through() {
        let mut session = ScriptedSession::new(
            "10.0.0.7",
            vec![no_wait("set system location rooftop-north")],
        );
        let config = EngineConfig::default();

        let result = dispatch(
            &mut session,
            "run_command set system location rooftop-north",
            &[],
            &config,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.operation, "run_command");
    }

    #[tokio::test]
    async fn scan_concatenates_battery_fields_in_order() {
        let battery = vec![
            screens::inventory().unwrap(),
            screens::ntp().unwrap(),
        ];
        let mut session = ScriptedSession::from_pairs(
            "10.0.0.7",
            vec![
                (
                    "show inventory 1 serial",
                    "inventory 1 serial   : F123456789\r\n",
                ),
                (
                    "show ntp",
                    "ntp 1 server         : 10.0.0.1\r\nntp 1 tmz            : 2\r\n",
                ),
            ],
        );
        let config = EngineConfig::default();

        let result = dispatch(&mut session, "scan", &battery, &config).await;

        assert!(result.success);
        assert_eq!(result.fields, vec!["F123456789", "10.0.0.1", "2"]);
    }

    #[tokio::test]
    async fn session_errors_are_contained_as_failed_results() {
        // Transcript diverges mid-battery; the error must fold into the
        // result instead of propagating.
        let battery = vec![
            screens::inventory().unwrap(),
            screens::ntp().unwrap(),
        ];
        let mut session = ScriptedSession::from_pairs(
            "10.0.0.7",
            vec![(
                "show inventory 1 serial",
                "inventory 1 serial   : F123456789\r\n",
            )],
        );
        let config = EngineConfig::default();

        let result = dispatch(&mut session, "scan", &battery, &config).await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(result.operation, "scan");
    }

    #[test]
    fn rollout_follows_upload_run_accept_path() {
        let state = RolloutState::Idle.advance(OperationKind::UploadFirmware);
        assert_eq!(state, RolloutState::Uploading);
        let state = state
            .on_transfer_complete()
            .advance(OperationKind::RunFirmware)
            .advance(OperationKind::AcceptFirmware);
        assert_eq!(state, RolloutState::Accepted);
    }

    #[test]
    fn unaccepted_candidate_rolls_back_when_timer_elapses() {
        let state = RolloutState::Idle
            .advance(OperationKind::UploadFirmware)
            .on_transfer_complete()
            .advance(OperationKind::RunFirmware)
            .on_rollback_elapsed();
        assert_eq!(state, RolloutState::RolledBack);

        // Accepting after the rollback fired must not resurrect the
        // candidate.
        assert_eq!(
            state.advance(OperationKind::AcceptFirmware),
            RolloutState::RolledBack
        );
    }

    #[test]
    fn rollback_timer_is_not_stacked_by_repeated_promotes() {
        let state = RolloutState::Running.advance(OperationKind::RunFirmware);
        assert_eq!(state, RolloutState::Running);
    }

    #[test]
    fn scan_does_not_change_rollout_state() {
        assert_eq!(
            RolloutState::Running.advance(OperationKind::Scan),
            RolloutState::Running
        );
    }
}
